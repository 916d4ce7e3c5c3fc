//! Process execution harness.
//!
//! Every converter runs its native tool through this module. A single
//! execution spawns one OS process in a working directory, forwards its
//! stdout and stderr to an [`OutputSink`], and ends in exactly one
//! [`ExecutionOutcome`]:
//!
//! - `Completed(code)` when the process exits within its timeout, whatever
//!   the exit code
//! - `TimedOut` when the watchdog fired and the process was killed
//! - `SpawnFailed` on I/O failure
//! - `Interrupted` when the caller's token was cancelled first
//!
//! Spawned processes are detached from the host's signal handling so that a
//! shutdown script started while the host terminates runs to completion. The
//! harness keeps no global state; concurrent executions never wait on each
//! other.
//!
//! # Example
//!
//! ```ignore
//! use docshift_core::process::{ProcessHarness, TracingSink};
//!
//! let harness = ProcessHarness::new("/var/lib/docshift", Duration::from_secs(30), Arc::new(TracingSink::new("demo")));
//! let exit_code = harness.run_script(Path::new("/var/lib/docshift/startup.sh")).await?;
//! ```

mod error;
mod harness;
mod sink;
mod types;

pub use error::ProcessError;
pub use harness::{delete_best_effort, execute, quote, shell_command, ProcessHarness};
pub use sink::{OutputSink, TracingSink};
pub use types::{ExecutionOutcome, ExecutionRequest};
