//! Error types for process execution.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced to the caller of a single process execution.
///
/// A non-zero exit code is not an error at this level. Whether it means
/// failure is decided by the converter that ran the process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The process could not be spawned or waited on.
    #[error("Unable to run process: {command}")]
    Access {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The caller stopped waiting before the process completed.
    #[error("Wait for process was interrupted: {command}")]
    Interrupted { command: String },

    /// The process exceeded its timeout and was terminated.
    #[error("Process timed out after {}ms: {command}", .timeout.as_millis())]
    Timeout { command: String, timeout: Duration },
}

impl ProcessError {
    /// The command line the failed execution was running.
    pub fn command(&self) -> &str {
        match self {
            Self::Access { command, .. }
            | Self::Interrupted { command }
            | Self::Timeout { command, .. } => command,
        }
    }
}
