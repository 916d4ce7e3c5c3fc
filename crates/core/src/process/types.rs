//! Request and outcome types for process execution.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::error::ProcessError;
use super::sink::OutputSink;

/// A single process invocation.
///
/// Built fresh for every execution and consumed by [`super::execute`].
pub struct ExecutionRequest {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// Working directory of the spawned process.
    pub work_dir: PathBuf,
    /// Wall-clock limit for the process.
    pub timeout: Duration,
    /// Extra environment variables for the process.
    pub env_vars: HashMap<String, String>,
    /// Receives stdout and stderr lines.
    pub sink: Arc<dyn OutputSink>,
    /// Cancelling this token stops the wait (the process keeps running).
    pub interrupt: Option<CancellationToken>,
    /// Signalled once an abandoned process has exited. Dropped unsent when
    /// the process was not abandoned.
    pub reaped: Option<oneshot::Sender<()>>,
}

impl ExecutionRequest {
    pub fn new(
        command: Vec<String>,
        work_dir: impl Into<PathBuf>,
        timeout: Duration,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
            timeout,
            env_vars: HashMap::new(),
            sink,
            interrupt: None,
            reaped: None,
        }
    }

    /// Adds an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Lets the caller abandon the wait through `token`.
    pub fn interruptible(mut self, token: Option<CancellationToken>) -> Self {
        self.interrupt = token;
        self
    }

    /// Notifies `tx` when a process abandoned by an interrupt finally exits.
    pub fn on_reaped(mut self, tx: oneshot::Sender<()>) -> Self {
        self.reaped = Some(tx);
        self
    }

    /// Overrides the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as a single display string.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

impl fmt::Debug for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("command", &self.command)
            .field("work_dir", &self.work_dir)
            .field("timeout", &self.timeout)
            .field("env_vars", &self.env_vars)
            .field("interruptible", &self.interrupt.is_some())
            .finish()
    }
}

/// Terminal state of one execution.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The process exited within its timeout, with any exit code.
    Completed(i32),
    /// The timeout elapsed and the process was terminated.
    TimedOut,
    /// The process could not be spawned or waited on.
    SpawnFailed(std::io::Error),
    /// The caller was interrupted before the process completed.
    Interrupted,
}

impl ExecutionOutcome {
    /// Exit code, if the process completed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Completed(code) => Some(*code),
            _ => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::TimedOut => "timed_out",
            Self::SpawnFailed(_) => "spawn_failed",
            Self::Interrupted => "interrupted",
        }
    }

    /// Maps the outcome onto the error taxonomy.
    ///
    /// `Completed` becomes `Ok` regardless of the exit code.
    pub fn into_result(
        self,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Result<i32, ProcessError> {
        let command = command.into();
        match self {
            Self::Completed(code) => Ok(code),
            Self::TimedOut => Err(ProcessError::Timeout { command, timeout }),
            Self::SpawnFailed(source) => Err(ProcessError::Access { command, source }),
            Self::Interrupted => Err(ProcessError::Interrupted { command }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::TracingSink;

    #[test]
    fn test_nonzero_exit_is_ok() {
        let result = ExecutionOutcome::Completed(3).into_result("script", Duration::from_secs(1));
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_outcome_mapping() {
        let timeout = Duration::from_millis(250);

        let err = ExecutionOutcome::TimedOut
            .into_result("slow", timeout)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { timeout: t, .. } if t == timeout));

        let err = ExecutionOutcome::Interrupted
            .into_result("slow", timeout)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Interrupted { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ExecutionOutcome::SpawnFailed(io)
            .into_result("locked", timeout)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Access { .. }));
    }

    #[test]
    fn test_labels() {
        assert_eq!(ExecutionOutcome::Completed(0).label(), "completed");
        assert_eq!(ExecutionOutcome::TimedOut.label(), "timed_out");
        assert_eq!(ExecutionOutcome::Interrupted.label(), "interrupted");
        assert_eq!(ExecutionOutcome::Completed(7).exit_code(), Some(7));
        assert_eq!(ExecutionOutcome::TimedOut.exit_code(), None);
    }

    #[test]
    fn test_request_builder() {
        let request = ExecutionRequest::new(
            vec!["pandoc".to_string(), "--version".to_string()],
            "/tmp",
            Duration::from_secs(5),
            Arc::new(TracingSink::new("test")),
        )
        .env("LANG", "C")
        .with_timeout(Duration::from_secs(10));

        assert_eq!(request.command_line(), "pandoc --version");
        assert_eq!(request.timeout, Duration::from_secs(10));
        assert_eq!(request.env_vars.get("LANG").map(String::as_str), Some("C"));
        assert!(request.interrupt.is_none());
    }
}
