//! Output sinks receiving the text produced by spawned processes.

use tracing::{info, warn};

/// Line-oriented consumer for process output and cleanup warnings.
///
/// Both stdout and stderr lines arrive through [`OutputSink::info`].
/// [`OutputSink::warn`] is reserved for best-effort operations that failed.
pub trait OutputSink: Send + Sync {
    /// Consumes one line of process output.
    fn info(&self, line: &str);

    /// Consumes a warning about a failed best-effort operation.
    fn warn(&self, message: &str);
}

/// Sink forwarding everything to `tracing`, tagged with its source.
#[derive(Debug, Clone)]
pub struct TracingSink {
    source: String,
}

impl TracingSink {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl OutputSink for TracingSink {
    fn info(&self, line: &str) {
        info!(source = %self.source, "{}", line);
    }

    fn warn(&self, message: &str) {
        warn!(source = %self.source, "{}", message);
    }
}
