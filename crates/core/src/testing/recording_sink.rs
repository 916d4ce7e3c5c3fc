//! Output sink that keeps everything it receives.

use std::sync::Mutex;

use crate::process::OutputSink;

/// Records info lines and warnings for test assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Informational lines, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Warnings, in arrival order.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl OutputSink for RecordingSink {
    fn info(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }

    fn warn(&self, line: &str) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(line.to_string());
        }
    }
}
