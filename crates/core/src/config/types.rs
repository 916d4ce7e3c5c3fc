use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base working directory for every converter process.
    pub base_dir: PathBuf,
    /// Process timeout, in `timeout_unit`.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub timeout_unit: TimeoutUnit,
    /// Explicit converter inclusion (`true`) or exclusion (`false`).
    /// Converters not listed are auto-detected.
    #[serde(default)]
    pub converters: HashMap<String, bool>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Timeout applied to every converter process.
    pub fn process_timeout(&self) -> Duration {
        self.timeout_unit.duration(self.timeout)
    }
}

fn default_timeout() -> u64 {
    120
}

/// Unit of the `timeout` value
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutUnit {
    Millis,
    #[default]
    Seconds,
    Minutes,
}

impl TimeoutUnit {
    pub fn duration(&self, value: u64) -> Duration {
        match self {
            Self::Millis => Duration::from_millis(value),
            Self::Seconds => Duration::from_secs(value),
            Self::Minutes => Duration::from_secs(value.saturating_mul(60)),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Print the Prometheus text dump when the binary exits.
    #[serde(default)]
    pub report_on_exit: bool,
}
