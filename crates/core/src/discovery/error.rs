use thiserror::Error;

use crate::converter::ConverterError;

/// Startup failures of converter discovery. None of them is retryable.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Discovery left no converter active.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A catalog factory could not build its converter.
    #[error("Converter '{name}' could not be linked: {source}")]
    Linkage {
        name: String,
        #[source]
        source: ConverterError,
    },
}

impl DiscoveryError {
    pub fn no_converters() -> Self {
        Self::Configuration(
            "no external converters are active: every converter is disabled or unavailable"
                .to_string(),
        )
    }
}
