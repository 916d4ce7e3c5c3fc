//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::DocumentType;
use crate::process::ProcessError;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The native tool could not be run to completion.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The native tool ran but reported failure.
    #[error("{converter} conversion failed: {reason}")]
    ConversionFailed {
        converter: String,
        reason: String,
        exit_code: Option<i32>,
    },

    /// No converter handles this pair of formats.
    #[error("Unsupported conversion: {source_type} -> {target_type}")]
    UnsupportedConversion {
        source_type: DocumentType,
        target_type: DocumentType,
    },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The native tool exited cleanly but left no output behind.
    #[error("Output file not created: {path}")]
    OutputNotCreated { path: PathBuf },

    /// The converter cannot currently accept work.
    #[error("Converter not operational: {converter}")]
    NotOperational { converter: String },

    /// The converter could not be constructed.
    #[error("Converter initialization failed: {reason}")]
    Initialization { reason: String },

    /// I/O error around the conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a conversion failed error.
    pub fn conversion_failed(
        converter: impl Into<String>,
        reason: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ConversionFailed {
            converter: converter.into(),
            reason: reason.into(),
            exit_code,
        }
    }

    /// Creates an initialization error.
    pub fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }

    /// Whether this error is retryable.
    ///
    /// Spawn failures may be transient. Timeouts and interruptions are never
    /// retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Process(ProcessError::Access { .. }) | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_process_errors_pass_through() {
        let err: ConverterError = ProcessError::Interrupted {
            command: "soffice --headless".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Wait for process was interrupted: soffice --headless"
        );
    }

    #[test]
    fn test_retryable_classification() {
        let timeout: ConverterError = ProcessError::Timeout {
            command: "pandoc".to_string(),
            timeout: Duration::from_secs(1),
        }
        .into();
        assert!(!timeout.is_retryable());

        let access: ConverterError = ProcessError::Access {
            command: "pandoc".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "fork failed"),
        }
        .into();
        assert!(access.is_retryable());

        assert!(!ConverterError::conversion_failed("pandoc", "exit code 1", Some(1)).is_retryable());
    }

    #[test]
    fn test_unsupported_message() {
        let err = ConverterError::UnsupportedConversion {
            source_type: DocumentType::Pdf,
            target_type: DocumentType::Docx,
        };
        assert_eq!(err.to_string(), "Unsupported conversion: pdf -> docx");
    }
}
