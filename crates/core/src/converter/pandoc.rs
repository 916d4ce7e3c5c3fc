//! Pandoc-based converter implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::error::ConverterError;
use super::support;
use super::traits::{ConverterContext, ExternalConverter};
use super::types::{ConversionJob, ConversionResult, DocumentType};
use crate::process::ProcessHarness;

/// Catalog name of this converter.
pub const NAME: &str = "pandoc";

const BINARY: &str = "pandoc";

/// Converter running `pandoc`.
///
/// Pandoc keeps no shared state between runs, so conversions on one
/// instance may run concurrently.
pub struct PandocConverter {
    binary: PathBuf,
    harness: ProcessHarness,
}

impl PandocConverter {
    pub fn new(binary: PathBuf, context: ConverterContext) -> Self {
        Self {
            binary,
            harness: context.harness(),
        }
    }

    /// Pandoc reader name for `doc_type`, if pandoc can read it.
    fn reader(doc_type: DocumentType) -> Option<&'static str> {
        match doc_type {
            DocumentType::Docx => Some("docx"),
            DocumentType::Odt => Some("odt"),
            DocumentType::Rtf => Some("rtf"),
            DocumentType::Html => Some("html"),
            DocumentType::Markdown => Some("markdown"),
            DocumentType::Doc | DocumentType::Txt | DocumentType::Pdf => None,
        }
    }

    /// Pandoc writer name for `doc_type`, if pandoc can write it.
    ///
    /// PDF output goes through pandoc's default LaTeX engine.
    fn writer(doc_type: DocumentType) -> Option<&'static str> {
        match doc_type {
            DocumentType::Docx => Some("docx"),
            DocumentType::Odt => Some("odt"),
            DocumentType::Rtf => Some("rtf"),
            DocumentType::Html => Some("html"),
            DocumentType::Markdown => Some("markdown"),
            DocumentType::Txt => Some("plain"),
            DocumentType::Pdf => Some("pdf"),
            DocumentType::Doc => None,
        }
    }

    fn build_args(&self, job: &ConversionJob) -> Option<Vec<String>> {
        let reader = Self::reader(job.source_type)?;
        let writer = Self::writer(job.target_type)?;

        let mut args = vec![
            self.binary.to_string_lossy().to_string(),
            job.source.to_string_lossy().to_string(),
            "--from".to_string(),
            reader.to_string(),
        ];
        // Pandoc selects the PDF engine from the output extension.
        if job.target_type != DocumentType::Pdf {
            args.extend(["--to".to_string(), writer.to_string()]);
        }
        args.extend([
            "--output".to_string(),
            job.target.to_string_lossy().to_string(),
        ]);
        Some(args)
    }
}

/// Availability probe: pandoc is installed.
pub fn probe(_work_dir: &Path) -> bool {
    which::which(BINARY).is_ok()
}

/// Catalog factory.
pub fn create(context: ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError> {
    let binary = which::which(BINARY)
        .map_err(|e| ConverterError::initialization(format!("pandoc not found on PATH: {}", e)))?;
    debug!(binary = %binary.display(), "Using pandoc");
    Ok(Arc::new(PandocConverter::new(binary, context)))
}

#[async_trait]
impl ExternalConverter for PandocConverter {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_conversions(&self) -> Vec<(DocumentType, DocumentType)> {
        let mut pairs = Vec::new();
        for source in DocumentType::ALL {
            for target in DocumentType::ALL {
                if source != target
                    && Self::reader(source).is_some()
                    && Self::writer(target).is_some()
                {
                    pairs.push((source, target));
                }
            }
        }
        pairs
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        let args = match self.build_args(&job) {
            Some(args) if job.source_type != job.target_type => args,
            _ => {
                return Err(ConverterError::UnsupportedConversion {
                    source_type: job.source_type,
                    target_type: job.target_type,
                })
            }
        };
        support::ensure_input(&job).await?;
        support::prepare_target(&job).await?;

        let started = Instant::now();
        let request = self
            .harness
            .request(args)
            .interruptible(job.interrupt.clone());
        let exit_code = self.harness.run(request).await?;
        support::check_exit_code(NAME, exit_code)?;

        support::finish(NAME, &job, started).await
    }

    async fn is_operational(&self) -> bool {
        self.binary.is_file()
    }

    async fn shutdown(&self) -> Result<(), ConverterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use std::time::Duration;

    fn converter() -> PandocConverter {
        let context = ConverterContext::new(
            "/var/lib/docshift",
            Duration::from_secs(30),
            Arc::new(RecordingSink::new()),
        );
        PandocConverter::new(PathBuf::from("/usr/bin/pandoc"), context)
    }

    #[test]
    fn test_build_args_markdown_to_docx() {
        let job = ConversionJob::new(
            "job-1",
            "/docs/notes.md",
            DocumentType::Markdown,
            "/out/notes.docx",
            DocumentType::Docx,
        );
        let args = converter().build_args(&job).unwrap();
        assert_eq!(
            args,
            vec![
                "/usr/bin/pandoc",
                "/docs/notes.md",
                "--from",
                "markdown",
                "--to",
                "docx",
                "--output",
                "/out/notes.docx",
            ]
        );
    }

    #[test]
    fn test_build_args_pdf_has_no_writer_flag() {
        let job = ConversionJob::new(
            "job-2",
            "/docs/notes.html",
            DocumentType::Html,
            "/out/notes.pdf",
            DocumentType::Pdf,
        );
        let args = converter().build_args(&job).unwrap();
        assert!(!args.contains(&"--to".to_string()));
        assert_eq!(args.last().unwrap(), "/out/notes.pdf");
    }

    #[test]
    fn test_supported_conversions() {
        let converter = converter();
        assert!(converter.supports(DocumentType::Markdown, DocumentType::Html));
        assert!(converter.supports(DocumentType::Docx, DocumentType::Txt));
        assert!(!converter.supports(DocumentType::Pdf, DocumentType::Markdown));
        assert!(!converter.supports(DocumentType::Doc, DocumentType::Pdf));
        assert!(!converter.supports(DocumentType::Html, DocumentType::Html));
    }

    #[tokio::test]
    async fn test_unreadable_source_rejected() {
        let job = ConversionJob::new(
            "job-3",
            "/docs/scan.pdf",
            DocumentType::Pdf,
            "/out/scan.md",
            DocumentType::Markdown,
        );
        assert!(matches!(
            converter().convert(job).await,
            Err(ConverterError::UnsupportedConversion { .. })
        ));
    }
}
