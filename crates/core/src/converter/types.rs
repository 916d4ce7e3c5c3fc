//! Types for document conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Document formats known to the converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Legacy Microsoft Word (.doc).
    Doc,
    /// Office Open XML (.docx).
    Docx,
    /// OpenDocument Text (.odt).
    Odt,
    /// Rich Text Format (.rtf).
    Rtf,
    /// Plain text (.txt).
    Txt,
    /// HTML (.html).
    Html,
    /// Markdown (.md).
    Markdown,
    /// Portable Document Format (.pdf).
    Pdf,
}

impl DocumentType {
    /// Every known document type.
    pub const ALL: [DocumentType; 8] = [
        Self::Doc,
        Self::Docx,
        Self::Odt,
        Self::Rtf,
        Self::Txt,
        Self::Html,
        Self::Markdown,
        Self::Pdf,
    ];

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Rtf => "rtf",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Pdf => "pdf",
        }
    }

    /// Parses a file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "odt" => Some(Self::Odt),
            "rtf" => Some(Self::Rtf),
            "txt" | "text" => Some(Self::Txt),
            "html" | "htm" => Some(Self::Html),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detects the type from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A conversion job for a single document.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Unique job identifier.
    pub job_id: String,
    /// Document to convert.
    pub source: PathBuf,
    /// Format of the source document.
    pub source_type: DocumentType,
    /// Where the converted document is written.
    pub target: PathBuf,
    /// Format of the target document.
    pub target_type: DocumentType,
    /// Cancelling this token stops waiting on the native tool.
    pub interrupt: Option<CancellationToken>,
}

impl ConversionJob {
    pub fn new(
        job_id: impl Into<String>,
        source: impl Into<PathBuf>,
        source_type: DocumentType,
        target: impl Into<PathBuf>,
        target_type: DocumentType,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            source: source.into(),
            source_type,
            target: target.into(),
            target_type,
            interrupt: None,
        }
    }

    /// Builds a job with both types detected from the file extensions.
    pub fn from_paths(
        job_id: impl Into<String>,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
    ) -> Option<Self> {
        let source = source.into();
        let target = target.into();
        let source_type = DocumentType::from_path(&source)?;
        let target_type = DocumentType::from_path(&target)?;
        Some(Self::new(job_id, source, source_type, target, target_type))
    }

    pub fn with_interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt = Some(token);
        self
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Job identifier.
    pub job_id: String,
    /// Name of the converter that produced the output.
    pub converter: String,
    /// Path of the converted document.
    pub target: PathBuf,
    /// Size of the converted document.
    pub size_bytes: u64,
    /// Wall-clock time spent converting.
    pub duration_ms: u64,
}
