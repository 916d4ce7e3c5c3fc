//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionResult, DocumentType};
use crate::process::{OutputSink, ProcessHarness};

/// Everything a converter is constructed from.
#[derive(Clone)]
pub struct ConverterContext {
    /// Base working directory for the converter's processes.
    pub work_dir: PathBuf,
    /// Timeout applied to every process the converter runs.
    pub timeout: Duration,
    /// Destination for process output and cleanup warnings.
    pub sink: Arc<dyn OutputSink>,
}

impl ConverterContext {
    pub fn new(work_dir: impl Into<PathBuf>, timeout: Duration, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout,
            sink,
        }
    }

    /// A process harness preset with this context.
    pub fn harness(&self) -> ProcessHarness {
        ProcessHarness::new(&self.work_dir, self.timeout, Arc::clone(&self.sink))
    }
}

impl std::fmt::Debug for ConverterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterContext")
            .field("work_dir", &self.work_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builds a converter instance from its context.
pub type ConverterFactory = fn(ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError>;

/// A backend converting documents by driving an external tool.
///
/// Instances hold no process state between calls: every conversion spawns
/// its own process.
#[async_trait]
pub trait ExternalConverter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Every (source, target) pair this converter handles.
    fn supported_conversions(&self) -> Vec<(DocumentType, DocumentType)>;

    /// Whether this converter handles `source` to `target`.
    fn supports(&self, source: DocumentType, target: DocumentType) -> bool {
        self.supported_conversions().contains(&(source, target))
    }

    /// Converts the document described by `job`.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError>;

    /// Whether the converter can currently accept work.
    async fn is_operational(&self) -> bool;

    /// Releases the native tool, running any shutdown procedure.
    async fn shutdown(&self) -> Result<(), ConverterError>;
}
