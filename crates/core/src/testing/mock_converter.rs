//! Mock converter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{
    ConversionJob, ConversionResult, ConverterError, DocumentType, ExternalConverter,
};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the ExternalConverter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate failures, including on shutdown
/// - Toggle operational state
///
/// # Example
///
/// ```rust,ignore
/// use docshift_core::testing::MockConverter;
///
/// let converter = MockConverter::named("alpha")
///     .with_conversions(vec![(DocumentType::Docx, DocumentType::Pdf)]);
///
/// let result = converter.convert(job).await?;
///
/// let conversions = converter.recorded_conversions().await;
/// assert_eq!(conversions.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    name: String,
    /// Supported pairs; `None` supports every pair.
    conversions: Option<Vec<(DocumentType, DocumentType)>>,
    /// Recorded conversions.
    recorded: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    operational: Arc<RwLock<bool>>,
    shut_down: Arc<RwLock<bool>>,
    /// Simulated conversion duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::named("mock")
    }
}

impl MockConverter {
    /// Create a mock converter supporting every conversion.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conversions: None,
            recorded: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            operational: Arc::new(RwLock::new(true)),
            shut_down: Arc::new(RwLock::new(false)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Restrict the supported conversions.
    pub fn with_conversions(mut self, conversions: Vec<(DocumentType, DocumentType)>) -> Self {
        self.conversions = Some(conversions);
        self
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.recorded.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.recorded.read().await.len()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_operational(&self, operational: bool) {
        *self.operational.write().await = operational;
    }

    /// Set the simulated conversion duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Whether `shutdown` has been called, successfully or not.
    pub async fn is_shut_down(&self) -> bool {
        *self.shut_down.read().await
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl ExternalConverter for MockConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_conversions(&self) -> Vec<(DocumentType, DocumentType)> {
        match &self.conversions {
            Some(conversions) => conversions.clone(),
            None => DocumentType::ALL
                .iter()
                .flat_map(|&source| DocumentType::ALL.iter().map(move |&target| (source, target)))
                .collect(),
        }
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.take_error().await {
            self.recorded.write().await.push(RecordedConversion {
                job,
                success: false,
            });
            return Err(err);
        }

        let result = ConversionResult {
            job_id: job.job_id.clone(),
            converter: self.name.clone(),
            target: job.target.clone(),
            size_bytes: 0,
            duration_ms: delay.as_millis() as u64,
        };
        self.recorded.write().await.push(RecordedConversion { job, success: true });
        Ok(result)
    }

    async fn is_operational(&self) -> bool {
        *self.operational.read().await
    }

    async fn shutdown(&self) -> Result<(), ConverterError> {
        *self.shut_down.write().await = true;
        *self.operational.write().await = false;
        match self.take_error().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
