//! The loaded set of live converters.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::converter::{ConversionJob, ConversionResult, ConverterError, DocumentType, ExternalConverter};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};

/// Live converters built by [`super::Discovery::load`], in catalog order.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn ExternalConverter>>,
}

impl ConverterRegistry {
    pub fn new(converters: Vec<Arc<dyn ExternalConverter>>) -> Self {
        Self { converters }
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    pub fn converters(&self) -> &[Arc<dyn ExternalConverter>] {
        &self.converters
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ExternalConverter>> {
        self.converters.iter().find(|c| c.name() == name).cloned()
    }

    /// First operational converter handling `source` to `target`.
    pub async fn find(
        &self,
        source: DocumentType,
        target: DocumentType,
    ) -> Option<Arc<dyn ExternalConverter>> {
        for converter in &self.converters {
            if converter.supports(source, target) && converter.is_operational().await {
                return Some(Arc::clone(converter));
            }
        }
        None
    }

    /// Runs `job` on the first suitable converter.
    pub async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        let converter = self
            .find(job.source_type, job.target_type)
            .await
            .ok_or(ConverterError::UnsupportedConversion {
                source_type: job.source_type,
                target_type: job.target_type,
            })?;

        let name = converter.name().to_string();
        info!(
            job_id = %job.job_id,
            converter = %name,
            source = %job.source.display(),
            target = %job.target.display(),
            "Starting conversion"
        );

        let started = Instant::now();
        let result = converter.convert(job).await;
        let label = if result.is_ok() { "success" } else { "failed" };
        CONVERSIONS_TOTAL.with_label_values(&[name.as_str(), label]).inc();
        CONVERSION_DURATION
            .with_label_values(&[name.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(done) => info!(
                job_id = %done.job_id,
                converter = %name,
                size_bytes = done.size_bytes,
                duration_ms = done.duration_ms,
                "Conversion completed"
            ),
            Err(e) => warn!(converter = %name, error = %e, "Conversion failed"),
        }
        result
    }

    /// Shuts every converter down concurrently. Failures are logged only.
    pub async fn shutdown_all(&self) {
        let results = join_all(self.converters.iter().map(|c| async move {
            (c.name().to_string(), c.shutdown().await)
        }))
        .await;

        for (name, result) in results {
            match result {
                Ok(()) => info!(converter = %name, "Converter shut down"),
                Err(e) => error!(converter = %name, error = %e, "Converter shutdown failed"),
            }
        }
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConverter;

    fn registry_of(converters: Vec<Arc<MockConverter>>) -> ConverterRegistry {
        ConverterRegistry::new(
            converters
                .into_iter()
                .map(|c| c as Arc<dyn ExternalConverter>)
                .collect(),
        )
    }

    fn markdown_job(id: &str) -> ConversionJob {
        ConversionJob::new(
            id,
            "/in/notes.md",
            DocumentType::Markdown,
            "/out/notes.html",
            DocumentType::Html,
        )
    }

    #[tokio::test]
    async fn test_find_skips_unsupported_and_down_converters() {
        let narrow = MockConverter::named("narrow")
            .with_conversions(vec![(DocumentType::Docx, DocumentType::Pdf)]);
        let down = MockConverter::named("down");
        down.set_operational(false).await;
        let wide = MockConverter::named("wide");

        let registry = registry_of(vec![Arc::new(narrow), Arc::new(down), Arc::new(wide)]);

        let found = registry
            .find(DocumentType::Markdown, DocumentType::Html)
            .await
            .unwrap();
        assert_eq!(found.name(), "wide");
    }

    #[tokio::test]
    async fn test_convert_without_candidate_is_unsupported() {
        let narrow = MockConverter::named("narrow")
            .with_conversions(vec![(DocumentType::Docx, DocumentType::Pdf)]);
        let registry = registry_of(vec![Arc::new(narrow)]);

        let result = registry.convert(markdown_job("job-1")).await;
        assert!(matches!(
            result,
            Err(ConverterError::UnsupportedConversion { .. })
        ));
    }

    #[tokio::test]
    async fn test_convert_dispatches_to_first_match() {
        let first = Arc::new(MockConverter::named("first"));
        let second = Arc::new(MockConverter::named("second"));
        let registry = registry_of(vec![first.clone(), second.clone()]);

        let result = registry.convert(markdown_job("job-2")).await.unwrap();
        assert_eq!(result.converter, "first");
        assert_eq!(first.conversion_count().await, 1);
        assert_eq!(second.conversion_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_all_reaches_every_converter() {
        let a = Arc::new(MockConverter::named("a"));
        let b = Arc::new(MockConverter::named("b"));
        b.set_next_error(ConverterError::initialization("stuck")).await;
        let registry = registry_of(vec![a.clone(), b.clone()]);

        registry.shutdown_all().await;

        assert!(a.is_shut_down().await);
        assert!(b.is_shut_down().await);
    }

    #[test]
    fn test_get_by_name() {
        let registry = registry_of(vec![Arc::new(MockConverter::named("pandoc"))]);
        assert!(registry.get("pandoc").is_some());
        assert!(registry.get("libreoffice").is_none());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }
}
