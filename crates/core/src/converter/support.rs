//! Checks shared by the bundled converters.

use std::path::Path;
use std::time::Instant;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionResult};

pub(crate) async fn ensure_input(job: &ConversionJob) -> Result<(), ConverterError> {
    match tokio::fs::metadata(&job.source).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ConverterError::InputNotFound {
            path: job.source.clone(),
        }),
    }
}

/// Exit code policy of the bundled converters: only zero is success.
pub(crate) fn check_exit_code(converter: &str, exit_code: i32) -> Result<(), ConverterError> {
    if exit_code == 0 {
        Ok(())
    } else {
        Err(ConverterError::conversion_failed(
            converter,
            format!("process exited with code {}", exit_code),
            Some(exit_code),
        ))
    }
}

/// Creates the target's parent directory.
pub(crate) async fn prepare_target(job: &ConversionJob) -> Result<(), ConverterError> {
    if let Some(parent) = job.target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Moves a produced file, copying when a rename crosses filesystems.
pub(crate) async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

/// Verifies the target exists and builds the result.
pub(crate) async fn finish(
    converter: &str,
    job: &ConversionJob,
    started: Instant,
) -> Result<ConversionResult, ConverterError> {
    let meta = tokio::fs::metadata(&job.target)
        .await
        .map_err(|_| ConverterError::OutputNotCreated {
            path: job.target.clone(),
        })?;

    Ok(ConversionResult {
        job_id: job.job_id.clone(),
        converter: converter.to_string(),
        target: job.target.clone(),
        size_bytes: meta.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::DocumentType;

    #[test]
    fn test_check_exit_code() {
        assert!(check_exit_code("pandoc", 0).is_ok());
        let err = check_exit_code("pandoc", 64).unwrap_err();
        assert!(matches!(
            err,
            ConverterError::ConversionFailed {
                exit_code: Some(64),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_ensure_input_missing() {
        let dir = tempfile::tempdir().unwrap();
        let job = ConversionJob::new(
            "job",
            dir.path().join("missing.docx"),
            DocumentType::Docx,
            dir.path().join("out.pdf"),
            DocumentType::Pdf,
        );
        assert!(matches!(
            ensure_input(&job).await,
            Err(ConverterError::InputNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_finish_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.html");
        let job = ConversionJob::new(
            "job-7",
            dir.path().join("in.md"),
            DocumentType::Markdown,
            &target,
            DocumentType::Html,
        );

        assert!(matches!(
            finish("pandoc", &job, Instant::now()).await,
            Err(ConverterError::OutputNotCreated { .. })
        ));

        prepare_target(&job).await.unwrap();
        tokio::fs::write(&target, b"<p>hi</p>").await.unwrap();
        let result = finish("pandoc", &job, Instant::now()).await.unwrap();
        assert_eq!(result.size_bytes, 9);
        assert_eq!(result.job_id, "job-7");
        assert_eq!(result.converter, "pandoc");
    }

    #[tokio::test]
    async fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.pdf");
        let to = dir.path().join("b.pdf");
        tokio::fs::write(&from, b"%PDF-1.7").await.unwrap();

        move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(tokio::fs::read(&to).await.unwrap(), b"%PDF-1.7");
    }
}
