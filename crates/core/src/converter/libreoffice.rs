//! LibreOffice-based converter implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::error::ConverterError;
use super::support;
use super::traits::{ConverterContext, ExternalConverter};
use super::types::{ConversionJob, ConversionResult, DocumentType};
use crate::process::ProcessHarness;

/// Catalog name of this converter.
pub const NAME: &str = "libreoffice";

/// Executables tried, in order, when locating LibreOffice.
const BINARY_CANDIDATES: &[&str] = &["soffice", "libreoffice"];

/// Directory under the working directory receiving intermediate output.
/// Each conversion stages into its own randomly named subdirectory.
const STAGING_DIR: &str = ".docshift-libreoffice";

static OFFICE_INPUTS: [DocumentType; 6] = [
    DocumentType::Doc,
    DocumentType::Docx,
    DocumentType::Odt,
    DocumentType::Rtf,
    DocumentType::Txt,
    DocumentType::Html,
];

static OFFICE_OUTPUTS: [DocumentType; 5] = [
    DocumentType::Pdf,
    DocumentType::Docx,
    DocumentType::Odt,
    DocumentType::Rtf,
    DocumentType::Html,
];

/// Converter running `soffice --headless --convert-to`.
///
/// LibreOffice refuses to run two headless instances on one user profile,
/// so conversions on one instance are serialized.
pub struct LibreOfficeConverter {
    binary: PathBuf,
    harness: ProcessHarness,
    lock: Arc<Mutex<()>>,
}

/// Staging directory of one conversion, removed on drop.
struct Staging {
    dir: PathBuf,
    harness: ProcessHarness,
}

impl Drop for Staging {
    fn drop(&mut self) {
        self.harness.delete_best_effort(&self.dir);
    }
}

impl LibreOfficeConverter {
    pub fn new(binary: PathBuf, context: ConverterContext) -> Self {
        Self {
            binary,
            harness: context.harness(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the LibreOffice executable in use.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn staging_root(&self) -> PathBuf {
        self.harness.work_dir().join(STAGING_DIR)
    }

    async fn create_staging(&self) -> Result<Staging, ConverterError> {
        let dir = self.staging_root().join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Staging {
            dir,
            harness: self.harness.clone(),
        })
    }

    fn build_args(&self, job: &ConversionJob, out_dir: &Path) -> Vec<String> {
        vec![
            self.binary.to_string_lossy().to_string(),
            "--headless".to_string(),
            "--norestore".to_string(),
            "--convert-to".to_string(),
            job.target_type.extension().to_string(),
            "--outdir".to_string(),
            out_dir.to_string_lossy().to_string(),
            job.source.to_string_lossy().to_string(),
        ]
    }

    /// Name LibreOffice gives its output: source stem plus target extension.
    fn produced_path(job: &ConversionJob, out_dir: &Path) -> PathBuf {
        let stem = job
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        out_dir.join(format!("{}.{}", stem, job.target_type.extension()))
    }

    /// Runs soffice into `staging`. An interrupted run hands the staging
    /// directory and the instance lock over to the harness, which releases
    /// both once the abandoned process exits.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        staging: Staging,
        guard: OwnedMutexGuard<()>,
    ) -> Result<(), ConverterError> {
        let request = self
            .harness
            .request(self.build_args(job, &staging.dir))
            .interruptible(job.interrupt.clone());
        // Tuple fields drop in order: staging is removed before the lock opens.
        let (exit_code, held) = self.harness.run_exclusive(request, (staging, guard)).await?;
        support::check_exit_code(NAME, exit_code)?;

        let produced = Self::produced_path(job, &held.0.dir);
        if !produced.is_file() {
            return Err(ConverterError::OutputNotCreated { path: produced });
        }
        support::prepare_target(job).await?;
        support::move_file(&produced, &job.target).await?;
        Ok(())
    }
}

/// Locates a LibreOffice executable on `PATH`.
fn locate() -> Option<PathBuf> {
    BINARY_CANDIDATES
        .iter()
        .find_map(|candidate| which::which(candidate).ok())
}

/// Availability probe: LibreOffice is installed.
pub fn probe(_work_dir: &Path) -> bool {
    locate().is_some()
}

/// Catalog factory.
pub fn create(context: ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError> {
    let binary = locate().ok_or_else(|| {
        ConverterError::initialization("LibreOffice executable (soffice) not found on PATH")
    })?;
    debug!(binary = %binary.display(), "Using LibreOffice");
    Ok(Arc::new(LibreOfficeConverter::new(binary, context)))
}

#[async_trait]
impl ExternalConverter for LibreOfficeConverter {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_conversions(&self) -> Vec<(DocumentType, DocumentType)> {
        OFFICE_INPUTS
            .iter()
            .flat_map(|source| OFFICE_OUTPUTS.iter().map(move |target| (*source, *target)))
            .filter(|(source, target)| source != target)
            .collect()
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        if !self.supports(job.source_type, job.target_type) {
            return Err(ConverterError::UnsupportedConversion {
                source_type: job.source_type,
                target_type: job.target_type,
            });
        }
        support::ensure_input(&job).await?;

        let guard = Arc::clone(&self.lock).lock_owned().await;
        let started = Instant::now();

        let staging = self.create_staging().await?;
        debug!(job_id = %job.job_id, staging = %staging.dir.display(), "Staging LibreOffice output");
        self.run_conversion(&job, staging, guard).await?;

        support::finish(NAME, &job, started).await
    }

    async fn is_operational(&self) -> bool {
        self.binary.is_file()
    }

    async fn shutdown(&self) -> Result<(), ConverterError> {
        // Waits for an in-flight conversion; each one is a separate process.
        let _guard = self.lock.lock().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use std::time::Duration;

    fn converter(work_dir: &Path) -> LibreOfficeConverter {
        let context = ConverterContext::new(
            work_dir,
            Duration::from_secs(30),
            Arc::new(RecordingSink::new()),
        );
        LibreOfficeConverter::new(PathBuf::from("/usr/bin/soffice"), context)
    }

    fn docx_to_pdf() -> ConversionJob {
        ConversionJob::new(
            "job-1",
            "/docs/annual report.docx",
            DocumentType::Docx,
            "/out/report.pdf",
            DocumentType::Pdf,
        )
    }

    #[test]
    fn test_build_args() {
        let converter = converter(Path::new("/var/lib/docshift"));
        let args = converter.build_args(&docx_to_pdf(), Path::new("/var/lib/docshift/stage"));

        assert_eq!(args[0], "/usr/bin/soffice");
        assert!(args.contains(&"--headless".to_string()));
        let convert_to = args.iter().position(|a| a == "--convert-to").unwrap();
        assert_eq!(args[convert_to + 1], "pdf");
        let outdir = args.iter().position(|a| a == "--outdir").unwrap();
        assert_eq!(args[outdir + 1], "/var/lib/docshift/stage");
        assert_eq!(args.last().unwrap(), "/docs/annual report.docx");
    }

    #[test]
    fn test_produced_path_uses_source_stem() {
        let produced = LibreOfficeConverter::produced_path(&docx_to_pdf(), Path::new("/stage"));
        assert_eq!(produced, PathBuf::from("/stage/annual report.pdf"));
    }

    #[test]
    fn test_supported_conversions() {
        let converter = converter(Path::new("/tmp"));
        assert!(converter.supports(DocumentType::Docx, DocumentType::Pdf));
        assert!(converter.supports(DocumentType::Doc, DocumentType::Docx));
        assert!(!converter.supports(DocumentType::Pdf, DocumentType::Docx));
        assert!(!converter.supports(DocumentType::Odt, DocumentType::Odt));
        assert!(!converter.supports(DocumentType::Markdown, DocumentType::Pdf));
    }

    #[tokio::test]
    async fn test_unsupported_conversion_rejected() {
        let converter = converter(Path::new("/tmp"));
        let job = ConversionJob::new(
            "job-2",
            "/docs/scan.pdf",
            DocumentType::Pdf,
            "/out/scan.docx",
            DocumentType::Docx,
        );
        assert!(matches!(
            converter.convert(job).await,
            Err(ConverterError::UnsupportedConversion { .. })
        ));
    }

    #[tokio::test]
    async fn test_job_id_never_selects_staging_path() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join("convert.sh"), "exit 0\n").unwrap();
        let source = dir.path().join("letter.docx");
        std::fs::write(&source, "doc").unwrap();

        let context = ConverterContext::new(
            &work,
            Duration::from_secs(5),
            Arc::new(RecordingSink::new()),
        );
        let converter = LibreOfficeConverter::new(PathBuf::from("/nonexistent/soffice"), context);

        for job_id in ["..", ""] {
            let job = ConversionJob::new(
                job_id,
                &source,
                DocumentType::Docx,
                dir.path().join("letter.pdf"),
                DocumentType::Pdf,
            );
            assert!(matches!(
                converter.convert(job).await,
                Err(ConverterError::Process(crate::ProcessError::Access { .. }))
            ));
            assert!(work.join("convert.sh").is_file());
            assert!(source.is_file());
        }

        let staged = std::fs::read_dir(converter.staging_root()).unwrap().count();
        assert_eq!(staged, 0);
    }

    #[tokio::test]
    async fn test_missing_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path());
        let job = ConversionJob::new(
            "job-3",
            dir.path().join("missing.docx"),
            DocumentType::Docx,
            dir.path().join("missing.pdf"),
            DocumentType::Pdf,
        );
        assert!(matches!(
            converter.convert(job).await,
            Err(ConverterError::InputNotFound { .. })
        ));
    }
}
