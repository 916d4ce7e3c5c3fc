//! Converter driven by user-provided shell scripts.
//!
//! The working directory holds up to three scripts, named for the platform
//! shell (`.sh` on Unix, `.bat` on Windows):
//!
//! - `convert`: required, runs once per job
//! - `startup`: optional, runs before the first conversion
//! - `shutdown`: optional, runs on shutdown if startup happened
//!
//! Job details reach the conversion script through environment variables
//! (`DOCSHIFT_SOURCE`, `DOCSHIFT_TARGET`, `DOCSHIFT_SOURCE_TYPE`,
//! `DOCSHIFT_TARGET_TYPE`).
//!
//! On Unix the scripts are executed directly and need their exec bit; a
//! conversion script without it is treated as absent.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::ConverterError;
use super::support;
use super::traits::{ConverterContext, ExternalConverter};
use super::types::{ConversionJob, ConversionResult, DocumentType};
use crate::process::{shell_command, ProcessHarness};

/// Catalog name of this converter.
pub const NAME: &str = "script";

#[cfg(windows)]
const SCRIPT_EXTENSION: &str = "bat";
#[cfg(not(windows))]
const SCRIPT_EXTENSION: &str = "sh";

/// Path of the script named `stem` in `dir`.
pub fn script_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, SCRIPT_EXTENSION))
}

/// Converter delegating every job to `convert.sh` / `convert.bat`.
///
/// Scripts usually front a single application instance, so one instance
/// runs at most one script at a time.
pub struct ScriptConverter {
    harness: ProcessHarness,
    convert_script: PathBuf,
    startup_script: PathBuf,
    shutdown_script: PathBuf,
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    started: bool,
}

impl ScriptConverter {
    pub fn new(context: ConverterContext) -> Self {
        let dir = context.work_dir.clone();
        Self {
            harness: context.harness(),
            convert_script: script_path(&dir, "convert"),
            startup_script: script_path(&dir, "startup"),
            shutdown_script: script_path(&dir, "shutdown"),
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    /// Runs an optional lifecycle script, requiring exit code zero.
    async fn run_lifecycle_script(&self, script: &Path) -> Result<(), ConverterError> {
        if !is_runnable(script) {
            return Ok(());
        }
        info!(script = %script.display(), "Running lifecycle script");
        let exit_code = self.harness.run_script(script).await?;
        support::check_exit_code(NAME, exit_code)
    }

    async fn ensure_started(&self, state: &mut ScriptState) -> Result<(), ConverterError> {
        if !state.started {
            self.run_lifecycle_script(&self.startup_script).await?;
            state.started = true;
        }
        Ok(())
    }
}

/// Whether `script` exists and can be executed.
fn is_runnable(script: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(script)
            .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        script.is_file()
    }
}

/// Availability probe: a runnable conversion script exists in the working
/// directory.
pub fn probe(work_dir: &Path) -> bool {
    is_runnable(&script_path(work_dir, "convert"))
}

/// Catalog factory.
pub fn create(context: ConverterContext) -> Result<Arc<dyn ExternalConverter>, ConverterError> {
    let convert_script = script_path(&context.work_dir, "convert");
    if !is_runnable(&convert_script) {
        return Err(ConverterError::initialization(format!(
            "conversion script not found or not executable: {}",
            convert_script.display()
        )));
    }
    debug!(script = %convert_script.display(), "Using conversion script");
    Ok(Arc::new(ScriptConverter::new(context)))
}

#[async_trait]
impl ExternalConverter for ScriptConverter {
    fn name(&self) -> &str {
        NAME
    }

    /// The script decides what it can handle, so every pair is offered.
    fn supported_conversions(&self) -> Vec<(DocumentType, DocumentType)> {
        DocumentType::ALL
            .iter()
            .flat_map(|source| DocumentType::ALL.iter().map(move |target| (*source, *target)))
            .collect()
    }

    fn supports(&self, _source: DocumentType, _target: DocumentType) -> bool {
        true
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        support::ensure_input(&job).await?;
        support::prepare_target(&job).await?;

        // Owned so an abandoned script keeps the instance busy until it exits.
        let mut state = Arc::clone(&self.state).lock_owned().await;
        self.ensure_started(&mut state).await?;

        let started = Instant::now();
        let request = self
            .harness
            .request(shell_command(&self.convert_script))
            .env("DOCSHIFT_SOURCE", job.source.to_string_lossy())
            .env("DOCSHIFT_TARGET", job.target.to_string_lossy())
            .env("DOCSHIFT_SOURCE_TYPE", job.source_type.extension())
            .env("DOCSHIFT_TARGET_TYPE", job.target_type.extension())
            .interruptible(job.interrupt.clone());
        let (exit_code, state) = self.harness.run_exclusive(request, state).await?;
        drop(state);

        support::check_exit_code(NAME, exit_code)?;
        support::finish(NAME, &job, started).await
    }

    async fn is_operational(&self) -> bool {
        is_runnable(&self.convert_script)
    }

    async fn shutdown(&self) -> Result<(), ConverterError> {
        let mut state = self.state.lock().await;
        if state.started {
            state.started = false;
            self.run_lifecycle_script(&self.shutdown_script).await?;
        }
        Ok(())
    }
}
