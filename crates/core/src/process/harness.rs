//! Process execution with timeout enforcement and output capture.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::error::ProcessError;
use super::sink::OutputSink;
use super::types::{ExecutionOutcome, ExecutionRequest};
use crate::metrics::{PROCESS_DURATION, PROCESS_EXECUTIONS};

/// How long to wait for output readers after the process is gone.
///
/// A grandchild that inherited stdout can keep the pipe open forever.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Joins arguments with single spaces and wraps them in one pair of quotes.
pub fn quote<S: AsRef<str>>(args: &[S]) -> String {
    let joined = args
        .iter()
        .map(|arg| arg.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    format!("\"{}\"", joined)
}

/// Command line running a no-argument script through the platform shell.
///
/// For `sh`, characters that stay special inside double quotes are escaped
/// so the path reaches the shell literally.
pub fn shell_command(script: &Path) -> Vec<String> {
    let path = script.display().to_string();
    if cfg!(windows) {
        vec!["cmd".to_string(), "/C".to_string(), quote(&[path])]
    } else {
        vec!["sh".to_string(), "-c".to_string(), quote(&[escape_for_sh(&path)])]
    }
}

fn escape_for_sh(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len());
    for c in arg.chars() {
        if matches!(c, '"' | '$' | '`' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Runs one process to a terminal outcome.
///
/// Stdout and stderr are forwarded line by line to the request's sink. A
/// process that outlives its timeout is killed together with its process
/// group. An interrupted caller gets [`ExecutionOutcome::Interrupted`] while
/// the process is left to finish on its own.
pub async fn execute(request: ExecutionRequest) -> ExecutionOutcome {
    let command_line = request.command_line();
    let timeout = request.timeout;

    let started = Instant::now();
    let outcome = run(request, &command_line).await;

    PROCESS_EXECUTIONS
        .with_label_values(&[outcome.label()])
        .inc();
    PROCESS_DURATION
        .with_label_values(&[outcome.label()])
        .observe(started.elapsed().as_secs_f64());

    match &outcome {
        ExecutionOutcome::Completed(code) => {
            debug!(command = %command_line, exit_code = code, elapsed_ms = started.elapsed().as_millis() as u64, "Process completed");
        }
        ExecutionOutcome::TimedOut => {
            warn!(command = %command_line, timeout_ms = timeout.as_millis() as u64, "Process timed out and was terminated");
        }
        ExecutionOutcome::SpawnFailed(e) => {
            warn!(command = %command_line, error = %e, "Process could not be run");
        }
        ExecutionOutcome::Interrupted => {
            warn!(command = %command_line, "Wait for process was interrupted, process left running");
        }
    }

    outcome
}

async fn run(request: ExecutionRequest, command_line: &str) -> ExecutionOutcome {
    let ExecutionRequest {
        command,
        work_dir,
        timeout,
        env_vars,
        sink,
        interrupt,
        reaped,
    } = request;

    let Some((program, args)) = command.split_first() else {
        return ExecutionOutcome::SpawnFailed(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command line",
        ));
    };

    if interrupt.as_ref().is_some_and(|token| token.is_cancelled()) {
        return ExecutionOutcome::Interrupted;
    }

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(&work_dir)
        .envs(&env_vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);
    detach_from_host(&mut cmd);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return ExecutionOutcome::SpawnFailed(e),
    };
    trace!(command = %command_line, pid = ?child.id(), "Process spawned");

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, Arc::clone(&sink)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, Arc::clone(&sink)));
    }

    let waited = tokio::select! {
        result = tokio::time::timeout(timeout, child.wait()) => match result {
            Ok(status) => Waited::Exited(status),
            Err(_) => Waited::Elapsed,
        },
        _ = cancelled(interrupt.as_ref()) => Waited::Interrupted,
    };

    match waited {
        Waited::Exited(Ok(status)) => {
            drain(readers).await;
            ExecutionOutcome::Completed(exit_code(status))
        }
        Waited::Exited(Err(e)) => {
            terminate(&mut child).await;
            drain(readers).await;
            ExecutionOutcome::SpawnFailed(e)
        }
        Waited::Elapsed => {
            terminate(&mut child).await;
            drain(readers).await;
            ExecutionOutcome::TimedOut
        }
        Waited::Interrupted => {
            reap_detached(child, readers, command_line.to_string(), reaped);
            ExecutionOutcome::Interrupted
        }
    }
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    Elapsed,
    Interrupted,
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn forward_lines<R>(stream: R, sink: Arc<dyn OutputSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(stream).split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    sink.info(line.trim_end_matches('\r'));
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Stopped reading process output");
                    break;
                }
            }
        }
    })
}

async fn drain(readers: Vec<JoinHandle<()>>) {
    let aborts: Vec<_> = readers.iter().map(|r| r.abort_handle()).collect();
    if tokio::time::timeout(OUTPUT_DRAIN_GRACE, futures::future::join_all(readers))
        .await
        .is_err()
    {
        debug!("Output pipes still open after process exit, abandoning readers");
        for abort in aborts {
            abort.abort();
        }
    }
}

/// Kills the process and everything in its process group, then reaps it.
async fn terminate(child: &mut Child) {
    kill_process_group(child);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Process already gone when terminating");
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    // The child leads its own group, see `detach_from_host`.
    if let Some(pid) = child.id() {
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

fn reap_detached(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    command_line: String,
    reaped: Option<oneshot::Sender<()>>,
) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                debug!(command = %command_line, exit_code = exit_code(status), "Abandoned process finished")
            }
            Err(e) => debug!(command = %command_line, error = %e, "Abandoned process could not be reaped"),
        }
        drain(readers).await;
        if let Some(tx) = reaped {
            let _ = tx.send(());
        }
    });
}

/// Keeps host shutdown signals away from spawned processes.
///
/// Shutdown scripts typically run while the host is terminating and must not
/// be cut short by the signal that terminates it.
#[cfg(unix)]
fn detach_from_host(command: &mut Command) {
    command.process_group(0);
}

#[cfg(windows)]
fn detach_from_host(command: &mut Command) {
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach_from_host(_command: &mut Command) {}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Preset execution context shared by the processes of one converter.
#[derive(Clone)]
pub struct ProcessHarness {
    work_dir: PathBuf,
    timeout: Duration,
    sink: Arc<dyn OutputSink>,
}

impl ProcessHarness {
    pub fn new(work_dir: impl Into<PathBuf>, timeout: Duration, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout,
            sink,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    /// A fresh request preset with this harness' directory, timeout and sink.
    pub fn request<I, S>(&self, command: I) -> ExecutionRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExecutionRequest::new(
            command.into_iter().map(Into::into).collect(),
            &self.work_dir,
            self.timeout,
            Arc::clone(&self.sink),
        )
    }

    /// Executes `request` and maps the outcome into a result.
    pub async fn run(&self, request: ExecutionRequest) -> Result<i32, ProcessError> {
        let command_line = request.command_line();
        let timeout = request.timeout;
        execute(request).await.into_result(command_line, timeout)
    }

    /// Like [`Self::run`], for backends allowing one native process at a time.
    ///
    /// `hold`, typically the instance lock guard, is handed back once the
    /// process has completed. If the wait is interrupted, `hold` is kept by a
    /// background task until the abandoned process exits, so the instance
    /// stays busy while its process is still running.
    pub async fn run_exclusive<H>(
        &self,
        request: ExecutionRequest,
        hold: H,
    ) -> Result<(i32, H), ProcessError>
    where
        H: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        match self.run(request.on_reaped(tx)).await {
            Ok(exit_code) => Ok((exit_code, hold)),
            Err(e @ ProcessError::Interrupted { .. }) => {
                tokio::spawn(async move {
                    let _ = rx.await;
                    drop(hold);
                });
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a no-argument script through the platform shell.
    pub async fn run_script(&self, script: &Path) -> Result<i32, ProcessError> {
        trace!(script = %script.display(), "Execute no-argument script");
        let script = std::path::absolute(script).unwrap_or_else(|_| script.to_path_buf());
        self.run(self.request(shell_command(&script))).await
    }

    /// Deletes a file or directory, warning through the sink on failure.
    pub fn delete_best_effort(&self, path: &Path) {
        delete_best_effort(path, self.sink.as_ref());
    }
}

impl std::fmt::Debug for ProcessHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHarness")
            .field("work_dir", &self.work_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Deletes `path`, emitting exactly one warning to `sink` if that fails.
pub fn delete_best_effort(path: &Path, sink: &dyn OutputSink) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    if let Err(e) = result {
        sink.warn(&format!("Cannot delete file: {} ({})", path.display(), e));
    }
}
