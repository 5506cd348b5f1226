//! Spawning and supervising the transform process.
//!
//! [`run_transform`] spawns the command, streams stdout and stderr line
//! by line into the log, and waits for exit under the configured timeout.
//! The child is killed if the timeout fires or the future is dropped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::command::{ProcessError, TransformCommand, TransformOutcome};

/// How long to keep draining output after the process exits.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Longest output line logged as-is (64 KiB); the excess is dropped.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Run the transform once and report how it terminated.
///
/// A non-zero exit is returned as `Ok` with its exit code; use
/// [`TransformOutcome::into_result`] to treat it as an error.
pub async fn run_transform(
    cmd: &TransformCommand,
    job_id: &str,
) -> Result<TransformOutcome, ProcessError> {
    let (exe, args) = resolve(cmd).await?.argv();

    let mut command = Command::new(&exe);
    command
        .args(&args)
        .current_dir(&cmd.working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = command.spawn().map_err(|e| spawn_error(&exe, e))?;
    tracing::info!(job_id, program = %exe, pid = ?child.id(), "Transform started");

    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(forward_lines(out, job_id.to_string(), "stdout")));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(forward_lines(err, job_id.to_string(), "stderr")));

    let waited = tokio::time::timeout(cmd.timeout, child.wait()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            abort(stdout);
            abort(stderr);
            return Err(ProcessError::Io(e));
        }
        Err(_elapsed) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(job_id, error = %e, "Failed to kill timed-out transform");
            }
            abort(stdout);
            abort(stderr);
            tracing::warn!(job_id, elapsed_ms, "Transform timed out");
            return Err(ProcessError::Timeout { elapsed_ms });
        }
    };

    drain(stdout).await;
    drain(stderr).await;

    let exit_code = status.code().unwrap_or(-1);
    tracing::info!(job_id, exit_code, duration_ms = elapsed_ms, "Transform exited");

    Ok(TransformOutcome {
        exit_code,
        duration_ms: elapsed_ms,
    })
}

/// Anchor the program (and launcher) paths before the child moves into
/// the job workspace.
///
/// A program run through a launcher only has to exist; the launcher
/// decides how to execute it. A program spawned directly must also be
/// executable.
async fn resolve(cmd: &TransformCommand) -> Result<TransformCommand, ProcessError> {
    let direct = cmd.launcher.is_empty();
    let program = resolve_path(&cmd.program.to_string_lossy(), direct).await?;

    let mut launcher = cmd.launcher.clone();
    if let Some(first) = launcher.first_mut() {
        *first = resolve_path(first, true).await?;
    }

    Ok(TransformCommand {
        launcher,
        program: PathBuf::from(program),
        ..cmd.clone()
    })
}

/// Check an explicit path and make it absolute.
///
/// Bare names are left for the `PATH` lookup done at spawn time. Relative
/// paths are anchored to the current directory because the child runs in
/// the job workspace.
async fn resolve_path(exe: &str, require_exec: bool) -> Result<String, ProcessError> {
    let path = Path::new(exe);
    if !exe.contains(std::path::MAIN_SEPARATOR) {
        return Ok(exe.to_string());
    }

    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ProcessError::NotFound(exe.to_string()))?;
    if !metadata.is_file() {
        return Err(ProcessError::NotFound(exe.to_string()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = metadata.permissions().mode();
        if require_exec && mode & 0o111 == 0 {
            return Err(ProcessError::PermissionDenied(format!(
                "{exe} is not executable (mode {mode:#o})"
            )));
        }
    }
    #[cfg(not(unix))]
    let _ = require_exec;

    Ok(path.to_string_lossy().into_owned())
}

fn spawn_error(exe: &str, err: std::io::Error) -> ProcessError {
    match err.kind() {
        std::io::ErrorKind::NotFound => ProcessError::NotFound(exe.to_string()),
        std::io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied(exe.to_string()),
        _ => ProcessError::Io(err),
    }
}

/// Log every line of `reader` until EOF. Invalid UTF-8 is replaced.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, job_id: String, stream: &'static str) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        match read_capped_line(&mut reader, &mut buf).await {
            Ok(None) => break,
            Ok(Some(truncated)) => {
                let line = String::from_utf8_lossy(&buf);
                if truncated {
                    tracing::info!(job_id = %job_id, stream, truncated, "[transform] {}", line);
                } else {
                    tracing::info!(job_id = %job_id, stream, "[transform] {}", line.trim_end());
                }
            }
            Err(e) => {
                tracing::debug!(job_id = %job_id, stream, error = %e, "Transform output closed");
                break;
            }
        }
    }
}

/// Read one line into `buf`, keeping at most [`MAX_LINE_BYTES`].
///
/// Returns `None` at EOF, otherwise whether the line was cut short. The
/// rest of an overlong line is read and discarded.
async fn read_capped_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<bool>> {
    buf.clear();
    let n = (&mut *reader)
        .take(MAX_LINE_BYTES as u64)
        .read_until(b'\n', buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if n < MAX_LINE_BYTES || buf.last() == Some(&b'\n') {
        return Ok(Some(false));
    }

    let mut rest = Vec::new();
    loop {
        rest.clear();
        let skipped = (&mut *reader)
            .take(MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut rest)
            .await?;
        if skipped == 0 || rest.last() == Some(&b'\n') {
            break;
        }
    }
    Ok(Some(true))
}

async fn drain(handle: Option<JoinHandle<()>>) {
    if let Some(mut handle) = handle {
        if tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

fn abort(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
