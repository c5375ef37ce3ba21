//! A managed encoder process.
//!
//! [`EncodeProcess`] owns one child process, its stdout pipe, a background task
//! that keeps draining stderr, and (optionally) a concurrency permit. Every
//! read is bounded by the stall timeout. Dropping the handle kills and reaps the
//! child if it is still running.

use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound on retained diagnostic output; older bytes are discarded.
pub const DIAGNOSTIC_LIMIT: usize = 64 * 1024;

/// Lifecycle of an encoder process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeState {
    /// Spawned, nothing read yet.
    Starting,
    /// At least one chunk has been read.
    Streaming,
    /// Output ended and the process exited 0.
    Completed,
    /// Spawn failure, zero output, or non-zero exit.
    Failed,
    /// Killed by the caller, a dropped handle, or a stall.
    Canceled,
}

impl EncodeState {
    /// Whether no more output will be produced.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

enum Read {
    Chunk(Bytes),
    Eof,
    Stalled,
}

/// Handle to one running encoder.
#[derive(Debug)]
pub struct EncodeProcess {
    label: String,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    diagnostics: Option<JoinHandle<String>>,
    diagnostics_text: Option<String>,
    permit: Option<OwnedSemaphorePermit>,
    state: EncodeState,
    stall_timeout: Duration,
    bytes_read: u64,
    started: Instant,
}

impl EncodeProcess {
    /// Spawn `command` with stdin closed and stdout/stderr piped.
    ///
    /// `label` identifies the job in logs. `permit` is held until the process
    /// finishes or is canceled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if the process cannot be spawned.
    pub fn spawn(
        mut command: Command,
        label: impl Into<String>,
        stall_timeout: Duration,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<Self> {
        let label = label.into();
        let program = command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned();

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| Error::tool(program.clone(), format!("failed to spawn {program}: {e}")))?;

        let stdout = child.stdout.take();
        let diagnostics = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_diagnostics(stderr)));

        debug!(job = %label, pid = ?child.id(), "encoder spawned");

        Ok(Self {
            label,
            child: Some(child),
            stdout,
            diagnostics,
            diagnostics_text: None,
            permit,
            state: EncodeState::Starting,
            stall_timeout,
            bytes_read: 0,
            started: Instant::now(),
        })
    }

    /// Job label used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EncodeState {
        self.state
    }

    /// Total bytes read from stdout so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// OS process id, while the child is owned by this handle.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// First read of up to `size` bytes.
    ///
    /// Call this before committing a response: any failure here can still be
    /// reported to the client.
    ///
    /// # Errors
    ///
    /// - [`Error::EncoderStartup`] if the encoder closed stdout without writing
    ///   anything; carries its diagnostic output.
    /// - [`Error::EncoderStalled`] if nothing arrived within the stall timeout.
    pub async fn peek_first(&mut self, size: usize) -> Result<Bytes> {
        if self.state != EncodeState::Starting {
            return Err(Error::internal(format!(
                "peek_first on {} in state {:?}",
                self.label, self.state
            )));
        }

        match self.read(size).await {
            Ok(Read::Chunk(chunk)) => Ok(chunk),
            Ok(Read::Eof) => {
                let (status, diagnostic) = self.finish().await;
                self.state = EncodeState::Failed;
                warn!(
                    job = %self.label,
                    status = ?status,
                    diagnostic = %diagnostic,
                    "encoder produced no output"
                );
                let diagnostic = if diagnostic.trim().is_empty() {
                    match status {
                        Some(status) => format!("encoder exited with {status} before writing output"),
                        None => "encoder closed its output before writing anything".to_string(),
                    }
                } else {
                    diagnostic
                };
                Err(Error::EncoderStartup { diagnostic })
            }
            Ok(Read::Stalled) => {
                self.cancel();
                warn!(job = %self.label, timeout = ?self.stall_timeout, "encoder stalled before first chunk");
                Err(Error::EncoderStalled {
                    secs: self.stall_timeout.as_secs(),
                })
            }
            Err(e) => {
                self.cancel();
                Err(e)
            }
        }
    }

    /// Next chunk of up to `size` bytes, or `None` once the output has ended.
    ///
    /// End of output collects the exit status. A non-zero exit after output
    /// began cannot change a committed response, so it is logged and reported
    /// as a normal end of stream. A stall after the first chunk does the same.
    ///
    /// # Errors
    ///
    /// A stall before any output is reported as [`Error::EncoderStalled`];
    /// pipe read failures as [`Error::Io`].
    pub async fn next_chunk(&mut self, size: usize) -> Result<Option<Bytes>> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        match self.read(size).await {
            Ok(Read::Chunk(chunk)) => Ok(Some(chunk)),
            Ok(Read::Eof) => {
                let (status, diagnostic) = self.finish().await;
                match status {
                    Some(status) if status.success() => {
                        self.state = EncodeState::Completed;
                        debug!(
                            job = %self.label,
                            bytes = self.bytes_read,
                            elapsed = ?self.started.elapsed(),
                            "encoder completed"
                        );
                    }
                    _ => {
                        self.state = EncodeState::Failed;
                        warn!(
                            job = %self.label,
                            status = ?status,
                            bytes = self.bytes_read,
                            diagnostic = %diagnostic,
                            "{}",
                            failure_summary(self.bytes_read)
                        );
                    }
                }
                Ok(None)
            }
            Ok(Read::Stalled) => {
                self.cancel();
                if self.bytes_read == 0 {
                    warn!(job = %self.label, timeout = ?self.stall_timeout, "encoder stalled before first chunk");
                    return Err(Error::EncoderStalled {
                        secs: self.stall_timeout.as_secs(),
                    });
                }
                warn!(
                    job = %self.label,
                    bytes = self.bytes_read,
                    timeout = ?self.stall_timeout,
                    "encoder stalled mid-stream"
                );
                Ok(None)
            }
            Err(e) => {
                self.cancel();
                Err(e)
            }
        }
    }

    /// Kill the process and release everything this handle holds.
    ///
    /// Safe in any state. Returns `true` only if this call released something;
    /// later calls return `false`.
    pub fn cancel(&mut self) -> bool {
        let mut released = self.stdout.take().is_some();

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!(job = %self.label, error = %e, "kill failed; process already exited");
            }
            reap(child);
            released = true;
        }

        if let Some(task) = self.diagnostics.take() {
            task.abort();
            released = true;
        }

        released |= self.permit.take().is_some();

        if released && !self.state.is_terminal() {
            self.state = EncodeState::Canceled;
            debug!(job = %self.label, bytes = self.bytes_read, "encoder canceled");
        }

        released
    }

    /// Diagnostic output of the encoder, for logging.
    ///
    /// Waits for the collector to finish, bounded by the stall timeout. The
    /// result is cached.
    pub async fn drain_diagnostics(&mut self) -> String {
        if let Some(text) = &self.diagnostics_text {
            return text.clone();
        }

        let text = match self.diagnostics.take() {
            Some(task) => match timeout(self.stall_timeout, task).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    debug!(job = %self.label, error = %e, "diagnostics collector did not finish");
                    String::new()
                }
                Err(_) => {
                    debug!(job = %self.label, "timed out waiting for diagnostics");
                    String::new()
                }
            },
            None => String::new(),
        };

        self.diagnostics_text = Some(text.clone());
        text
    }

    async fn read(&mut self, size: usize) -> Result<Read> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(Read::Eof);
        };

        let mut buf = BytesMut::with_capacity(size.max(1));
        match timeout(self.stall_timeout, stdout.read_buf(&mut buf)).await {
            Err(_) => Ok(Read::Stalled),
            Ok(Err(e)) => Err(Error::from(e)),
            Ok(Ok(0)) => Ok(Read::Eof),
            Ok(Ok(n)) => {
                self.bytes_read += n as u64;
                if self.state == EncodeState::Starting {
                    self.state = EncodeState::Streaming;
                    debug!(job = %self.label, elapsed = ?self.started.elapsed(), "encoder first chunk");
                }
                Ok(Read::Chunk(buf.freeze()))
            }
        }
    }

    /// Close stdout, collect the exit status and diagnostics, release the permit.
    async fn finish(&mut self) -> (Option<ExitStatus>, String) {
        self.stdout = None;

        let status = match self.child.take() {
            Some(mut child) => match timeout(self.stall_timeout, child.wait()).await {
                Ok(Ok(status)) => Some(status),
                Ok(Err(e)) => {
                    warn!(job = %self.label, error = %e, "failed to wait for encoder");
                    None
                }
                Err(_) => {
                    warn!(job = %self.label, "encoder closed its output but did not exit");
                    let _ = child.start_kill();
                    reap(child);
                    None
                }
            },
            None => None,
        };

        let diagnostic = self.drain_diagnostics().await;
        self.permit = None;
        (status, diagnostic)
    }
}

impl Drop for EncodeProcess {
    fn drop(&mut self) {
        if self.cancel() {
            debug!(job = %self.label, "encoder handle dropped while running");
        }
    }
}

/// Wait for a killed child in the background so it does not linger as a zombie.
fn reap(mut child: Child) {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            let _ = child.wait().await;
        });
    }
    // Outside a runtime, kill_on_drop and tokio's orphan queue take over.
}

/// Read `reader` to the end, keeping only the last [`DIAGNOSTIC_LIMIT`] bytes.
async fn collect_diagnostics<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut kept: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > DIAGNOSTIC_LIMIT {
                    let excess = kept.len() - DIAGNOSTIC_LIMIT;
                    kept.drain(..excess);
                }
            }
        }
    }

    String::from_utf8_lossy(&kept).into_owned()
}

/// Log line for an encoder that exited unsuccessfully after `bytes_read` bytes.
fn failure_summary(bytes_read: u64) -> &'static str {
    if bytes_read == 0 {
        "encoder produced no output"
    } else {
        "encoder failed mid-stream"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    const STALL: Duration = Duration::from_secs(10);

    fn sh(script: &str, stall: Duration, permit: Option<OwnedSemaphorePermit>) -> EncodeProcess {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        EncodeProcess::spawn(cmd, "test", stall, permit).unwrap()
    }

    async fn read_all(process: &mut EncodeProcess, first: Bytes) -> Vec<u8> {
        let mut out = first.to_vec();
        while let Some(chunk) = process.next_chunk(4096).await.unwrap() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn test_streams_output_and_completes() {
        let mut p = sh("printf 'hello '; printf 'world'", STALL, None);
        assert_eq!(p.state(), EncodeState::Starting);

        let first = p.peek_first(4096).await.unwrap();
        assert!(!first.is_empty());
        assert_eq!(p.state(), EncodeState::Streaming);

        let out = read_all(&mut p, first).await;
        assert_eq!(out, b"hello world");
        assert_eq!(p.state(), EncodeState::Completed);
        assert_eq!(p.bytes_read(), 11);
        assert!(!p.cancel());
    }

    #[tokio::test]
    async fn test_zero_output_is_startup_failure() {
        let mut p = sh("echo 'Cannot load libcuda.so.1' >&2; exit 1", STALL, None);

        let err = p.peek_first(4096).await.unwrap_err();
        assert_matches!(err, Error::EncoderStartup { ref diagnostic } if diagnostic.contains("Cannot load libcuda.so.1"));
        assert_eq!(err.http_status(), 500);
        assert_eq!(p.state(), EncodeState::Failed);
    }

    #[tokio::test]
    async fn test_zero_output_with_clean_exit_is_still_a_failure() {
        let mut p = sh("exit 0", STALL, None);
        let err = p.peek_first(4096).await.unwrap_err();
        assert_matches!(err, Error::EncoderStartup { ref diagnostic } if diagnostic.contains("before writing output"));
        assert_eq!(p.state(), EncodeState::Failed);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_stream() {
        let mut p = sh("printf 'partial'; echo 'Conversion failed!' >&2; exit 1", STALL, None);

        let first = p.peek_first(4096).await.unwrap();
        let out = read_all(&mut p, first).await;
        assert_eq!(out, b"partial");
        assert_eq!(p.state(), EncodeState::Failed);
        assert!(p.drain_diagnostics().await.contains("Conversion failed!"));
    }

    #[tokio::test]
    async fn test_failure_without_output_when_read_directly() {
        let mut p = sh("echo 'No such filter' >&2; exit 1", STALL, None);

        assert_eq!(p.next_chunk(4096).await.unwrap(), None);
        assert_eq!(p.state(), EncodeState::Failed);
        assert_eq!(p.bytes_read(), 0);
        assert_eq!(failure_summary(p.bytes_read()), "encoder produced no output");
        assert_eq!(failure_summary(7), "encoder failed mid-stream");
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let semaphore = Arc::new(Semaphore::new(1));
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let mut p = sh("sleep 30", STALL, Some(permit));
        assert_eq!(semaphore.available_permits(), 0);

        assert!(p.cancel());
        assert_eq!(p.state(), EncodeState::Canceled);
        assert_eq!(semaphore.available_permits(), 1);

        assert!(!p.cancel());
        assert_eq!(p.state(), EncodeState::Canceled);
        assert_eq!(p.next_chunk(4096).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_releases_permit() {
        let semaphore = Arc::new(Semaphore::new(1));
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let p = sh("sleep 30", STALL, Some(permit));
        assert!(p.pid().is_some());

        drop(p);
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_stall_before_first_chunk() {
        let mut p = sh("sleep 30", Duration::from_millis(200), None);

        let err = p.peek_first(4096).await.unwrap_err();
        assert_matches!(err, Error::EncoderStalled { .. });
        assert_eq!(err.http_status(), 504);
        assert_eq!(p.state(), EncodeState::Canceled);
    }

    #[tokio::test]
    async fn test_stall_after_first_chunk_ends_stream() {
        let mut p = sh("printf 'x'; sleep 30", Duration::from_millis(200), None);

        let first = p.peek_first(4096).await.unwrap();
        assert_eq!(&first[..], b"x");
        assert_eq!(p.next_chunk(4096).await.unwrap(), None);
        assert_eq!(p.state(), EncodeState::Canceled);
    }

    #[tokio::test]
    async fn test_chatty_stderr_does_not_block_output() {
        let mut p = sh("head -c 1000000 /dev/zero >&2; printf 'done'", STALL, None);

        let first = p.peek_first(4096).await.unwrap();
        let out = read_all(&mut p, first).await;
        assert_eq!(out, b"done");
        assert_eq!(p.state(), EncodeState::Completed);

        let diagnostics = p.drain_diagnostics().await;
        assert_eq!(diagnostics.len(), DIAGNOSTIC_LIMIT);
        assert_eq!(p.drain_diagnostics().await, diagnostics);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let cmd = Command::new("/nonexistent/bin/ffmpeg");
        let err = EncodeProcess::spawn(cmd, "test", STALL, None).unwrap_err();
        assert_matches!(err, Error::Tool { ref tool, .. } if tool == "/nonexistent/bin/ffmpeg");
    }

    #[tokio::test]
    async fn test_peek_first_only_once() {
        let mut p = sh("printf 'abc'", STALL, None);
        p.peek_first(4096).await.unwrap();
        assert_matches!(p.peek_first(4096).await, Err(Error::Internal(_)));
    }
}
