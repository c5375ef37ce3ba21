//! FFprobe-based media probing.

use super::DurationProbe;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::warn;

/// Deadline for a duration probe unless overridden with [`FfprobeDuration::with_timeout`].
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Duration probe backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeDuration {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeDuration {
    /// Create a probe that runs `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Kill ffprobe and fail if it has not exited after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The executable this probe runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The deadline applied to each probe.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl DurationProbe for FfprobeDuration {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args([
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-show_entries"),
            OsStr::new("format=duration"),
            OsStr::new("-of"),
            OsStr::new("default=noprint_wrappers=1:nokey=1"),
            path.as_os_str(),
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| Error::ProbeFailed {
            diagnostic: format!("failed to run {}: {e}", self.program.display()),
        })?;

        // Dropping the pending wait on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| Error::ProbeFailed {
                diagnostic: format!("I/O error waiting for {}: {e}", self.program.display()),
            })?,
            Err(_elapsed) => {
                warn!(
                    program = %self.program.display(),
                    file = %path.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "ffprobe timed out"
                );
                return Err(Error::ProbeFailed {
                    diagnostic: format!(
                        "{} timed out after {}s",
                        self.program.display(),
                        self.timeout.as_secs_f64()
                    ),
                });
            }
        };

        let stdout = check_output(&self.program, output)?;
        parse_duration_output(&String::from_utf8_lossy(&stdout))
    }
}

/// Parse the single number ffprobe prints for `format=duration`.
pub fn parse_duration_output(stdout: &str) -> Result<f64> {
    let trimmed = stdout.trim();
    trimmed.parse::<f64>().map_err(|_| Error::ProbeParse {
        output: trimmed.to_string(),
    })
}

/// Duration and frame size of a video file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoInfo {
    /// Container duration in seconds.
    pub duration: Option<f64>,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe duration and dimensions of the first video stream.
pub fn probe_video(program: &Path, path: &Path) -> Result<VideoInfo> {
    let stdout = run_ffprobe(
        program,
        &[
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-select_streams"),
            OsStr::new("v:0"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_format"),
            OsStr::new("-show_streams"),
            path.as_os_str(),
        ],
    )?;

    parse_video_output(&stdout)
}

fn parse_video_output(json: &[u8]) -> Result<VideoInfo> {
    let output: FfprobeOutput = serde_json::from_slice(json)?;

    let video = output
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    Ok(VideoInfo {
        duration: output
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.trim().parse::<f64>().ok()),
        width: video.as_ref().and_then(|v| v.width),
        height: video.as_ref().and_then(|v| v.height),
    })
}

fn run_ffprobe(program: &Path, args: &[&OsStr]) -> Result<Vec<u8>> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::ProbeFailed {
            diagnostic: format!("failed to run {}: {e}", program.display()),
        })?;

    check_output(program, output)
}

/// Stdout of a finished ffprobe, or its stderr as the failure diagnostic.
fn check_output(program: &Path, output: std::process::Output) -> Result<Vec<u8>> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let diagnostic = if stderr.is_empty() {
            format!("{} exited with {}", program.display(), output.status)
        } else {
            stderr
        };
        return Err(Error::ProbeFailed { diagnostic });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_output("5423.360000\n").unwrap(), 5423.36);
        assert_eq!(parse_duration_output("  20.0  ").unwrap(), 20.0);
    }

    #[test]
    fn test_parse_duration_rejects_text() {
        assert_matches!(
            parse_duration_output("N/A\n"),
            Err(Error::ProbeParse { ref output }) if output == "N/A"
        );
        assert_matches!(parse_duration_output(""), Err(Error::ProbeParse { .. }));
    }

    #[test]
    fn test_parse_video_output() {
        let json = br#"{
            "streams": [
                {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 1608}
            ],
            "format": {"filename": "alien.mkv", "duration": "7020.480000"}
        }"#;

        let info = parse_video_output(json).unwrap();
        assert_eq!(info.duration, Some(7020.48));
        assert_eq!(info.width, Some(3840));
        assert_eq!(info.height, Some(1608));
    }

    #[test]
    fn test_parse_video_output_without_streams() {
        let info = parse_video_output(br#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(info, VideoInfo::default());
    }

    #[test]
    fn test_parse_video_output_garbage() {
        assert_matches!(parse_video_output(b"not json"), Err(Error::Json { .. }));
    }

    #[tokio::test]
    async fn test_missing_prober_is_probe_failure() {
        let probe = FfprobeDuration::new("/nonexistent/bin/ffprobe");
        let err = probe.probe_duration(Path::new("/movies/a.mkv")).await.unwrap_err();
        assert_matches!(err, Error::ProbeFailed { ref diagnostic } if diagnostic.contains("/nonexistent/bin/ffprobe"));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_probe_failure() {
        // `false` ignores its arguments and exits 1 without output.
        let probe = FfprobeDuration::new("false");
        let err = probe.probe_duration(Path::new("/movies/a.mkv")).await.unwrap_err();
        assert_matches!(err, Error::ProbeFailed { ref diagnostic } if diagnostic.contains("exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_prober_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\necho 20.0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let probe = FfprobeDuration::new(&script).with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = probe.probe_duration(Path::new("/movies/a.mkv")).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_matches!(err, Error::ProbeFailed { ref diagnostic } if diagnostic.contains("timed out after"));
    }

    #[test]
    fn test_default_timeout() {
        let probe = FfprobeDuration::new("ffprobe");
        assert_eq!(probe.timeout(), DEFAULT_PROBE_TIMEOUT);
        assert_eq!(probe.program(), Path::new("ffprobe"));
    }
}
