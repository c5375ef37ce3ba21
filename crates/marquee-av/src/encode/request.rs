//! Encoder invocations.
//!
//! An [`EncodeRequest`] plus an [`EncodeProfile`] fully determine the ffmpeg
//! command line. Output always goes to stdout.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

/// Time window of a single segment, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWindow {
    pub start: f64,
    pub duration: f64,
}

/// What part of the source to encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodeMode {
    /// The whole file as one continuous stream.
    Full,
    /// One self-contained segment whose timestamps continue the timeline.
    Segment(SegmentWindow),
}

/// Output container written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContainer {
    /// Fragmented MP4, playable while it is being written.
    Mp4,
    /// MPEG transport stream, as used by HLS segments.
    MpegTs,
}

impl OutputContainer {
    /// Value passed to ffmpeg's `-f`.
    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::MpegTs => "mpegts",
        }
    }

    /// HTTP content type of the encoded output.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::MpegTs => "video/MP2T",
        }
    }
}

/// Codec and rate-control settings shared by every encode.
///
/// Empty `hwaccel`, `preset` or `rate_control` strings leave the corresponding
/// flag out of the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeProfile {
    pub hwaccel: String,
    pub video_codec: String,
    pub preset: String,
    pub rate_control: String,
    /// Constant-quality target passed as `-cq`.
    pub quality: u32,
    pub audio_codec: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            hwaccel: "cuda".to_string(),
            video_codec: "h264_nvenc".to_string(),
            preset: "p3".to_string(),
            rate_control: "vbr".to_string(),
            quality: 20,
            audio_codec: "aac".to_string(),
        }
    }
}

/// One encoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub mode: EncodeMode,
    pub container: OutputContainer,
}

impl EncodeRequest {
    /// Progressive fragmented-MP4 encode of the whole file.
    pub fn full(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            mode: EncodeMode::Full,
            container: OutputContainer::Mp4,
        }
    }

    /// MPEG-TS encode of `[start, start + duration)`.
    pub fn segment(source: impl Into<PathBuf>, start: f64, duration: f64) -> Self {
        Self {
            source: source.into(),
            mode: EncodeMode::Segment(SegmentWindow { start, duration }),
            container: OutputContainer::MpegTs,
        }
    }

    /// Build the ffmpeg argument list.
    pub fn build_args(&self, profile: &EncodeProfile) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if !profile.hwaccel.is_empty() {
            args.push("-hwaccel".into());
            args.push(profile.hwaccel.as_str().into());
        }

        // Input seeking must precede -i to be fast.
        if let EncodeMode::Segment(window) = self.mode {
            args.push("-ss".into());
            args.push(window.start.to_string().into());
        }

        args.push("-i".into());
        args.push(self.source.as_os_str().to_owned());

        if let EncodeMode::Segment(window) = self.mode {
            args.push("-t".into());
            args.push(window.duration.to_string().into());
            args.push("-vf".into());
            args.push("setpts=PTS-STARTPTS".into());
            args.push("-af".into());
            args.push("asetpts=PTS-STARTPTS".into());
            args.push("-output_ts_offset".into());
            args.push(window.start.to_string().into());
        }

        args.push("-c:v".into());
        args.push(profile.video_codec.as_str().into());
        if !profile.preset.is_empty() {
            args.push("-preset".into());
            args.push(profile.preset.as_str().into());
        }
        if !profile.rate_control.is_empty() {
            args.push("-rc".into());
            args.push(profile.rate_control.as_str().into());
        }
        args.push("-cq".into());
        args.push(profile.quality.to_string().into());
        args.push("-c:a".into());
        args.push(profile.audio_codec.as_str().into());

        if self.container == OutputContainer::Mp4 {
            args.push("-movflags".into());
            args.push("frag_keyframe+empty_moov".into());
        }

        args.push("-f".into());
        args.push(self.container.format_name().into());
        args.push("-".into());

        args
    }
}
