//! # marquee-av
//!
//! External media tool plumbing for marquee.
//!
//! This crate provides:
//! - Duration probing through ffprobe, behind the [`DurationProbe`] trait
//! - Video dimension probing for the library scanner
//! - Managed ffmpeg encoder processes ([`Encoder`], [`EncodeProcess`]) with a
//!   concurrency cap, a stall timeout, and bounded diagnostics capture
//! - Tool availability checks
//!
//! ## Example
//!
//! ```no_run
//! use marquee_av::{DurationProbe, FfprobeDuration};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn run() -> marquee_av::Result<()> {
//! let probe = FfprobeDuration::new("ffprobe").with_timeout(Duration::from_secs(10));
//! let secs = probe
//!     .probe_duration(Path::new("/media/movies/Alien (1979)/alien.mkv"))
//!     .await?;
//! println!("{secs:.3}s");
//! # Ok(())
//! # }
//! ```

pub mod encode;
pub mod probe;
pub mod tools;

pub use encode::{
    EncodeMode, EncodeProcess, EncodeProfile, EncodeRequest, EncodeState, Encoder,
    OutputContainer, SegmentWindow,
};
pub use marquee_common::{Error, Result};
pub use probe::{probe_video, DurationProbe, FfprobeDuration, VideoInfo};
pub use tools::{check_tool, check_tools, resolve_tool, ToolInfo};
