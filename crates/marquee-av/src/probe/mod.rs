//! Media probing.
//!
//! Duration probes run the external tool asynchronously under a deadline, so a
//! hung prober fails the request instead of holding it open.

mod ffprobe;

pub use ffprobe::{
    parse_duration_output, probe_video, FfprobeDuration, VideoInfo, DEFAULT_PROBE_TIMEOUT,
};

use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Obtains the total duration of a media file.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Duration of `path` in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;
}
