//! Segment layout arithmetic.
//!
//! A presentation of `total` seconds cut into windows of `len` seconds has
//! `ceil(total / len)` segments. Segment `i` starts at `i * len` and lasts `len`
//! seconds, except the last one which ends exactly at `total`.

use marquee_common::{Error, Result};

/// Segment length used when none is configured, in seconds.
pub const DEFAULT_SEGMENT_DURATION: f64 = 8.0;

/// One time window of an HLS presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDescriptor {
    /// Zero-based position in the playlist.
    pub index: u32,
    /// Offset into the source, in seconds.
    pub start_time: f64,
    /// Length of the window, in seconds.
    pub duration: f64,
}

impl SegmentDescriptor {
    /// End of the window, in seconds.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Start time of segment `index`.
pub fn segment_start(index: u32, segment_duration: f64) -> f64 {
    f64::from(index) * segment_duration
}

/// Number of segments needed to cover `total_duration`.
pub fn segment_count(total_duration: f64, segment_duration: f64) -> Result<u32> {
    validate(total_duration, segment_duration)?;

    let count = (total_duration / segment_duration).ceil();
    if count > f64::from(u32::MAX) {
        return Err(Error::validation(format!(
            "{total_duration}s at {segment_duration}s per segment needs too many segments"
        )));
    }
    Ok(count as u32)
}

/// Compute every segment of a presentation, in order.
pub fn plan_segments(total_duration: f64, segment_duration: f64) -> Result<Vec<SegmentDescriptor>> {
    let count = segment_count(total_duration, segment_duration)?;

    Ok((0..count)
        .map(|index| {
            let start_time = segment_start(index, segment_duration);
            let duration = if index + 1 == count {
                total_duration - start_time
            } else {
                segment_duration
            };
            SegmentDescriptor {
                index,
                start_time,
                duration,
            }
        })
        .collect())
}

fn validate(total_duration: f64, segment_duration: f64) -> Result<()> {
    if !(segment_duration.is_finite() && segment_duration > 0.0) {
        return Err(Error::validation(format!(
            "segment duration must be positive, got {segment_duration}"
        )));
    }
    if !(total_duration.is_finite() && total_duration > 0.0) {
        return Err(Error::validation(format!(
            "total duration must be positive, got {total_duration}"
        )));
    }
    Ok(())
}
