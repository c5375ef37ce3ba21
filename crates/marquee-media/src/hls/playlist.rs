//! HLS media playlist structures.

use super::segments::plan_segments;
use marquee_common::Result;
use std::fmt::Write;

/// How `#EXTINF` durations are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtinfMode {
    /// Every entry advertises the nominal segment length, including the last.
    #[default]
    Fixed,
    /// The last entry advertises the remaining duration of the movie.
    Exact,
}

impl ExtinfMode {
    /// Pick the mode from the `exact_final_segment` setting.
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            Self::Exact
        } else {
            Self::Fixed
        }
    }
}

/// Media playlist for one movie.
#[derive(Debug, Clone)]
pub struct MediaPlaylist {
    /// Target duration in seconds.
    pub target_duration: u32,
    /// Media sequence number.
    pub media_sequence: u32,
    /// Segment entries.
    pub segments: Vec<SegmentEntry>,
}

impl MediaPlaylist {
    /// Build the VOD playlist for a movie of `total_duration` seconds.
    ///
    /// Segment URIs are `{base_uri}/segment-{i}.ts`. `base_uri` may be absolute
    /// or host-relative and must not end with a slash.
    pub fn for_duration(
        total_duration: f64,
        segment_duration: f64,
        base_uri: &str,
        mode: ExtinfMode,
    ) -> Result<Self> {
        let segments = plan_segments(total_duration, segment_duration)?
            .into_iter()
            .map(|seg| SegmentEntry {
                duration: match mode {
                    ExtinfMode::Fixed => segment_duration,
                    ExtinfMode::Exact => seg.duration,
                },
                uri: format!("{}/segment-{}.ts", base_uri, seg.index),
            })
            .collect();

        Ok(Self {
            target_duration: segment_duration.ceil() as u32,
            media_sequence: 0,
            segments,
        })
    }

    /// Total advertised duration.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Render to M3U8 string.
    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "#EXTM3U").unwrap();
        writeln!(out, "#EXT-X-VERSION:3").unwrap();
        writeln!(out, "#EXT-X-TARGETDURATION:{}", self.target_duration).unwrap();
        writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence).unwrap();

        for segment in &self.segments {
            writeln!(out, "#EXTINF:{:.6},", segment.duration).unwrap();
            writeln!(out, "{}", segment.uri).unwrap();
        }

        writeln!(out, "#EXT-X-ENDLIST").unwrap();

        out
    }
}

/// Segment entry in a media playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEntry {
    /// Advertised duration in seconds.
    pub duration: f64,
    /// Segment URI.
    pub uri: String,
}
