//! HLS playlist generation.
//!
//! This module computes segment layouts and renders M3U8 media playlists.

mod playlist;
mod segments;

pub use playlist::{ExtinfMode, MediaPlaylist, SegmentEntry};
pub use segments::{
    plan_segments, segment_count, segment_start, SegmentDescriptor, DEFAULT_SEGMENT_DURATION,
};
