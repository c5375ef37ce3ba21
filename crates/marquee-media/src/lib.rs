//! Marquee-Media: HLS presentation planning.
//!
//! Movies are never pre-segmented. Every playlist request computes the segment
//! layout from the probed duration alone, and every segment request re-encodes
//! its time window on the fly. This crate holds the pure part of that: the
//! segment arithmetic and the M3U8 rendering.
//!
//! # Modules
//!
//! - `hls` - Segment descriptors and media playlist generation
//!
//! # Example
//!
//! ```
//! use marquee_media::hls::{ExtinfMode, MediaPlaylist};
//!
//! let playlist = MediaPlaylist::for_duration(20.0, 8.0, "/movie/stream/1", ExtinfMode::Fixed)?;
//! let m3u8 = playlist.render();
//! assert_eq!(m3u8.matches("#EXTINF:8.000000,").count(), 3);
//! assert!(m3u8.ends_with("#EXT-X-ENDLIST\n"));
//! # Ok::<(), marquee_common::Error>(())
//! ```

pub mod hls;

pub use hls::{ExtinfMode, MediaPlaylist, SegmentDescriptor};
pub use marquee_common::{Error, Result};
