//! Marquee-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across marquee:
//!
//! - **Typed IDs**: [`MovieId`], the positive integer assigned to a movie at scan time
//! - **Core Types**: [`Quality`] labels derived from a video's resolution
//! - **Path Utilities**: Functions to detect video files by extension
//! - **Error Handling**: The unified [`Error`] type and its HTTP status mapping
//!
//! # Examples
//!
//! ```
//! use marquee_common::{MovieId, Quality, Error, Result};
//! use marquee_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let id: MovieId = "42".parse()?;
//! assert_eq!(id.get(), 42);
//!
//! assert_eq!(Quality::from_height(1080), Quality::Hd);
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn lookup(id: MovieId) -> Result<()> {
//!     Err(Error::not_found("movie", id))
//! }
//! assert_eq!(lookup(id).unwrap_err().http_status(), 404);
//! # Ok::<(), marquee_common::Error>(())
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
