//! On-demand transcoding.
//!
//! An [`Encoder`] turns an [`EncodeRequest`] into a running [`EncodeProcess`]
//! whose stdout is the encoded stream.

mod encoder;
mod process;
mod request;

pub use encoder::Encoder;
pub use process::{EncodeProcess, EncodeState, DIAGNOSTIC_LIMIT};
pub use request::{EncodeMode, EncodeProfile, EncodeRequest, OutputContainer, SegmentWindow};
