//! Movie streaming.
//!
//! Nothing is transcoded ahead of time. Every request that needs encoded
//! output starts its own encoder process and streams its stdout.
//!
//! # Routes
//!
//! - `GET /movie/stream/{id}` - Whole movie as progressive fragmented MP4
//! - `GET /movie/stream/{id}/playlist.m3u8` - HLS media playlist
//! - `GET /movie/stream/{id}/segment-{n}.ts` - One HLS segment, encoded on demand
//! - `GET /movie/stream-full/{id}` - Original file with range support

mod direct;
mod full;
mod hls;
mod segment;

pub use direct::{parse_range_header, serve_file, stream_passthrough, ByteRange};
pub use full::stream_full;
pub use hls::{parse_stream_file, playlist_base_url, stream_file, StreamFile};
pub use segment::stream_segment;

use axum::{body::Body, routing::get, Router};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use marquee_av::EncodeProcess;
use marquee_common::{MovieId, Result};
use tracing::{debug, trace, warn};

use crate::server::AppContext;

/// Create the streaming router.
pub fn stream_router() -> Router<AppContext> {
    Router::new()
        .route("/movie/stream/:id", get(stream_full))
        .route("/movie/stream/:id/:file", get(stream_file))
        .route("/movie/stream-full/:id", get(stream_passthrough))
}

fn parse_movie_id(raw: &str) -> Result<MovieId> {
    raw.parse()
}

/// Response body fed by an encoder's stdout.
///
/// `first` is sent before anything else is read. The process lives inside the
/// stream, so dropping the body (client gone) kills the encoder.
fn encoder_body(process: EncodeProcess, first: Option<Bytes>, chunk_size: usize) -> Body {
    let head = stream::iter(first.map(Ok::<_, std::io::Error>));

    let rest = stream::unfold(Some(process), move |state| async move {
        let mut process = state?;
        match process.next_chunk(chunk_size).await {
            Ok(Some(chunk)) => Some((Ok::<_, std::io::Error>(chunk), Some(process))),
            Ok(None) => {
                let diagnostics = process.drain_diagnostics().await;
                debug!(
                    job = %process.label(),
                    state = ?process.state(),
                    bytes = process.bytes_read(),
                    "Encoder output closed"
                );
                trace!(job = %process.label(), %diagnostics, "Encoder diagnostics");
                None
            }
            Err(e) => {
                warn!(
                    job = %process.label(),
                    bytes = process.bytes_read(),
                    error = %e,
                    "Encoder stream ended early"
                );
                None
            }
        }
    });

    Body::from_stream(head.chain(rest))
}
