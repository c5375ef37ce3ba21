//! Direct streaming with HTTP range requests.
//!
//! Serves the original movie file unmodified, honoring single byte ranges.

use super::parse_movie_id;
use crate::server::{AppContext, AppError};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use marquee_common::{paths::content_type_for, Error};
use std::io::SeekFrom;
use std::path::Path as FsPath;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

const READ_CHUNK: usize = 64 * 1024;

/// A single range from a `Range: bytes=...` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=a-`
    From(u64),
    /// `bytes=a-b`, both inclusive.
    FromTo(u64, u64),
    /// `bytes=-n`, the last `n` bytes.
    Suffix(u64),
}

impl ByteRange {
    /// Inclusive `(start, end)` within a file of `size` bytes, or `None` if the
    /// range cannot be satisfied.
    pub fn resolve(self, size: u64) -> Option<(u64, u64)> {
        if size == 0 {
            return None;
        }
        let last = size - 1;

        match self {
            ByteRange::From(start) if start <= last => Some((start, last)),
            ByteRange::FromTo(start, end) if start <= end && start <= last => {
                Some((start, end.min(last)))
            }
            ByteRange::Suffix(len) if len > 0 => Some((size.saturating_sub(len), last)),
            _ => None,
        }
    }
}

/// Parse a `Range` header value.
///
/// Supports formats:
/// - bytes=0-499
/// - bytes=500-
/// - bytes=-500 (last 500 bytes)
///
/// Multi-range requests and other units are not supported and yield `None`.
pub fn parse_range_header(value: &str) -> Option<ByteRange> {
    let ranges = value.trim().strip_prefix("bytes=")?;
    if ranges.contains(',') {
        return None;
    }

    let (start, end) = ranges.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, false) => end.parse().ok().map(ByteRange::Suffix),
        (false, true) => start.parse().ok().map(ByteRange::From),
        (false, false) => Some(ByteRange::FromTo(start.parse().ok()?, end.parse().ok()?)),
        (true, true) => None,
    }
}

/// `GET /movie/stream-full/{id}`
pub async fn stream_passthrough(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = parse_movie_id(&id)?;
    let source = ctx.resolve_movie(id).await?;

    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_range_header);

    debug!(movie_id = %id, ?range, "Passthrough request");
    serve_file(&source, range).await
}

/// Serve `path` as an attachment, honoring an optional byte range.
pub async fn serve_file(path: &FsPath, range: Option<ByteRange>) -> Result<Response, AppError> {
    let mut file = File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::not_found("movie file", path.display()),
        _ => Error::from(e),
    })?;
    let size = file.metadata().await.map_err(Error::from)?.len();

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(path))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment_name(path)),
        );

    let response = match range {
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, size.to_string())
            .body(Body::from_stream(ReaderStream::with_capacity(file, READ_CHUNK))),
        Some(range) => {
            let (start, end) = range
                .resolve(size)
                .ok_or(Error::RangeNotSatisfiable { size })?;
            let length = end - start + 1;

            file.seek(SeekFrom::Start(start))
                .await
                .map_err(Error::from)?;

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_LENGTH, length.to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{size}"),
                )
                .body(Body::from_stream(ReaderStream::with_capacity(
                    file.take(length),
                    READ_CHUNK,
                )))
        }
    };

    response.map_err(|e| Error::internal(e.to_string()).into())
}

/// File name safe to embed in a quoted `Content-Disposition` parameter.
fn attachment_name(path: &FsPath) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
