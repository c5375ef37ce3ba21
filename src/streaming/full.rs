//! Whole-movie progressive transcode.
//!
//! The first chunk is read before the response is committed, so an encoder
//! that dies on startup becomes a 500 with its diagnostic rather than an empty
//! 200.

use super::{encoder_body, parse_movie_id};
use crate::server::{AppContext, AppError};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use marquee_av::EncodeRequest;
use tracing::info;

/// Stream the whole movie as fragmented MP4.
pub async fn stream_full(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_movie_id(&id)?;
    let source = ctx.resolve_movie(id).await?;
    let chunk_size = ctx.config.streaming.full_chunk_size;

    let request = EncodeRequest::full(&source);
    let mut process = ctx.encoder.start(&request, format!("movie {id} full")).await?;
    let first = process.peek_first(chunk_size).await?;

    info!(movie_id = %id, source = %source.display(), "Streaming full transcode");

    Ok((
        [
            (header::CONTENT_TYPE, request.container.content_type()),
            (header::ACCEPT_RANGES, "bytes"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        encoder_body(process, Some(first), chunk_size),
    )
        .into_response())
}
