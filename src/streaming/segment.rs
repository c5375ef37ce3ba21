//! On-demand HLS segments.

use super::encoder_body;
use crate::server::{AppContext, AppError};
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use marquee_av::EncodeRequest;
use marquee_common::MovieId;
use marquee_media::hls::segment_start;
use tracing::info;

/// Encode and stream segment `index` of a movie.
///
/// The response is committed as soon as the encoder is running; a failure
/// after that shows up as a short body and a log line.
pub async fn stream_segment(
    ctx: &AppContext,
    id: MovieId,
    index: u32,
) -> Result<Response, AppError> {
    let source = ctx.resolve_movie(id).await?;
    let streaming = &ctx.config.streaming;

    let start = segment_start(index, streaming.segment_duration_secs);
    let request = EncodeRequest::segment(&source, start, streaming.segment_duration_secs);
    let process = ctx
        .encoder
        .start(&request, format!("movie {id} segment {index}"))
        .await?;

    info!(movie_id = %id, segment = index, start, "Streaming segment");

    Ok((
        [(header::CONTENT_TYPE, request.container.content_type())],
        encoder_body(process, None, streaming.segment_chunk_size),
    )
        .into_response())
}
