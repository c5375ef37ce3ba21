//! HLS playlist and the per-movie file dispatcher.
//!
//! Playlists are computed from the probed duration on every request; nothing
//! is cached between requests.

use super::{parse_movie_id, segment::stream_segment};
use crate::server::{AppContext, AppError};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use marquee_common::{Error, MovieId};
use marquee_media::hls::{ExtinfMode, MediaPlaylist};
use tracing::info;

/// A file name under `/movie/stream/{id}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFile {
    Playlist,
    Segment(u32),
}

/// Recognize `playlist.m3u8` and `segment-{n}.ts`.
pub fn parse_stream_file(name: &str) -> Option<StreamFile> {
    if name == "playlist.m3u8" {
        return Some(StreamFile::Playlist);
    }

    let index = name.strip_prefix("segment-")?.strip_suffix(".ts")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    index.parse().ok().map(StreamFile::Segment)
}

/// URI prefix for the segments of a movie.
pub fn playlist_base_url(public_base_url: Option<&str>, id: MovieId) -> String {
    let origin = public_base_url.unwrap_or("").trim_end_matches('/');
    format!("{origin}/movie/stream/{id}")
}

/// `GET /movie/stream/{id}/{file}`
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path((id, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let id = parse_movie_id(&id)?;

    match parse_stream_file(&file) {
        Some(StreamFile::Playlist) => media_playlist(&ctx, id).await,
        Some(StreamFile::Segment(index)) => stream_segment(&ctx, id, index).await,
        None => Err(Error::not_found("stream file", file).into()),
    }
}

async fn media_playlist(ctx: &AppContext, id: MovieId) -> Result<Response, AppError> {
    let source = ctx.resolve_movie(id).await?;
    let streaming = &ctx.config.streaming;

    let duration = ctx
        .prober
        .probe_duration(&source)
        .await
        .map_err(|e| Error::DurationUnavailable(e.to_string()))?;

    let base = playlist_base_url(ctx.config.server.public_base_url.as_deref(), id);
    let playlist = MediaPlaylist::for_duration(
        duration,
        streaming.segment_duration_secs,
        &base,
        ExtinfMode::from_exact(streaming.exact_final_segment),
    )
    .map_err(|_| {
        Error::DurationUnavailable(format!(
            "{} reported an unusable duration: {duration}",
            ctx.prober.name()
        ))
    })?;

    info!(
        movie_id = %id,
        duration,
        segments = playlist.segments.len(),
        "Generated playlist"
    );

    Ok((
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        playlist.render(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_file() {
        assert_eq!(parse_stream_file("playlist.m3u8"), Some(StreamFile::Playlist));
        assert_eq!(parse_stream_file("segment-0.ts"), Some(StreamFile::Segment(0)));
        assert_eq!(parse_stream_file("segment-675.ts"), Some(StreamFile::Segment(675)));
    }

    #[test]
    fn test_parse_stream_file_rejects_others() {
        for name in [
            "master.m3u8",
            "segment-.ts",
            "segment-+1.ts",
            "segment--1.ts",
            "segment-1.m4s",
            "segment-1",
            "segment-99999999999.ts",
            "init.mp4",
        ] {
            assert_eq!(parse_stream_file(name), None, "{name}");
        }
    }

    #[test]
    fn test_playlist_base_url() {
        let id = MovieId::new(7).unwrap();
        assert_eq!(playlist_base_url(None, id), "/movie/stream/7");
        assert_eq!(
            playlist_base_url(Some("http://media.local:8000"), id),
            "http://media.local:8000/movie/stream/7"
        );
        assert_eq!(
            playlist_base_url(Some("https://media.example/"), id),
            "https://media.example/movie/stream/7"
        );
    }
}
