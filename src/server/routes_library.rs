//! Catalog and artwork routes.

use super::{AppContext, AppError};
use crate::library::artwork_path;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use marquee_common::Error;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;

pub fn library_routes() -> Router<AppContext> {
    Router::new()
        .route("/data/movies", get(list_movies))
        .route("/static/poster/:file", get(get_poster))
        .route("/static/backdrop/:file", get(get_backdrop))
}

/// The catalog file, as written by the scanner.
async fn list_movies(State(ctx): State<AppContext>) -> Result<Response, AppError> {
    let path = ctx.config.library.catalog_path();
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found("catalog", path.display()).into());
        }
        Err(e) => return Err(Error::from(e).into()),
    };

    let movies: serde_json::Value = serde_json::from_str(&text).map_err(Error::from)?;
    Ok(Json(movies).into_response())
}

async fn get_poster(
    State(ctx): State<AppContext>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    serve_artwork(ctx.config.library.poster_dir(), "poster", &file).await
}

async fn get_backdrop(
    State(ctx): State<AppContext>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    serve_artwork(ctx.config.library.backdrop_dir(), "backdrop", &file).await
}

async fn serve_artwork(dir: PathBuf, kind: &str, file: &str) -> Result<Response, AppError> {
    let path = artwork_path(&dir, kind, file).await?;
    let file = tokio::fs::File::open(&path).await.map_err(Error::from)?;
    let size = file.metadata().await.map_err(Error::from)?.len();

    Ok((
        [
            (header::CONTENT_TYPE, "image/avif".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
