//! The movie catalog (`movie_metadata.json`).

use marquee_common::{MovieId, Quality, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One catalog entry, as served by `/data/movies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: String,
    /// Name of the folder holding the file; stable across rescans.
    pub folder: String,
    pub year: u16,
    pub poster_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
    /// Whole seconds.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub quality: Option<Quality>,
}

impl MovieRecord {
    pub fn poster_url_for(id: MovieId) -> String {
        format!("/static/poster/{id}.avif")
    }

    pub fn backdrop_url_for(id: MovieId) -> String {
        format!("/static/backdrop/{id}.avif")
    }
}

/// Read the catalog file. A missing file is an empty catalog.
pub fn load_catalog(path: &Path) -> Result<Vec<MovieRecord>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Serialize the catalog for writing.
pub fn catalog_json(records: &[MovieRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
