//! On-disk library state: the path registry, the catalog and artwork.
//!
//! Everything here is produced by `marquee scan` and only read by the server.

pub mod catalog;
pub mod registry;

pub use catalog::{load_catalog, MovieRecord};
pub use registry::PathRegistry;

use marquee_common::{Error, MovieId, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Artwork file for a request path segment such as `12.avif`.
pub async fn artwork_path(dir: &Path, kind: &str, file_name: &str) -> Result<PathBuf> {
    let id: MovieId = file_name
        .strip_suffix(".avif")
        .and_then(|stem| stem.parse().ok())
        .ok_or_else(|| Error::not_found(kind, file_name))?;

    let path = dir.join(format!("{id}.avif"));
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(Error::not_found(kind, id)),
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::from(e.error))?;
    Ok(())
}
