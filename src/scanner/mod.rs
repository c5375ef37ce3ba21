//! Media library scanner.
//!
//! Walks the movie directory, assigns ids, probes every catalogued file, and
//! writes the path registry and the catalog. Artwork named after the previous
//! ids is renumbered to match the new ones.

pub mod artwork;

use crate::config::LibraryConfig;
use crate::library::{catalog, load_catalog, write_atomic, MovieRecord, PathRegistry};
use anyhow::{Context, Result};
use marquee_av::probe_video;
use marquee_common::{paths::is_video_file, MovieId, Quality};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub use artwork::{renumber_artwork, ArtworkReport};

/// Outcome of a scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Every video file found, in id order.
    pub registry: PathRegistry,
    /// Catalog records for files in `Title (Year)` folders.
    pub records: Vec<MovieRecord>,
    /// Video files left out of the catalog.
    pub skipped: Vec<PathBuf>,
    pub posters: ArtworkReport,
    pub backdrops: ArtworkReport,
    /// Catalogued movies with no poster after renumbering.
    pub missing_posters: Vec<MovieId>,
}

/// Scanner for one library.
pub struct LibraryScanner {
    library: LibraryConfig,
    ffprobe: PathBuf,
    folder_pattern: Regex,
}

impl LibraryScanner {
    pub fn new(library: LibraryConfig, ffprobe: PathBuf) -> Self {
        Self {
            library,
            ffprobe,
            folder_pattern: folder_pattern(),
        }
    }

    /// Scan the library. With `dry_run` nothing on disk changes.
    pub fn scan(&self, dry_run: bool) -> Result<ScanSummary> {
        let root = std::fs::canonicalize(&self.library.movie_dir).with_context(|| {
            format!("Movie directory not accessible: {:?}", self.library.movie_dir)
        })?;
        info!("Scanning movie directory: {:?}", root);

        let videos = discover_videos(&root);
        info!("Found {} video files", videos.len());

        let catalog_path = self.library.catalog_path();
        let previous = match load_catalog(&catalog_path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring unreadable catalog {:?}: {}", catalog_path, e);
                Vec::new()
            }
        };

        let mut summary = ScanSummary::default();
        let mut entries = Vec::with_capacity(videos.len());

        for (index, path) in videos.into_iter().enumerate() {
            let id = MovieId::new(index as u64 + 1).context("movie id overflow")?;
            entries.push((id, path.clone()));

            match self.catalog_record(id, &path, &previous) {
                Some(record) => summary.records.push(record),
                None => {
                    warn!("Skipping {:?}: folder name is not \"Title (Year)\"", path);
                    summary.skipped.push(path);
                }
            }
        }
        summary.registry = PathRegistry::from_entries(entries);

        let renumbering = id_changes(&previous, &summary.records);
        summary.posters = renumber_artwork(&self.library.poster_dir(), &renumbering, dry_run)?;
        summary.backdrops = renumber_artwork(&self.library.backdrop_dir(), &renumbering, dry_run)?;

        let poster_dir = self.library.poster_dir();
        for record in &summary.records {
            // A dry run moved nothing, so look where the poster currently lives.
            let owner = if dry_run {
                artwork_owner(record.id, &renumbering)
            } else {
                Some(record.id)
            };
            let has_poster = owner
                .map(|id| poster_dir.join(format!("{id}.avif")).is_file())
                .unwrap_or(false);
            if !has_poster {
                info!(movie_id = %record.id, "No poster for {}", record.folder);
                summary.missing_posters.push(record.id);
            }
        }

        if dry_run {
            info!("Dry run: registry and catalog not written");
            return Ok(summary);
        }

        let registry_path = self.library.registry_path();
        write_atomic(&registry_path, summary.registry.to_json_pretty()?.as_bytes())
            .with_context(|| format!("Failed to write path registry {:?}", registry_path))?;
        write_atomic(&catalog_path, catalog::catalog_json(&summary.records)?.as_bytes())
            .with_context(|| format!("Failed to write catalog {:?}", catalog_path))?;

        info!(
            "Wrote {} registry entries and {} catalog records",
            summary.registry.len(),
            summary.records.len()
        );
        Ok(summary)
    }

    fn catalog_record(&self, id: MovieId, path: &Path, previous: &[MovieRecord]) -> Option<MovieRecord> {
        let folder = path.parent()?.file_name()?.to_string_lossy().into_owned();
        let caps = self.folder_pattern.captures(&folder)?;
        let year: u16 = caps["year"].parse().ok()?;

        // Titles edited by hand in the previous catalog survive a rescan.
        let title = previous
            .iter()
            .find(|r| r.folder == folder)
            .map(|r| r.title.clone())
            .unwrap_or_else(|| caps["title"].trim().to_string());

        let (duration, quality) = match probe_video(&self.ffprobe, path) {
            Ok(info) => (
                info.duration.map(|d| d as u64),
                Some(info.height.map(Quality::from_height).unwrap_or(Quality::Unknown)),
            ),
            Err(e) => {
                warn!(movie_id = %id, "Could not probe {:?}: {}", path, e);
                (None, Some(Quality::Unknown))
            }
        };
        debug!(movie_id = %id, %title, year, ?duration, ?quality, "Catalogued");

        Some(MovieRecord {
            id,
            title,
            folder,
            year,
            poster_url: MovieRecord::poster_url_for(id),
            backdrop_url: Some(MovieRecord::backdrop_url_for(id)),
            duration,
            quality,
        })
    }
}

/// `Title (Year)`, with anything after the closing parenthesis ignored.
fn folder_pattern() -> Regex {
    Regex::new(r"^(?P<title>.+?)\s*\((?P<year>\d{4})\)").expect("static regex")
}

/// Video files under `root`, sorted by path.
pub fn discover_videos(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_video_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Old id to new id for every folder present in both catalogs.
fn id_changes(previous: &[MovieRecord], current: &[MovieRecord]) -> HashMap<MovieId, MovieId> {
    let mut new_by_folder: HashMap<&str, MovieId> = HashMap::new();
    for record in current {
        new_by_folder.entry(record.folder.as_str()).or_insert(record.id);
    }

    previous
        .iter()
        .filter_map(|old| {
            new_by_folder
                .get(old.folder.as_str())
                .map(|new| (old.id, *new))
        })
        .collect()
}

/// Id whose artwork file becomes `id`'s after renumbering, if any.
fn artwork_owner(id: MovieId, renumbering: &HashMap<MovieId, MovieId>) -> Option<MovieId> {
    if let Some((old, _)) = renumbering.iter().find(|(_, new)| **new == id) {
        return Some(*old);
    }
    if renumbering.contains_key(&id) {
        None
    } else {
        Some(id)
    }
}
