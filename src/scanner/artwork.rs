//! Artwork renumbering after a rescan.
//!
//! Posters and backdrops are named `{id}.avif`. When a rescan assigns new ids,
//! every file whose movie is still in the catalog is renamed to the new id.
//! Files are first moved into a staging directory and then back, so swapped
//! ids never overwrite each other.

use anyhow::{Context, Result};
use marquee_common::MovieId;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const STAGING_DIR: &str = ".renumber-staging";

/// What happened to one artwork directory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArtworkReport {
    /// Files moved (or, in a dry run, that would be moved) to a new id.
    pub renamed: usize,
    /// Files whose id did not change.
    pub unchanged: usize,
    /// Files with no matching movie; left in place.
    pub unmatched: Vec<String>,
    /// Unmatched files that were in the way of a rename, now suffixed `.stale`.
    pub displaced: Vec<String>,
}

/// Rename `{old}.avif` to `{new}.avif` in `dir` for every entry of `renumbering`.
pub fn renumber_artwork(
    dir: &Path,
    renumbering: &HashMap<MovieId, MovieId>,
    dry_run: bool,
) -> Result<ArtworkReport> {
    let mut report = ArtworkReport::default();

    if !dir.is_dir() {
        warn!("Artwork directory does not exist: {:?}", dir);
        return Ok(report);
    }

    let mut moves: Vec<(MovieId, MovieId)> = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(old) = name
            .strip_suffix(".avif")
            .and_then(|stem| stem.parse::<MovieId>().ok())
        else {
            continue;
        };

        match renumbering.get(&old) {
            Some(new) if *new == old => report.unchanged += 1,
            Some(new) => moves.push((old, *new)),
            None => {
                warn!("No movie matches artwork {:?}; leaving it in place", entry.path());
                report.unmatched.push(name);
            }
        }
    }
    moves.sort();
    report.renamed = moves.len();

    if dry_run || moves.is_empty() {
        return Ok(report);
    }

    let staging = dir.join(STAGING_DIR);
    std::fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create staging directory {:?}", staging))?;

    for (old, new) in &moves {
        let from = dir.join(format!("{old}.avif"));
        let to = staging.join(format!("{new}.avif"));
        std::fs::rename(&from, &to)
            .with_context(|| format!("Failed to stage {:?} as {:?}", from, to))?;
        debug!("Staged artwork {} -> {}", old, new);
    }

    for (_, new) in &moves {
        let target = dir.join(format!("{new}.avif"));
        if target.exists() {
            let stale_name = format!("{new}.avif.stale");
            warn!("Moving unmatched {:?} aside as {}", target, stale_name);
            std::fs::rename(&target, dir.join(&stale_name))?;
            report.displaced.push(stale_name);
        }
        std::fs::rename(staging.join(format!("{new}.avif")), &target)
            .with_context(|| format!("Failed to move staged artwork to {:?}", target))?;
    }

    std::fs::remove_dir(&staging)
        .with_context(|| format!("Failed to remove staging directory {:?}", staging))?;

    info!("Renumbered {} artwork files in {:?}", moves.len(), dir);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(n: u64) -> MovieId {
        MovieId::new(n).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn read(dir: &Path, name: &str) -> String {
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn test_swap_does_not_clobber() {
        let dir = tempdir().unwrap();
        write(dir.path(), "1.avif", "alien");
        write(dir.path(), "2.avif", "heat");

        let renumbering = HashMap::from([(id(1), id(2)), (id(2), id(1))]);
        let report = renumber_artwork(dir.path(), &renumbering, false).unwrap();

        assert_eq!(report.renamed, 2);
        assert_eq!(read(dir.path(), "1.avif"), "heat");
        assert_eq!(read(dir.path(), "2.avif"), "alien");
        assert!(!dir.path().join(STAGING_DIR).exists());
    }

    #[test]
    fn test_unmatched_and_unchanged() {
        let dir = tempdir().unwrap();
        write(dir.path(), "3.avif", "kept");
        write(dir.path(), "7.avif", "orphan");
        write(dir.path(), "notes.txt", "ignored");

        let renumbering = HashMap::from([(id(3), id(3))]);
        let report = renumber_artwork(dir.path(), &renumbering, false).unwrap();

        assert_eq!(report.renamed, 0);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.unmatched, vec!["7.avif".to_string()]);
        assert_eq!(read(dir.path(), "7.avif"), "orphan");
    }

    #[test]
    fn test_unmatched_file_in_the_way_is_moved_aside() {
        let dir = tempdir().unwrap();
        write(dir.path(), "1.avif", "alien");
        write(dir.path(), "2.avif", "orphan");

        let renumbering = HashMap::from([(id(1), id(2))]);
        let report = renumber_artwork(dir.path(), &renumbering, false).unwrap();

        assert_eq!(read(dir.path(), "2.avif"), "alien");
        assert_eq!(read(dir.path(), "2.avif.stale"), "orphan");
        assert_eq!(report.displaced, vec!["2.avif.stale".to_string()]);
    }

    #[test]
    fn test_dry_run_moves_nothing() {
        let dir = tempdir().unwrap();
        write(dir.path(), "1.avif", "alien");

        let renumbering = HashMap::from([(id(1), id(5))]);
        let report = renumber_artwork(dir.path(), &renumbering, true).unwrap();

        assert_eq!(report.renamed, 1);
        assert_eq!(read(dir.path(), "1.avif"), "alien");
        assert!(!dir.path().join("5.avif").exists());
    }

    #[test]
    fn test_missing_directory_is_empty_report() {
        let dir = tempdir().unwrap();
        let report = renumber_artwork(&dir.path().join("posters"), &HashMap::new(), false).unwrap();
        assert_eq!(report, ArtworkReport::default());
    }
}
