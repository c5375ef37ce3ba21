//! The id to path registry (`path.json`).
//!
//! The file is a JSON object whose keys are decimal movie ids and whose values
//! are absolute paths. It is written by the scanner and read fresh on every
//! streaming request.

use marquee_common::{Error, MovieId, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Read-only mapping from movie id to source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathRegistry {
    entries: BTreeMap<MovieId, PathBuf>,
}

impl PathRegistry {
    /// Build a registry from scanner output.
    pub fn from_entries(entries: impl IntoIterator<Item = (MovieId, PathBuf)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Load the registry file.
    ///
    /// A missing file is an empty registry, so every lookup is a 404. A file
    /// that is not a valid registry (bad JSON, bad id, duplicate id) is an error.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Path registry {:?} does not exist; run `marquee scan`", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, id: MovieId) -> Option<&Path> {
        self.entries.get(&id).map(PathBuf::as_path)
    }

    /// Source file for `id`, which must exist right now.
    pub async fn resolve(&self, id: MovieId) -> Result<PathBuf> {
        let path = self.get(id).ok_or_else(|| Error::not_found("movie", id))?;

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(path.to_path_buf()),
            _ => {
                tracing::warn!(movie_id = %id, "Registered file is missing: {:?}", path);
                Err(Error::not_found("movie file", id))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MovieId, &Path)> {
        self.entries.iter().map(|(id, path)| (*id, path.as_path()))
    }
}

impl Serialize for PathRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, path) in &self.entries {
            // Forward slashes on every platform.
            map.serialize_entry(&id.to_string(), &path.to_string_lossy().replace('\\', "/"))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PathRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RegistryVisitor)
    }
}

struct RegistryVisitor;

impl<'de> Visitor<'de> for RegistryVisitor {
    type Value = PathRegistry;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping movie ids to file paths")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = BTreeMap::new();

        while let Some((key, path)) = access.next_entry::<String, PathBuf>()? {
            let id: MovieId = key
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid movie id {key:?}")))?;
            if entries.insert(id, path).is_some() {
                return Err(de::Error::custom(format!("duplicate movie id {id}")));
            }
        }

        Ok(PathRegistry { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn id(n: u64) -> MovieId {
        MovieId::new(n).unwrap()
    }

    #[test]
    fn test_parse_registry() {
        let registry = PathRegistry::from_json(
            r#"{"1": "/media/movies/Alien (1979)/alien.mkv", "2": "/media/movies/Heat (1995)/heat.mp4"}"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(id(1)),
            Some(Path::new("/media/movies/Alien (1979)/alien.mkv"))
        );
        assert_eq!(registry.get(id(3)), None);
    }

    #[test]
    fn test_duplicate_id_is_load_error() {
        let err = PathRegistry::from_json(r#"{"1": "/a.mkv", "1": "/b.mkv"}"#).unwrap_err();
        assert_matches!(err, Error::Json { .. });
        assert!(err.to_string().contains("duplicate movie id 1"));
    }

    #[test]
    fn test_invalid_ids_are_load_errors() {
        assert!(PathRegistry::from_json(r#"{"0": "/a.mkv"}"#).is_err());
        assert!(PathRegistry::from_json(r#"{"abc": "/a.mkv"}"#).is_err());
        assert!(PathRegistry::from_json(r#"["/a.mkv"]"#).is_err());
    }

    #[test]
    fn test_serialize_uses_string_keys() {
        let registry = PathRegistry::from_entries([(id(2), PathBuf::from("/m/b.mkv"))]);
        let json = registry.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"2": "/m/b.mkv"}));
        assert_eq!(PathRegistry::from_json(&json).unwrap(), registry);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_registry() {
        let dir = tempdir().unwrap();
        let registry = PathRegistry::load(&dir.path().join("path.json")).await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_checks_existence() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.mkv");
        std::fs::write(&present, b"data").unwrap();

        let registry = PathRegistry::from_entries([
            (id(1), present.clone()),
            (id(2), dir.path().join("gone.mkv")),
        ]);

        assert_eq!(registry.resolve(id(1)).await.unwrap(), present);
        assert_matches!(registry.resolve(id(2)).await, Err(Error::NotFound { .. }));
        assert_matches!(registry.resolve(id(9999)).await, Err(Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_rejects_directories() {
        let dir = tempdir().unwrap();
        let registry = PathRegistry::from_entries([(id(1), dir.path().to_path_buf())]);
        assert_matches!(registry.resolve(id(1)).await, Err(Error::NotFound { .. }));
    }
}
