use marquee_av::EncodeProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub encoder: EncodeProfile,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Scheme and authority prepended to playlist segment URIs,
    /// e.g. `http://media.local:8000`. Host-relative URIs when unset.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Holds the path registry, the catalog, and by default the artwork.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root scanned by `marquee scan`.
    #[serde(default = "default_movie_dir")]
    pub movie_dir: PathBuf,

    #[serde(default)]
    pub poster_dir: Option<PathBuf>,

    #[serde(default)]
    pub backdrop_dir: Option<PathBuf>,

    /// File name of the id to path registry, relative to `data_dir`.
    #[serde(default = "default_registry_file")]
    pub registry_file: String,

    /// File name of the movie catalog, relative to `data_dir`.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_movie_dir() -> PathBuf {
    PathBuf::from("./movies")
}
fn default_registry_file() -> String {
    "path.json".to_string()
}
fn default_catalog_file() -> String {
    "movie_metadata.json".to_string()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            movie_dir: default_movie_dir(),
            poster_dir: None,
            backdrop_dir: None,
            registry_file: default_registry_file(),
            catalog_file: default_catalog_file(),
        }
    }
}

impl LibraryConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(&self.registry_file)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn poster_dir(&self) -> PathBuf {
        self.poster_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("posters"))
    }

    pub fn backdrop_dir(&self) -> PathBuf {
        self.backdrop_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("backdrops"))
    }
}

/// Explicit tool locations. `PATH` is searched for anything unset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Length of one HLS segment in seconds.
    #[serde(default = "default_segment_duration")]
    pub segment_duration_secs: f64,

    /// Advertise the true length of the final segment instead of the nominal one.
    #[serde(default)]
    pub exact_final_segment: bool,

    /// Read size for full transcodes, including the pre-commit peek.
    #[serde(default = "default_full_chunk_size")]
    pub full_chunk_size: usize,

    #[serde(default = "default_segment_chunk_size")]
    pub segment_chunk_size: usize,

    #[serde(default = "default_max_concurrent_encodes")]
    pub max_concurrent_encodes: usize,

    /// How long a read may wait for encoder output before the encode is canceled.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,
}

fn default_segment_duration() -> f64 {
    marquee_media::hls::DEFAULT_SEGMENT_DURATION
}
fn default_full_chunk_size() -> usize {
    4096
}
fn default_segment_chunk_size() -> usize {
    65536
}
fn default_max_concurrent_encodes() -> usize {
    8
}
fn default_stall_timeout() -> u64 {
    30
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            segment_duration_secs: default_segment_duration(),
            exact_final_segment: false,
            full_chunk_size: default_full_chunk_size(),
            segment_chunk_size: default_segment_chunk_size(),
            max_concurrent_encodes: default_max_concurrent_encodes(),
            stall_timeout_secs: default_stall_timeout(),
        }
    }
}

impl StreamingConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }
}
