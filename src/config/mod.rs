mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./marquee.toml",
        "./config.toml",
        "~/.config/marquee/config.toml",
        "/etc/marquee/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if let Some(base) = &config.server.public_base_url {
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("public_base_url must start with http:// or https://: {base}");
        }
    }

    let streaming = &config.streaming;
    if !(streaming.segment_duration_secs.is_finite() && streaming.segment_duration_secs > 0.0) {
        anyhow::bail!(
            "segment_duration_secs must be positive, got {}",
            streaming.segment_duration_secs
        );
    }
    if streaming.full_chunk_size == 0 || streaming.segment_chunk_size == 0 {
        anyhow::bail!("Chunk sizes must be greater than 0");
    }
    if streaming.max_concurrent_encodes == 0 {
        anyhow::bail!("max_concurrent_encodes must be at least 1");
    }
    if streaming.stall_timeout_secs == 0 {
        anyhow::bail!("stall_timeout_secs must be at least 1");
    }

    if config.encoder.video_codec.is_empty() || config.encoder.audio_codec.is_empty() {
        anyhow::bail!("Encoder video_codec and audio_codec cannot be empty");
    }

    let library = &config.library;
    for (name, dir) in [
        ("data_dir", library.data_dir.clone()),
        ("movie_dir", library.movie_dir.clone()),
        ("poster_dir", library.poster_dir()),
        ("backdrop_dir", library.backdrop_dir()),
    ] {
        if !dir.exists() {
            tracing::warn!("Library {} does not exist: {:?}", name, dir);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.public_base_url.is_none());
        assert_eq!(config.streaming.segment_duration_secs, 8.0);
        assert!(!config.streaming.exact_final_segment);
        assert_eq!(config.streaming.full_chunk_size, 4096);
        assert_eq!(config.streaming.segment_chunk_size, 65536);
        assert_eq!(config.streaming.max_concurrent_encodes, 8);
        assert_eq!(config.streaming.stall_timeout_secs, 30);
        assert_eq!(config.encoder.video_codec, "h264_nvenc");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_library_paths_derive_from_data_dir() {
        let library = LibraryConfig {
            data_dir: "/srv/marquee".into(),
            ..Default::default()
        };
        assert_eq!(library.registry_path(), Path::new("/srv/marquee/path.json"));
        assert_eq!(
            library.catalog_path(),
            Path::new("/srv/marquee/movie_metadata.json")
        );
        assert_eq!(library.poster_dir(), Path::new("/srv/marquee/posters"));
        assert_eq!(library.backdrop_dir(), Path::new("/srv/marquee/backdrops"));
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"
[server]
port = 9000
public_base_url = "http://media.local:9000"

[library]
data_dir = "/srv/marquee"
poster_dir = "/srv/art/posters"

[streaming]
exact_final_segment = true

[encoder]
hwaccel = ""
video_codec = "libx264"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.server.public_base_url.as_deref(),
            Some("http://media.local:9000")
        );
        assert_eq!(config.library.poster_dir(), Path::new("/srv/art/posters"));
        assert_eq!(config.library.backdrop_dir(), Path::new("/srv/marquee/backdrops"));
        assert!(config.streaming.exact_final_segment);
        assert_eq!(config.streaming.segment_duration_secs, 8.0);
        assert_eq!(config.encoder.hwaccel, "");
        assert_eq!(config.encoder.video_codec, "libx264");
        assert_eq!(config.encoder.preset, "p3");
    }

    #[test]
    fn test_rejects_port_zero() {
        let file = write_config("[server]\nport = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_rejects_bad_streaming_values() {
        for body in [
            "[streaming]\nsegment_duration_secs = 0.0\n",
            "[streaming]\nsegment_duration_secs = -8.0\n",
            "[streaming]\nfull_chunk_size = 0\n",
            "[streaming]\nmax_concurrent_encodes = 0\n",
            "[streaming]\nstall_timeout_secs = 0\n",
        ] {
            let file = write_config(body);
            assert!(load_config(file.path()).is_err(), "accepted: {body}");
        }
    }

    #[test]
    fn test_rejects_relative_public_base_url() {
        let file = write_config("[server]\npublic_base_url = \"media.local\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_parse_error_names_file() {
        let file = write_config("[server\nport = 1");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/marquee.toml"))).is_err());
    }
}
