//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which lays out a library in a temporary directory
//! (movies, path registry, artwork), installs fake `ffmpeg`/`ffprobe` shell
//! scripts, and builds an [`AppContext`] over it.

#![allow(dead_code)]

use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use marquee::config::Config;
use marquee::library::PathRegistry;
use marquee::server::{create_router, AppContext};
use marquee_common::MovieId;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

/// ffprobe that reports a 20 second file.
pub const PROBE_20_SECS: &str = "echo 20.000000";

/// ffmpeg that writes a small fixed payload.
pub const FFMPEG_PAYLOAD: &str = "printf 'FAKE-MEDIA-BYTES'";

pub struct TestHarness {
    pub dir: TempDir,
    pub ctx: AppContext,
}

impl TestHarness {
    /// Harness whose tools run the given shell snippets. `{dir}` in a snippet
    /// is replaced with the harness directory.
    pub fn new(ffmpeg: &str, ffprobe: &str) -> Self {
        Self::with_config(ffmpeg, ffprobe, |_| {})
    }

    /// Like [`TestHarness::new`], with a chance to adjust the config.
    pub fn with_config(ffmpeg: &str, ffprobe: &str, customize: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();

        let mut config = Config::default();
        config.library.data_dir = dir.path().join("data");
        config.library.movie_dir = dir.path().join("movies");
        let root = dir.path().display().to_string();
        config.tools.ffmpeg_path = Some(write_script(
            &bin.join("ffmpeg"),
            &ffmpeg.replace("{dir}", &root),
        ));
        config.tools.ffprobe_path = Some(write_script(
            &bin.join("ffprobe"),
            &ffprobe.replace("{dir}", &root),
        ));
        config.streaming.stall_timeout_secs = 5;
        customize(&mut config);

        fs::create_dir_all(&config.library.data_dir).unwrap();
        fs::create_dir_all(&config.library.movie_dir).unwrap();
        fs::create_dir_all(config.library.poster_dir()).unwrap();
        fs::create_dir_all(config.library.backdrop_dir()).unwrap();

        let ctx = AppContext::from_config(config);
        Self { dir, ctx }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Create a movie file and register it under `id`.
    pub fn add_movie(&self, id: u64, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.ctx.config.library.movie_dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();

        let registry_path = self.ctx.config.library.registry_path();
        let mut entries: Vec<(MovieId, PathBuf)> = match fs::read_to_string(&registry_path) {
            Ok(text) => PathRegistry::from_json(&text)
                .unwrap()
                .iter()
                .map(|(id, p)| (id, p.to_path_buf()))
                .collect(),
            Err(_) => Vec::new(),
        };
        entries.push((MovieId::new(id).unwrap(), path.clone()));

        let registry = PathRegistry::from_entries(entries);
        fs::write(&registry_path, registry.to_json_pretty().unwrap()).unwrap();
        path
    }

    /// Path inside the harness directory, for marker files written by fake tools.
    pub fn marker(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn get_with_range(&self, uri: &str, range: &str) -> axum::response::Response {
        self.router()
            .oneshot(
                Request::get(uri)
                    .header("range", range)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Write an executable `sh` script with `body` as its only command.
pub fn write_script(path: &Path, body: &str) -> PathBuf {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
    path.to_path_buf()
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}
