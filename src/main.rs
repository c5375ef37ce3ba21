mod cli;

use marquee::{config, scanner::LibraryScanner, server};
use marquee_av::{check_tools, probe_video, resolve_tool, DurationProbe, FfprobeDuration};
use marquee_common::Quality;
use marquee_media::hls::{ExtinfMode, MediaPlaylist};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting marquee");
    tracing::info!(
        "Serving {:?} (registry {:?})",
        config.library.movie_dir,
        config.library.registry_path()
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "marquee=trace,marquee_av=trace,marquee_media=debug,tower_http=debug".to_string()
        } else {
            "marquee=debug,marquee_av=debug,marquee_media=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Scan { dry_run } => scan_library(cli.config.as_deref(), dry_run),
        Commands::Probe { file, json } => probe_file(&file, cli.config.as_deref(), json),
        Commands::Playlist { file, base } => print_playlist(&file, &base, cli.config.as_deref()),
        Commands::CheckTools => check_external_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("marquee {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn scan_library(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());

    let scanner = LibraryScanner::new(config.library.clone(), ffprobe);
    let summary = scanner.scan(dry_run)?;

    if dry_run {
        println!("[DRY RUN] Nothing was written\n");
    }
    println!("Video files: {}", summary.registry.len());
    println!("Catalogued:  {}", summary.records.len());
    for record in &summary.records {
        let quality = record.quality.unwrap_or(Quality::Unknown);
        println!("  [{}] {} ({}) {}", record.id, record.title, record.year, quality);
    }

    if !summary.skipped.is_empty() {
        println!("\nSkipped (folder is not \"Title (Year)\"): {}", summary.skipped.len());
        for path in &summary.skipped {
            println!("  {}", path.display());
        }
    }

    for (kind, report) in [("Posters", &summary.posters), ("Backdrops", &summary.backdrops)] {
        println!(
            "\n{kind}: {} renamed, {} unchanged, {} unmatched",
            report.renamed,
            report.unchanged,
            report.unmatched.len()
        );
        for name in &report.unmatched {
            println!("  unmatched: {name}");
        }
        for name in &report.displaced {
            println!("  moved aside: {name}.stale");
        }
    }

    if !summary.missing_posters.is_empty() {
        println!("\nMovies without a poster: {}", summary.missing_posters.len());
    }

    Ok(())
}

fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());
    let info = probe_video(&ffprobe, file).with_context(|| format!("Failed to probe {:?}", file))?;
    let quality = info.height.map(Quality::from_height).unwrap_or(Quality::Unknown);

    if json {
        let value = serde_json::json!({
            "file": file,
            "duration": info.duration,
            "width": info.width,
            "height": info.height,
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("File: {}", file.display());
        match info.duration {
            Some(duration) => {
                let secs = duration as u64;
                let mins = secs / 60;
                let hours = mins / 60;
                println!(
                    "Duration: {:02}:{:02}:{:02} ({duration:.3}s)",
                    hours,
                    mins % 60,
                    secs % 60
                );
            }
            None => println!("Duration: unknown"),
        }
        if let (Some(width), Some(height)) = (info.width, info.height) {
            println!("Video: {}x{}", width, height);
        }
        println!("Quality: {}", quality);
    }

    Ok(())
}

fn print_playlist(file: &Path, base: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let prober = FfprobeDuration::new(resolve_tool(
        "ffprobe",
        config.tools.ffprobe_path.as_deref(),
    ))
    .with_timeout(config.streaming.stall_timeout());

    let rt = tokio::runtime::Runtime::new()?;
    let duration = rt
        .block_on(prober.probe_duration(file))
        .with_context(|| format!("Failed to probe duration of {:?}", file))?;
    let playlist = MediaPlaylist::for_duration(
        duration,
        config.streaming.segment_duration_secs,
        base.trim_end_matches('/'),
        ExtinfMode::from_exact(config.streaming.exact_final_segment),
    )?;

    print!("{}", playlist.render());
    Ok(())
}

fn check_external_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let tools = check_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        println!(" - {}", tool.path.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Streaming requests will fail until they are installed.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using default lookup");
            let config = config::load_config_or_default(None)?;
            config::validate_config(&config)?;
            config
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Movie dir: {:?}", config.library.movie_dir);
    println!("  Registry: {:?}", config.library.registry_path());
    println!("  Catalog: {:?}", config.library.catalog_path());
    println!(
        "  Segments: {}s, exact final EXTINF: {}",
        config.streaming.segment_duration_secs, config.streaming.exact_final_segment
    );
    println!(
        "  Encoder: {} / {} (max {} concurrent)",
        config.encoder.video_codec,
        config.encoder.audio_codec,
        config.streaming.max_concurrent_encodes
    );

    Ok(())
}
