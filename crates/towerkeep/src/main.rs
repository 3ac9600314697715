//! towerkeep game binary
//!
//! Run with: towerkeep [MAP] [--player-name NAME] [--config PATH]
//! Validate a map without a window: towerkeep MAP --check

mod config;
mod game;

use bevy::asset::{AssetPlugin, UnapprovedPathMode};
use bevy::prelude::*;
use bevy::window::WindowResolution;
use clap::Parser;
use config::GameConfig;
use game::GamePlugin;
use percent_encoding::percent_decode_str;
use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use towerkeep_dialogue::DialoguePlugin;
use towerkeep_runtime::{FsProbe, LoadError, MapWorld, MapWorldPlugin, MapWorldSettings};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Tower defense over Tiled maps
#[derive(Parser, Debug)]
#[command(name = "towerkeep", version, about, long_about = None)]
struct Args {
    /// Map to load (defaults to `[map] start` from the config)
    map: Option<PathBuf>,

    /// URL-escaped player name, as passed by the launcher
    #[arg(long)]
    player_name: Option<String>,

    /// Config file to use instead of the default lookup
    #[arg(long)]
    config: Option<PathBuf>,

    /// Load the map headlessly, print a JSON summary and exit
    #[arg(long)]
    check: bool,
}

/// Decode the launcher's player name, falling back to `default`
fn decode_player_name(raw: Option<&str>, default: &str) -> String {
    let decoded = raw
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().trim().to_string())
        .unwrap_or_default();
    if decoded.is_empty() {
        default.to_string()
    } else {
        decoded
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let loaded = GameConfig::discover(args.config.as_deref());
    let config = loaded.config;
    let problems: Vec<String> = loaded.problems.iter().map(ToString::to_string).collect();
    let source = loaded.source;
    let map = args.map.clone().unwrap_or_else(|| config.map.start.clone());

    if args.check {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
        report_config(source.as_deref(), &problems);
        return run_check(&map, &config);
    }

    let player_name = decode_player_name(args.player_name.as_deref(), &config.player.default_name);
    run_game(map, config, player_name, source, problems);
    ExitCode::SUCCESS
}

fn report_config(source: Option<&Path>, problems: &[String]) {
    for problem in problems {
        warn!("{problem}; using defaults");
    }
    if let Some(source) = source {
        info!("Using config {}", source.display());
    }
}

#[derive(Debug, Error)]
enum CheckError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to serialize summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Load the world once and render its summary as JSON
fn check_report(map: &Path, config: &GameConfig) -> Result<String, CheckError> {
    let world = MapWorld::load(map, &config.world_options(), &FsProbe)?;
    if let Some(report) = world.repair() {
        for path in &report.written {
            info!("Wrote {}", path.display());
        }
        for failure in &report.write_failures {
            warn!("{failure}");
        }
    }
    Ok(serde_json::to_string_pretty(&world.summary())?)
}

fn run_check(map: &Path, config: &GameConfig) -> ExitCode {
    match check_report(map, config) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to check {}: {e}", map.display());
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run_game(
    map: PathBuf,
    config: GameConfig,
    player_name: String,
    source: Option<PathBuf>,
    problems: Vec<String>,
) {
    let settings = MapWorldSettings {
        options: config.world_options(),
        start: Some(map),
    };

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: format!("towerkeep - {player_name}"),
                        resolution: WindowResolution::new(
                            config.window.width,
                            config.window.height,
                        ),
                        ..default()
                    }),
                    ..default()
                })
                .set(ImagePlugin::default_nearest())
                .set(AssetPlugin {
                    // maps reference tilesets anywhere on disk
                    unapproved_path_mode: UnapprovedPathMode::Allow,
                    ..default()
                }),
        )
        .insert_resource(config)
        .add_plugins(MapWorldPlugin { settings })
        .add_plugins(DialoguePlugin)
        .add_plugins(GamePlugin { player_name })
        .add_systems(Startup, move || report_config(source.as_deref(), &problems))
        .run();
}
