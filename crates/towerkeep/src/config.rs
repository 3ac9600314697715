//! Game configuration
//!
//! Read from `towerkeep.toml`, looked up in this order:
//! - the `--config` path
//! - `./towerkeep.toml`
//! - the platform config directory:
//!   - Windows: %APPDATA%/towerkeep/
//!   - Linux: ~/.config/towerkeep/
//!   - macOS: ~/Library/Application Support/towerkeep/
//!
//! Missing keys take their defaults. A file that cannot be read or parsed is
//! reported and skipped.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use towerkeep_loader::LoaderOptions;
use towerkeep_runtime::{MapWorldOptions, TowerOptions};

pub const CONFIG_FILE_NAME: &str = "towerkeep.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Resource)]
#[serde(default)]
pub struct GameConfig {
    pub map: MapConfig,
    pub assets: AssetsConfig,
    pub loader: LoaderConfig,
    pub towers: TowersConfig,
    pub player: PlayerConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Map loaded when none is given on the command line
    pub start: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub tower_image_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub repair: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TowersConfig {
    pub require_art: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub default_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            start: PathBuf::from("assets/maps/keep.tmx"),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            tower_image_dir: PathBuf::from("assets/images"),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { repair: true }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_name: "Player".to_string(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A resolved configuration and what went wrong finding it
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: GameConfig,
    /// File the config came from, if any
    pub source: Option<PathBuf>,
    pub problems: Vec<ConfigError>,
}

impl GameConfig {
    /// Parse a config file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find and load the config, falling back to defaults
    pub fn discover(explicit: Option<&Path>) -> LoadedConfig {
        let mut problems = Vec::new();

        if let Some(path) = explicit {
            match Self::load_from(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.to_path_buf()),
                        problems,
                    }
                }
                Err(e) => problems.push(e),
            }
        }

        let fallbacks = [Some(PathBuf::from(CONFIG_FILE_NAME)), platform_config_path()];
        for path in fallbacks.into_iter().flatten() {
            if !path.is_file() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path),
                        problems,
                    }
                }
                Err(e) => {
                    problems.push(e);
                    break;
                }
            }
        }

        LoadedConfig {
            config: Self::default(),
            source: None,
            problems,
        }
    }

    pub fn world_options(&self) -> MapWorldOptions {
        MapWorldOptions {
            loader: LoaderOptions {
                repair: self.loader.repair,
            },
            towers: TowerOptions {
                image_dir: self.assets.tower_image_dir.clone(),
                require_art: self.towers.require_art,
            },
        }
    }
}

/// `towerkeep.toml` in the platform config directory
pub fn platform_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "towerkeep")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
