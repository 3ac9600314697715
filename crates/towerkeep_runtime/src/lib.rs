//! towerkeep_runtime - Game world assembly for towerkeep maps
//!
//! Takes a resolved map from `towerkeep_loader` and derives what the game
//! needs from it:
//! - Collision rects from blocked or `collision` tile layers
//! - Teleports, bosses and NPCs from object layers
//! - Tower placements from a per-map template, minus blocked footprints
//!
//! [`MapWorld`] bundles all of it and can draw its tile layers onto any
//! [`TileSurface`]. [`MapWorldPlugin`] does the loading on a worker thread
//! and spawns the result as sprites.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use towerkeep_runtime::{MapWorldPlugin, MapWorldSettings};
//!
//! App::new()
//!     .add_plugins(DefaultPlugins)
//!     .add_plugins(MapWorldPlugin {
//!         settings: MapWorldSettings {
//!             start: Some("assets/maps/keep.tmx".into()),
//!             ..default()
//!         },
//!     })
//!     .run();
//! ```

pub mod camera;
pub mod collision;
pub mod entities;
pub mod objects;
mod plugin;
pub mod towers;
mod world;

pub use camera::MapCamera;
pub use collision::extract_collisions;
pub use entities::{Boss, ElementType, NpcSpawn, Teleport, TowerPlacement};
pub use objects::{classify, ObjectInterpretationError, ObjectKind};
pub use plugin::{
    entity_rect, CameraFocus, LoadMapRequest, MapLoadFailed, MapReady, MapScene, MapTile,
    MapWorldPlugin, MapWorldSettings, PendingMapLoad,
};
pub use towers::{AssetMissing, AssetProbe, FsProbe, TowerOptions};
pub use world::{MapWorld, MapWorldOptions, TileImage, TileSurface, WorldSummary};

pub use towerkeep_loader::{LoadError, LoaderOptions};
