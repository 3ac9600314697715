//! Tower placement planning
//!
//! Each map picks a fixed template of candidate tower positions based on its
//! file name. A candidate is kept when its 3x3 tile footprint overlaps no
//! collision rect.

use crate::entities::{ElementType, TowerPlacement};
use std::path::{Path, PathBuf};
use thiserror::Error;
use towerkeep_core::{MapDocument, PixelRect};
use tracing::{debug, warn};

/// Footprint side length in tiles
pub const TOWER_FOOTPRINT_TILES: i32 = 3;

/// Existence check for asset files
pub trait AssetProbe {
    fn exists(&self, path: &Path) -> bool;
}

impl<F: Fn(&Path) -> bool> AssetProbe for F {
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Probe the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl AssetProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[derive(Debug, Clone)]
pub struct TowerOptions {
    /// Directory holding `tower_<element>.png`
    pub image_dir: PathBuf,
    /// Only place towers whose art exists
    pub require_art: bool,
}

impl Default for TowerOptions {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("assets/images"),
            require_art: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("no {element} tower art at {}", .path.display())]
pub struct AssetMissing {
    pub element: ElementType,
    pub path: PathBuf,
}

/// Candidate `(element, column, row)` positions for a map.
///
/// `map_name` is matched case-insensitively; `width`/`height` are in tiles.
pub fn template_for(map_name: &str, width: i32, height: i32) -> Vec<(ElementType, i32, i32)> {
    use ElementType::*;

    let name = map_name.to_lowercase();
    let (w, h) = (width, height);
    if name.contains("winter") || name.contains("boss") {
        vec![
            (Ice, 5, 5),
            (Ice, w - 8, 5),
            (Water, 5, h - 8),
            (Water, w - 8, h - 8),
        ]
    } else if name.contains("angel") {
        vec![(Holy, w / 2 - 3, 5), (Holy, 5, h / 2), (Holy, w - 8, h / 2)]
    } else if name.contains("fire") || name.contains("lava") {
        vec![(Fire, 7, 7), (Fire, w - 10, 7), (Void, w / 2, h - 10)]
    } else {
        vec![(Fire, 10, 10), (Water, w - 13, 10)]
    }
}

/// Check which elements have tower art, logging the missing ones
pub fn probe_art(options: &TowerOptions, probe: &dyn AssetProbe) -> Vec<ElementType> {
    ElementType::ALL
        .into_iter()
        .filter(|element| {
            let path = options.image_dir.join(element.art_file_name());
            let found = probe.exists(&path);
            debug!("Probing {}: {}", path.display(), found);
            if !found {
                warn!("{}", AssetMissing { element: *element, path });
            }
            found
        })
        .collect()
}

/// Plan tower placements for a map against its collision rects
pub fn plan_towers(
    map: &MapDocument,
    collisions: &[PixelRect],
    available: &[ElementType],
    options: &TowerOptions,
) -> Vec<TowerPlacement> {
    let (tile_width, tile_height) = (map.tile_width as i32, map.tile_height as i32);
    template_for(&map.file_name(), map.width as i32, map.height as i32)
        .into_iter()
        .filter_map(|(element, column, row)| {
            let rect = PixelRect::new(
                column * tile_width,
                row * tile_height,
                TOWER_FOOTPRINT_TILES * tile_width,
                TOWER_FOOTPRINT_TILES * tile_height,
            );
            if collisions.iter().any(|c| c.intersects(&rect)) {
                debug!("Tower {element} at ({column}, {row}) blocked by collision");
                return None;
            }
            let art_available = available.contains(&element);
            if options.require_art && !art_available {
                debug!("Tower {element} at ({column}, {row}) skipped: no art");
                return None;
            }
            Some(TowerPlacement {
                column,
                row,
                element,
                rect,
                art_available,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(name: &str, width: u32, height: u32) -> MapDocument {
        MapDocument::new(format!("maps/{name}"), width, height, 32, 32)
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            template_for("Winter_Castle.tmx", 40, 30),
            vec![
                (ElementType::Ice, 5, 5),
                (ElementType::Ice, 32, 5),
                (ElementType::Water, 5, 22),
                (ElementType::Water, 32, 22),
            ]
        );
        assert_eq!(template_for("boss_room.tmx", 40, 30).len(), 4);
        assert_eq!(
            template_for("angel_gate.tmx", 41, 31),
            vec![
                (ElementType::Holy, 17, 5),
                (ElementType::Holy, 5, 15),
                (ElementType::Holy, 33, 15),
            ]
        );
        assert_eq!(
            template_for("lava_pits.tmx", 40, 30),
            vec![
                (ElementType::Fire, 7, 7),
                (ElementType::Fire, 30, 7),
                (ElementType::Void, 20, 20),
            ]
        );
        assert_eq!(
            template_for("meadow.tmx", 40, 30),
            vec![(ElementType::Fire, 10, 10), (ElementType::Water, 27, 10)]
        );
    }

    #[test]
    fn test_overlapping_footprint_is_excluded() {
        let map = map("meadow.tmx", 40, 30);
        // inside the fire tower footprint at (10, 10)
        let collisions = [PixelRect::new(11 * 32, 11 * 32, 32, 32)];
        let towers = plan_towers(&map, &collisions, &[], &TowerOptions::default());
        assert_eq!(towers.len(), 1);
        assert_eq!(towers[0].element, ElementType::Water);
        assert_eq!(towers[0].rect, PixelRect::new(27 * 32, 320, 96, 96));
        assert!(!towers[0].art_available);
    }

    #[test]
    fn test_adjacent_collision_does_not_exclude() {
        let map = map("meadow.tmx", 40, 30);
        // touches the footprint's right edge only
        let collisions = [PixelRect::new(13 * 32, 10 * 32, 32, 32)];
        let towers = plan_towers(&map, &collisions, &[], &TowerOptions::default());
        assert_eq!(towers.len(), 2);
        assert_eq!((towers[0].column, towers[0].row), (10, 10));
    }

    #[test]
    fn test_require_art() {
        let map = map("meadow.tmx", 40, 30);
        let options = TowerOptions {
            require_art: true,
            ..Default::default()
        };
        let towers = plan_towers(&map, &[], &[ElementType::Water], &options);
        assert_eq!(towers.len(), 1);
        assert_eq!(towers[0].element, ElementType::Water);
        assert!(towers[0].art_available);
    }

    #[test]
    fn test_probe_art() {
        let options = TowerOptions {
            image_dir: PathBuf::from("art"),
            require_art: false,
        };
        let probe = |path: &Path| {
            path == Path::new("art/tower_fire.png") || path == Path::new("art/tower_holy.png")
        };
        assert_eq!(
            probe_art(&options, &probe),
            vec![ElementType::Fire, ElementType::Holy]
        );
    }

    #[test]
    fn test_asset_missing_message() {
        let missing = AssetMissing {
            element: ElementType::Ice,
            path: PathBuf::from("art/tower_ice.png"),
        };
        assert_eq!(missing.to_string(), "no ice tower art at art/tower_ice.png");
    }
}
