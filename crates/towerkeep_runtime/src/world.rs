//! The assembled, immutable game world for one map

use crate::collision::extract_collisions;
use crate::entities::{Boss, NpcSpawn, Teleport, TowerPlacement};
use crate::objects::{build_bosses, build_npcs, build_teleports, or_empty};
use crate::towers::{plan_towers, probe_art, AssetProbe, TowerOptions};
use bevy::prelude::Resource;
use serde::Serialize;
use std::path::{Path, PathBuf};
use towerkeep_core::{MapDocument, PixelRect};
use towerkeep_loader::{LoadError, LoadedMap, LoaderOptions, MapLoader, RepairReport};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct MapWorldOptions {
    pub loader: LoaderOptions,
    pub towers: TowerOptions,
}

/// One tile to draw: a region of a tileset image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileImage<'a> {
    pub image: &'a Path,
    pub source: PixelRect,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Something tiles can be drawn onto
pub trait TileSurface {
    /// Draw `tile` with its top-left corner at screen position `(x, y)`
    fn blit(&mut self, tile: &TileImage<'_>, x: i32, y: i32);
}

/// A loaded map with everything derived from it
#[derive(Resource, Debug)]
pub struct MapWorld {
    document: MapDocument,
    collisions: Vec<PixelRect>,
    teleports: Vec<Teleport>,
    bosses: Vec<Boss>,
    towers: Vec<TowerPlacement>,
    npcs: Vec<NpcSpawn>,
    repair: Option<RepairReport>,
}

/// Counts describing a world, for headless checks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub map: PathBuf,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub layers: usize,
    pub tilesets: usize,
    pub collisions: usize,
    pub teleports: usize,
    pub bosses: usize,
    pub towers: usize,
    pub npcs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaired_into: Option<PathBuf>,
    pub repair_writes: usize,
    pub degraded: bool,
}

impl MapWorld {
    /// Load the map at `path` from the filesystem and build the world
    pub fn load(
        path: impl AsRef<Path>,
        options: &MapWorldOptions,
        probe: &dyn AssetProbe,
    ) -> Result<Self, LoadError> {
        let loaded = MapLoader::new(options.loader.clone()).load(path)?;
        Ok(Self::from_loaded(loaded, &options.towers, probe))
    }

    pub fn from_loaded(loaded: LoadedMap, towers: &TowerOptions, probe: &dyn AssetProbe) -> Self {
        let mut world = Self::from_document(loaded.document, towers, probe);
        world.repair = loaded.repair;
        world
    }

    /// Derive collisions and entities from a resolved document
    pub fn from_document(
        document: MapDocument,
        towers: &TowerOptions,
        probe: &dyn AssetProbe,
    ) -> Self {
        let collisions = extract_collisions(&document);
        let teleports = or_empty("teleports", build_teleports(&document));
        let bosses = or_empty("bosses", build_bosses(&document));
        let npcs = or_empty("NPCs", build_npcs(&document));
        let available = probe_art(towers, probe);
        let towers = plan_towers(&document, &collisions, &available, towers);

        info!(
            "Built world for {}: {} collision rects, {} teleports, {} bosses, {} towers, {} NPCs",
            document.path.display(),
            collisions.len(),
            teleports.len(),
            bosses.len(),
            towers.len(),
            npcs.len()
        );

        Self {
            document,
            collisions,
            teleports,
            bosses,
            towers,
            npcs,
            repair: None,
        }
    }

    pub fn document(&self) -> &MapDocument {
        &self.document
    }

    /// Tile size in pixels
    pub fn tile_size(&self) -> (u32, u32) {
        (self.document.tile_width, self.document.tile_height)
    }

    /// Grid size in tiles
    pub fn grid_size(&self) -> (u32, u32) {
        (self.document.width, self.document.height)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.document.pixel_size()
    }

    pub fn collisions(&self) -> &[PixelRect] {
        &self.collisions
    }

    pub fn teleports(&self) -> &[Teleport] {
        &self.teleports
    }

    pub fn bosses(&self) -> &[Boss] {
        &self.bosses
    }

    pub fn towers(&self) -> &[TowerPlacement] {
        &self.towers
    }

    pub fn npcs(&self) -> &[NpcSpawn] {
        &self.npcs
    }

    /// The repair that made the map loadable, if any
    pub fn repair(&self) -> Option<&RepairReport> {
        self.repair.as_ref()
    }

    /// Whether `rect` overlaps any collision rect
    pub fn is_blocked(&self, rect: &PixelRect) -> bool {
        self.collisions.iter().any(|c| c.intersects(rect))
    }

    /// First teleport overlapping `rect`
    pub fn teleport_at(&self, rect: &PixelRect) -> Option<&Teleport> {
        self.teleports.iter().find(|t| t.rect.intersects(rect))
    }

    /// Draw every visible tile layer, bottom to top, offset by the camera
    pub fn draw(&self, surface: &mut dyn TileSurface, camera_x: i32, camera_y: i32) {
        let (tile_width, tile_height) = (self.document.tile_width, self.document.tile_height);
        for grid in self.document.visible_layers().filter_map(|layer| layer.tiles()) {
            for (column, row, gid) in grid.tiles() {
                let Some(tileset) = self.document.tileset_for(gid) else {
                    continue;
                };
                let Some(image) = &tileset.image else {
                    continue;
                };
                let Some((sx, sy, sw, sh)) = tileset
                    .local_id(gid.tile_id())
                    .and_then(|local| tileset.source_rect(local))
                else {
                    continue;
                };
                let tile = TileImage {
                    image: &image.path,
                    source: PixelRect::new(sx as i32, sy as i32, sw as i32, sh as i32),
                    flip_x: gid.flipped_horizontally(),
                    flip_y: gid.flipped_vertically(),
                };
                surface.blit(
                    &tile,
                    (column * tile_width) as i32 - camera_x,
                    (row * tile_height) as i32 - camera_y,
                );
            }
        }
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            map: self.document.path.clone(),
            width: self.document.width,
            height: self.document.height,
            tile_width: self.document.tile_width,
            tile_height: self.document.tile_height,
            layers: self.document.layers.len(),
            tilesets: self.document.tilesets.len(),
            collisions: self.collisions.len(),
            teleports: self.teleports.len(),
            bosses: self.bosses.len(),
            towers: self.towers.len(),
            npcs: self.npcs.len(),
            repaired_into: self.repair.as_ref().map(|r| r.fixed_map.clone()),
            repair_writes: self.repair.as_ref().map_or(0, |r| r.written.len()),
            degraded: self.repair.as_ref().is_some_and(RepairReport::is_degraded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerkeep_core::{
        Gid, Layer, MapObject, Properties, TileGrid, Tileset, TilesetImage, TilesetSource,
    };

    #[derive(Default)]
    struct Recorder {
        blits: Vec<(PathBuf, PixelRect, bool, i32, i32)>,
    }

    impl TileSurface for Recorder {
        fn blit(&mut self, tile: &TileImage<'_>, x: i32, y: i32) {
            self.blits
                .push((tile.image.to_path_buf(), tile.source, tile.flip_x, x, y));
        }
    }

    fn tileset() -> Tileset {
        Tileset {
            first_gid: 1,
            name: "terrain".to_string(),
            tile_width: 16,
            tile_height: 16,
            tile_count: 4,
            columns: 2,
            spacing: 0,
            margin: 0,
            image: Some(TilesetImage {
                declared: "terrain.png".to_string(),
                path: PathBuf::from("maps/terrain.png"),
                width: 32,
                height: 32,
            }),
            source: TilesetSource::Embedded,
            properties: Properties::new(),
        }
    }

    fn grid(cells: &[u32]) -> TileGrid {
        TileGrid::from_cells(2, 2, cells.iter().copied().map(Gid).collect()).unwrap()
    }

    fn world() -> MapWorld {
        let mut map = MapDocument::new("maps/meadow.tmx", 2, 2, 16, 16);
        map.tilesets = vec![tileset()];
        map.layers = vec![
            Layer::new_tile_layer("ground", grid(&[1, 0, 0, 4])),
            Layer::new_tile_layer("hidden", grid(&[2, 2, 2, 2])).with_visible(false),
            Layer::new_tile_layer("walls", grid(&[0, 3 | 0x8000_0000, 0, 99]))
                .with_property("blocked", true),
            Layer::new_object_layer(
                "objects",
                vec![MapObject::new(1, 0.0, 0.0)
                    .with_class("teleport")
                    .with_size(8.0, 8.0)
                    .with_property("dest", "cave")],
            ),
        ];
        MapWorld::from_document(map, &TowerOptions::default(), &|_: &Path| false)
    }

    #[test]
    fn test_draw_visible_layers_in_order() {
        let world = world();
        let mut surface = Recorder::default();
        world.draw(&mut surface, 4, 2);

        let image = PathBuf::from("maps/terrain.png");
        assert_eq!(
            surface.blits,
            vec![
                (image.clone(), PixelRect::new(0, 0, 16, 16), false, -4, -2),
                (image.clone(), PixelRect::new(16, 16, 16, 16), false, 12, 14),
                (image, PixelRect::new(0, 16, 16, 16), true, 12, -2),
            ]
        );
    }

    #[test]
    fn test_queries() {
        let world = world();
        assert_eq!(world.tile_size(), (16, 16));
        assert_eq!(world.grid_size(), (2, 2));
        // uncovered gid 99 still blocks
        assert_eq!(
            world.collisions(),
            &[PixelRect::new(16, 0, 16, 16), PixelRect::new(16, 16, 16, 16)]
        );
        assert!(world.is_blocked(&PixelRect::new(20, 20, 4, 4)));
        assert!(!world.is_blocked(&PixelRect::new(0, 0, 16, 16)));

        let teleport = world.teleport_at(&PixelRect::new(4, 4, 2, 2));
        assert_eq!(teleport.and_then(|t| t.destination.as_deref()), Some("cave"));
        assert!(world.teleport_at(&PixelRect::new(8, 8, 2, 2)).is_none());
    }

    #[test]
    fn test_summary() {
        let summary = world().summary();
        assert_eq!(summary.collisions, 2);
        assert_eq!(summary.teleports, 1);
        assert_eq!(summary.layers, 4);
        assert_eq!(summary.repaired_into, None);
        assert!(!summary.degraded);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["map"], "maps/meadow.tmx");
        assert!(json.get("repaired_into").is_none());
    }
}
