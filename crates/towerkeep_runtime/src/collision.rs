//! Collision geometry extracted from tile layers
//!
//! One pixel rect per non-empty cell of the collision-contributing layers,
//! unmerged, in layer order and then row-major order. Which layers contribute
//! is decided by the first matching rule:
//!
//! 1. the bottommost visible layer, if it is a tile layer that is `blocked`
//!    or named `collision`
//! 2. the first tile layer named `collision`, if it is `blocked`
//! 3. every visible `blocked` tile layer

use towerkeep_core::{Layer, MapDocument, PixelRect, TileGrid};
use tracing::debug;

pub const COLLISION_LAYER_NAME: &str = "collision";

fn is_collision_named(layer: &Layer) -> bool {
    layer.name.eq_ignore_ascii_case(COLLISION_LAYER_NAME)
}

/// Extract the collision rects of a map
pub fn extract_collisions(map: &MapDocument) -> Vec<PixelRect> {
    let (tile_width, tile_height) = (map.tile_width, map.tile_height);

    if let Some(bottom) = map.visible_layers().next() {
        if let Some(grid) = bottom.tiles() {
            if bottom.is_blocked() || is_collision_named(bottom) {
                debug!("Collision from bottom layer '{}'", bottom.name);
                return cell_rects(grid, tile_width, tile_height).collect();
            }
        }
    }

    let named = map
        .layers
        .iter()
        .find(|layer| layer.tiles().is_some() && is_collision_named(layer));
    if let Some(layer) = named {
        if let (true, Some(grid)) = (layer.is_blocked(), layer.tiles()) {
            debug!("Collision from layer '{}'", layer.name);
            return cell_rects(grid, tile_width, tile_height).collect();
        }
    }

    map.visible_layers()
        .filter(|layer| layer.is_blocked())
        .filter_map(Layer::tiles)
        .flat_map(|grid| cell_rects(grid, tile_width, tile_height))
        .collect()
}

fn cell_rects(
    grid: &TileGrid,
    tile_width: u32,
    tile_height: u32,
) -> impl Iterator<Item = PixelRect> + '_ {
    grid.tiles()
        .map(move |(column, row, _)| PixelRect::from_cell(column, row, tile_width, tile_height))
}
