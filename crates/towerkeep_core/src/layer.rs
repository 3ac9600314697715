//! Layer types for tile, object and image layers

use crate::{MapObject, Properties};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const FLIPPED_HORIZONTALLY: u32 = 0x8000_0000;
const FLIPPED_VERTICALLY: u32 = 0x4000_0000;
const FLIPPED_DIAGONALLY: u32 = 0x2000_0000;
const ROTATED_HEXAGONAL_120: u32 = 0x1000_0000;
const FLAG_MASK: u32 =
    FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY | ROTATED_HEXAGONAL_120;

/// Global tile id as stored in a tile layer, flip flags included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Gid(pub u32);

impl Gid {
    pub const EMPTY: Gid = Gid(0);

    /// The tile id with flip flags stripped
    pub fn tile_id(self) -> u32 {
        self.0 & !FLAG_MASK
    }

    pub fn is_empty(self) -> bool {
        self.tile_id() == 0
    }

    pub fn flipped_horizontally(self) -> bool {
        self.0 & FLIPPED_HORIZONTALLY != 0
    }

    pub fn flipped_vertically(self) -> bool {
        self.0 & FLIPPED_VERTICALLY != 0
    }
}

/// Cell count of a `width` x `height` grid, computed without `u32` overflow
fn area(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Dense row-major grid of tile ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<Gid>,
}

impl TileGrid {
    /// Create an empty grid
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Gid::EMPTY; area(width, height)],
        }
    }

    /// Build a grid from row-major cells. Returns `None` if the cell count
    /// does not match the dimensions.
    pub fn from_cells(width: u32, height: u32, cells: Vec<Gid>) -> Option<Self> {
        if cells.len() != area(width, height) {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn get(&self, column: u32, row: u32) -> Option<Gid> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(self.index(column, row)).copied()
    }

    pub fn set(&mut self, column: u32, row: u32, gid: Gid) {
        if column < self.width && row < self.height {
            let index = self.index(column, row);
            self.cells[index] = gid;
        }
    }

    fn index(&self, column: u32, row: u32) -> usize {
        row as usize * self.width as usize + column as usize
    }

    /// Non-empty cells as `(column, row, gid)`, row-major
    pub fn tiles(&self) -> impl Iterator<Item = (u32, u32, Gid)> + '_ {
        let width = self.width.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, gid)| !gid.is_empty())
            .map(move |(i, gid)| ((i % width) as u32, (i / width) as u32, *gid))
    }
}

/// A layer of the map, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: Option<u32>,
    pub name: String,
    /// Effective visibility (false if this layer or any enclosing group is hidden)
    pub visible: bool,
    #[serde(default)]
    pub properties: Properties,
    pub data: LayerData,
}

impl Layer {
    /// Create a new visible tile layer
    pub fn new_tile_layer(name: impl Into<String>, grid: TileGrid) -> Self {
        Self {
            id: None,
            name: name.into(),
            visible: true,
            properties: Properties::new(),
            data: LayerData::Tiles(grid),
        }
    }

    /// Create a new visible object layer
    pub fn new_object_layer(name: impl Into<String>, objects: Vec<MapObject>) -> Self {
        Self {
            id: None,
            name: name.into(),
            visible: true,
            properties: Properties::new(),
            data: LayerData::Objects(objects),
        }
    }

    /// Get the kind of this layer
    pub fn layer_type(&self) -> LayerType {
        match &self.data {
            LayerData::Tiles(_) => LayerType::Tiles,
            LayerData::Objects(_) => LayerType::Objects,
            LayerData::Image { .. } => LayerType::Image,
        }
    }

    /// The tile grid, if this is a tile layer
    pub fn tiles(&self) -> Option<&TileGrid> {
        match &self.data {
            LayerData::Tiles(grid) => Some(grid),
            _ => None,
        }
    }

    /// The objects, if this is an object layer
    pub fn objects(&self) -> &[MapObject] {
        match &self.data {
            LayerData::Objects(objects) => objects,
            _ => &[],
        }
    }

    /// Whether the layer carries a truthy `blocked` property
    pub fn is_blocked(&self) -> bool {
        self.properties
            .get("blocked")
            .map(|v| v.is_truthy())
            .unwrap_or(false)
    }

    pub fn with_property(mut self, key: &str, value: impl Into<crate::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// The kind of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerType {
    Tiles,
    Objects,
    Image,
}

/// The data contained in a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerData {
    Tiles(TileGrid),
    Objects(Vec<MapObject>),
    Image {
        /// Image path resolved against the map directory
        source: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_gid_flags() {
        let gid = Gid(0x8000_0005);
        assert_eq!(gid.tile_id(), 5);
        assert!(gid.flipped_horizontally());
        assert!(!gid.flipped_vertically());
        assert!(!gid.is_empty());
        assert!(Gid(FLIPPED_DIAGONALLY).is_empty());
    }

    #[test]
    fn test_grid_tiles_row_major() {
        let mut grid = TileGrid::new(4, 3);
        grid.set(2, 1, Gid(7));
        grid.set(0, 2, Gid(1));
        let tiles: Vec<_> = grid.tiles().collect();
        assert_eq!(tiles, vec![(2, 1, Gid(7)), (0, 2, Gid(1))]);
        assert_eq!(grid.get(2, 1), Some(Gid(7)));
        assert_eq!(grid.get(4, 0), None);
    }

    #[test]
    fn test_from_cells_checks_size() {
        assert!(TileGrid::from_cells(2, 2, vec![Gid(0); 3]).is_none());
        assert!(TileGrid::from_cells(2, 2, vec![Gid(0); 4]).is_some());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_large_grid_indexing_does_not_overflow() {
        assert_eq!(area(65_536, 65_536), 1 << 32);
        let grid = TileGrid {
            width: 65_536,
            height: 65_536,
            cells: Vec::new(),
        };
        assert_eq!(grid.index(65_535, 65_535), (1 << 32) - 1);
        assert_eq!(grid.get(65_535, 65_535), None);
    }

    #[test]
    fn test_blocked_property() {
        let layer = Layer::new_tile_layer("Walls", TileGrid::new(1, 1));
        assert!(!layer.is_blocked());
        let layer = layer.with_property("blocked", Value::Bool(true));
        assert!(layer.is_blocked());
        assert_eq!(layer.layer_type(), LayerType::Tiles);
    }
}
