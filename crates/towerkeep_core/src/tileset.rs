//! Resolved tilesets and GID lookup

use crate::Properties;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a tileset definition came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TilesetSource {
    /// Embedded in the map document
    Embedded,
    /// External tileset document
    External {
        /// Reference as written in the map
        declared: String,
        /// Path the reference resolved to
        resolved: PathBuf,
    },
}

/// The atlas image of a tileset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetImage {
    /// Reference as written in the tileset
    pub declared: String,
    /// Path the reference resolved to
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A tileset as referenced by the map, fully resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub first_gid: u32,
    pub name: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_count: u32,
    pub columns: u32,
    #[serde(default)]
    pub spacing: u32,
    #[serde(default)]
    pub margin: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<TilesetImage>,
    pub source: TilesetSource,
    #[serde(default)]
    pub properties: Properties,
}

impl Tileset {
    /// Whether a tile id (flags stripped) belongs to this tileset
    pub fn contains(&self, tile_id: u32) -> bool {
        tile_id >= self.first_gid && tile_id - self.first_gid < self.tile_count
    }

    /// Local index of a tile id within this tileset
    pub fn local_id(&self, tile_id: u32) -> Option<u32> {
        self.contains(tile_id).then(|| tile_id - self.first_gid)
    }

    /// Pixel rect `(x, y, w, h)` of a local tile within the atlas image.
    /// `None` if the tile is out of range or its offset does not fit in `u32`.
    pub fn source_rect(&self, local_id: u32) -> Option<(u32, u32, u32, u32)> {
        if self.columns == 0 || local_id >= self.tile_count {
            return None;
        }
        let offset = |index: u32, size: u32| {
            size.checked_add(self.spacing)?
                .checked_mul(index)?
                .checked_add(self.margin)
        };
        Some((
            offset(local_id % self.columns, self.tile_width)?,
            offset(local_id / self.columns, self.tile_height)?,
            self.tile_width,
            self.tile_height,
        ))
    }
}
