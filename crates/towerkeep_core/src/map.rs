//! The resolved map document

use crate::{Gid, Layer, MapObject, Properties, Tileset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A fully resolved tile map: every tileset and image reference exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    /// Path the document was loaded from
    pub path: PathBuf,
    pub orientation: String,
    /// Grid size in tiles
    pub width: u32,
    pub height: u32,
    /// Tile size in pixels
    pub tile_width: u32,
    pub tile_height: u32,
    /// Layers in document order (groups flattened)
    pub layers: Vec<Layer>,
    /// Tilesets ordered by first GID
    pub tilesets: Vec<Tileset>,
    #[serde(default)]
    pub properties: Properties,
}

impl MapDocument {
    /// Create an empty orthogonal map
    pub fn new(
        path: impl Into<PathBuf>,
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Self {
        Self {
            path: path.into(),
            orientation: "orthogonal".to_string(),
            width,
            height,
            tile_width,
            tile_height,
            layers: Vec::new(),
            tilesets: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// Directory containing the document
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name of the document, e.g. `winter_castle.tmx`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Map size in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width * self.tile_width, self.height * self.tile_height)
    }

    /// Visible layers in document order
    pub fn visible_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|layer| layer.visible)
    }

    /// All objects of all object layers, in layer order
    pub fn objects(&self) -> impl Iterator<Item = &MapObject> {
        self.layers.iter().flat_map(|layer| layer.objects().iter())
    }

    /// Tileset owning a GID
    pub fn tileset_for(&self, gid: Gid) -> Option<&Tileset> {
        let id = gid.tile_id();
        self.tilesets
            .iter()
            .rev()
            .find(|ts| ts.first_gid <= id)
            .filter(|ts| ts.contains(id))
    }
}
