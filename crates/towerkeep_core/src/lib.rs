//! Core data structures for towerkeep maps
//!
//! This crate provides the resolved, in-memory form of a tile map:
//! - `MapDocument` - A complete map with layers and tilesets
//! - `Layer` - A single layer (tiles, objects or an image)
//! - `Tileset` - Resolved tileset with its atlas image
//! - `MapObject` - Free-form objects with custom properties
//! - `Value` - Generic property value type
//! - `PixelRect` - Pixel-space rectangle used for collision geometry

mod collision;
mod entity;
mod layer;
mod map;
mod tileset;
mod value;

pub use collision::PixelRect;
pub use entity::MapObject;
pub use layer::{Gid, Layer, LayerData, LayerType, TileGrid};
pub use map::MapDocument;
pub use tileset::{Tileset, TilesetImage, TilesetSource};
pub use value::{Properties, Value};
