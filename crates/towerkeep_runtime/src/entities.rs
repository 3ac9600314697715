//! Gameplay entities derived from a map

use bevy::prelude::Component;
use serde::{Deserialize, Serialize};
use std::fmt;
use towerkeep_core::PixelRect;
use towerkeep_dialogue::NpcRole;

/// Elemental type of a tower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Fire,
    Water,
    Void,
    Ice,
    Lightning,
    Holy,
}

impl ElementType {
    pub const ALL: [ElementType; 6] = [
        ElementType::Fire,
        ElementType::Water,
        ElementType::Void,
        ElementType::Ice,
        ElementType::Lightning,
        ElementType::Holy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Fire => "fire",
            ElementType::Water => "water",
            ElementType::Void => "void",
            ElementType::Ice => "ice",
            ElementType::Lightning => "lightning",
            ElementType::Holy => "holy",
        }
    }

    /// File name of the tower art for this element
    pub fn art_file_name(self) -> String {
        format!("tower_{}.png", self.as_str())
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger area that moves the player to another map
#[derive(Component, Debug, Clone, PartialEq, Serialize)]
pub struct Teleport {
    pub rect: PixelRect,
    /// Destination map identifier, if the object names one
    pub destination: Option<String>,
    pub dest_x: Option<f64>,
    pub dest_y: Option<f64>,
}

#[derive(Component, Debug, Clone, PartialEq, Serialize)]
pub struct Boss {
    /// Position in pixels
    pub x: i32,
    pub y: i32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Boss {
    pub fn new(x: i32, y: i32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            x,
            y,
            tile_width,
            tile_height,
        }
    }
}

/// Where a tower goes and what it is
#[derive(Component, Debug, Clone, PartialEq, Serialize)]
pub struct TowerPlacement {
    /// Grid position in tiles
    pub column: i32,
    pub row: i32,
    pub element: ElementType,
    /// Pixel footprint used for collision testing
    pub rect: PixelRect,
    /// Whether `tower_<element>.png` was found
    pub art_available: bool,
}

#[derive(Component, Debug, Clone, PartialEq, Serialize)]
pub struct NpcSpawn {
    /// Position in pixels
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub role: NpcRole,
    pub lines: Vec<String>,
    /// Lines came from the map rather than the role's default set
    pub custom_dialogue: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_names() {
        let names: Vec<_> = ElementType::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(names, vec!["fire", "water", "void", "ice", "lightning", "holy"]);
        assert_eq!(ElementType::Holy.art_file_name(), "tower_holy.png");
    }
}
