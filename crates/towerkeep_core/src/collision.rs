//! Pixel-space rectangles used for collision geometry
//!
//! Map coordinates follow the editor convention: origin at the top-left
//! corner of the map, x to the right, y downward.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect covering one grid cell
    pub fn from_cell(column: u32, row: u32, tile_width: u32, tile_height: u32) -> Self {
        Self::new(
            (column * tile_width) as i32,
            (row * tile_height) as i32,
            tile_width as i32,
            tile_height as i32,
        )
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Whether the rect has no area
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Strict overlap test. Rects that only share an edge do not intersect,
    /// and empty rects never intersect anything.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether the point lies inside the rect (right/bottom edges exclusive)
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Same rect moved by an offset
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}
