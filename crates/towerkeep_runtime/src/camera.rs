//! Viewport that follows a target and never shows outside the map

use bevy::prelude::Resource;
use towerkeep_core::PixelRect;

/// Top-left corner of the visible area, in map pixels
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapCamera {
    pub x: i32,
    pub y: i32,
    screen_width: i32,
    screen_height: i32,
    map_width: i32,
    map_height: i32,
}

impl MapCamera {
    pub fn new(screen_width: i32, screen_height: i32, map_width: i32, map_height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            screen_width,
            screen_height,
            map_width,
            map_height,
        }
    }

    /// Center on `target`, clamped so the view stays inside the map.
    ///
    /// A map smaller than the screen is pinned to the top-left corner.
    pub fn follow(&mut self, target: PixelRect) {
        let x = target.x + target.width / 2 - self.screen_width / 2;
        let y = target.y + target.height / 2 - self.screen_height / 2;
        self.x = x.min(self.map_width - self.screen_width).max(0);
        self.y = y.min(self.map_height - self.screen_height).max(0);
    }

    pub fn update_screen_size(&mut self, screen_width: i32, screen_height: i32) {
        self.screen_width = screen_width;
        self.screen_height = screen_height;
    }

    pub fn screen_size(&self) -> (i32, i32) {
        (self.screen_width, self.screen_height)
    }
}
