//! Stand-in assets written when a referenced file cannot be found anywhere

use crate::xml::XmlElement;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::warn;

/// 1x1 fully transparent PNG
const TRANSPARENT_PIXEL_PNG: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Encode a transparent image of the given size as PNG.
///
/// Falls back to a 1x1 pixel if encoding fails.
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::new(width.max(1), height.max(1));
    let mut bytes = Cursor::new(Vec::new());
    match image.write_to(&mut bytes, ImageFormat::Png) {
        Ok(()) => bytes.into_inner(),
        Err(e) => {
            warn!("Failed to encode {width}x{height} placeholder image: {e}");
            TRANSPARENT_PIXEL_PNG.to_vec()
        }
    }
}

/// A one-tile tileset whose atlas is `image_file` (relative to the tileset)
pub fn tileset_document(
    name: &str,
    image_file: &str,
    tile_width: u32,
    tile_height: u32,
) -> XmlElement {
    XmlElement::new("tileset")
        .with_attr("version", "1.10")
        .with_attr("name", name)
        .with_attr("tilewidth", tile_width)
        .with_attr("tileheight", tile_height)
        .with_attr("tilecount", 1)
        .with_attr("columns", 1)
        .with_child(
            XmlElement::new("image")
                .with_attr("source", image_file)
                .with_attr("width", tile_width)
                .with_attr("height", tile_height),
        )
}
