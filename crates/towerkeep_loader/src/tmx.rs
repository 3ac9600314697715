//! Reading TMX maps and TSX tilesets into a [`MapDocument`]
//!
//! Every tileset and tileset-image reference is checked against the
//! [`AssetSource`]; a dangling one fails with
//! [`LoadError::MissingReference`] so the caller can decide to repair.

use crate::error::{LoadError, ReferenceKind};
use crate::source::{resolve_reference, AssetSource};
use crate::xml::{self, XmlElement};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use std::path::Path;
use std::str::FromStr;
use towerkeep_core::{
    Gid, Layer, LayerData, MapDocument, MapObject, Properties, TileGrid, Tileset, TilesetImage,
    TilesetSource, Value,
};
use tracing::debug;

/// Read and parse an XML document through the source
pub fn read_document(path: &Path, source: &dyn AssetSource) -> Result<XmlElement, LoadError> {
    let text = source
        .read_to_string(path)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    xml::parse(&text).map_err(|message| LoadError::Xml {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse a TMX map, resolving external tilesets and images
pub fn parse_map(path: &Path, source: &dyn AssetSource) -> Result<MapDocument, LoadError> {
    let root = read_document(path, source)?;
    if root.name != "map" {
        return Err(LoadError::invalid(
            path,
            format!("expected <map> root element, found <{}>", root.name),
        ));
    }
    if root.attr("infinite") == Some("1") {
        return Err(LoadError::unsupported(path, "infinite map"));
    }

    let mut document = MapDocument::new(
        path,
        required(&root, "width", path)?,
        required(&root, "height", path)?,
        required(&root, "tilewidth", path)?,
        required(&root, "tileheight", path)?,
    );
    if let Some(orientation) = root.attr("orientation") {
        document.orientation = orientation.to_string();
    }

    let map_dir = document.directory().to_path_buf();
    let ctx = LayerContext {
        path,
        map_dir: &map_dir,
        width: document.width,
        height: document.height,
    };

    for child in &root.children {
        match child.name.as_str() {
            "properties" => document.properties = parse_properties(child),
            "tileset" => document
                .tilesets
                .push(parse_tileset_ref(child, &map_dir, path, source)?),
            "layer" | "objectgroup" | "imagelayer" | "group" => {
                collect_layers(child, true, &ctx, &mut document.layers)?
            }
            _ => {}
        }
    }
    document.tilesets.sort_by_key(|ts| ts.first_gid);

    debug!(
        "Parsed {} ({}x{} tiles, {} layers, {} tilesets)",
        path.display(),
        document.width,
        document.height,
        document.layers.len(),
        document.tilesets.len()
    );
    Ok(document)
}

fn parse_tileset_ref(
    element: &XmlElement,
    map_dir: &Path,
    map_path: &Path,
    source: &dyn AssetSource,
) -> Result<Tileset, LoadError> {
    let first_gid: u32 = required(element, "firstgid", map_path)?;

    let Some(declared) = element.attr("source") else {
        return parse_tileset_body(element, first_gid, map_dir, map_path, source);
    };

    let resolved = resolve_reference(map_dir, declared);
    if !source.exists(&resolved) {
        return Err(LoadError::MissingReference {
            kind: ReferenceKind::Tileset,
            declared: declared.to_string(),
            resolved,
            document: map_path.to_path_buf(),
        });
    }

    let tsx = read_document(&resolved, source)?;
    if tsx.name != "tileset" {
        return Err(LoadError::invalid(
            &resolved,
            format!("expected <tileset> root element, found <{}>", tsx.name),
        ));
    }
    let tsx_dir = resolved.parent().unwrap_or_else(|| Path::new(""));
    let mut tileset = parse_tileset_body(&tsx, first_gid, tsx_dir, &resolved, source)?;
    tileset.source = TilesetSource::External {
        declared: declared.to_string(),
        resolved: resolved.clone(),
    };
    Ok(tileset)
}

fn parse_tileset_body(
    element: &XmlElement,
    first_gid: u32,
    base_dir: &Path,
    document: &Path,
    source: &dyn AssetSource,
) -> Result<Tileset, LoadError> {
    let tile_width: u32 = required(element, "tilewidth", document)?;
    let tile_height: u32 = required(element, "tileheight", document)?;
    let spacing = optional(element, "spacing", document)?.unwrap_or(0);
    let margin = optional(element, "margin", document)?.unwrap_or(0);

    let image = match element.child("image") {
        Some(image) => Some(parse_tileset_image(image, base_dir, document, source)?),
        None => None,
    };

    let columns = match optional(element, "columns", document)? {
        Some(columns) => columns,
        None => image
            .as_ref()
            .map(|img| grid_extent(img.width, tile_width, spacing, margin))
            .unwrap_or(0),
    };
    let tile_count = match optional(element, "tilecount", document)? {
        Some(count) => count,
        None => {
            let rows = image
                .as_ref()
                .map(|img| grid_extent(img.height, tile_height, spacing, margin))
                .unwrap_or(0);
            columns * rows
        }
    };

    Ok(Tileset {
        first_gid,
        name: element.attr("name").unwrap_or_default().to_string(),
        tile_width,
        tile_height,
        tile_count,
        columns,
        spacing,
        margin,
        image,
        source: TilesetSource::Embedded,
        properties: properties_of(element),
    })
}

fn parse_tileset_image(
    element: &XmlElement,
    base_dir: &Path,
    document: &Path,
    source: &dyn AssetSource,
) -> Result<TilesetImage, LoadError> {
    let declared = element
        .attr("source")
        .ok_or_else(|| LoadError::invalid(document, "tileset <image> without a source"))?;
    let path = resolve_reference(base_dir, declared);
    if !source.exists(&path) {
        return Err(LoadError::MissingReference {
            kind: ReferenceKind::Image,
            declared: declared.to_string(),
            resolved: path,
            document: document.to_path_buf(),
        });
    }
    Ok(TilesetImage {
        declared: declared.to_string(),
        path,
        width: optional(element, "width", document)?.unwrap_or(0),
        height: optional(element, "height", document)?.unwrap_or(0),
    })
}

/// Number of whole tiles that fit along one axis of an atlas image
fn grid_extent(extent: u32, tile: u32, spacing: u32, margin: u32) -> u32 {
    let usable = extent.saturating_sub(2 * margin);
    if tile == 0 || usable < tile {
        return 0;
    }
    (usable + spacing) / (tile + spacing)
}

struct LayerContext<'a> {
    path: &'a Path,
    map_dir: &'a Path,
    width: u32,
    height: u32,
}

/// Append `element` (and, for groups, its descendants) to `layers`
fn collect_layers(
    element: &XmlElement,
    parent_visible: bool,
    ctx: &LayerContext,
    layers: &mut Vec<Layer>,
) -> Result<(), LoadError> {
    let visible = parent_visible && element.attr("visible") != Some("0");

    let data = match element.name.as_str() {
        "group" => {
            for child in &element.children {
                if matches!(
                    child.name.as_str(),
                    "layer" | "objectgroup" | "imagelayer" | "group"
                ) {
                    collect_layers(child, visible, ctx, layers)?;
                }
            }
            return Ok(());
        }
        "layer" => LayerData::Tiles(parse_tile_layer(element, ctx)?),
        "objectgroup" => LayerData::Objects(
            element
                .children_named("object")
                .map(|object| parse_object(object, ctx.path))
                .collect::<Result<_, _>>()?,
        ),
        _ => LayerData::Image {
            source: element
                .child("image")
                .and_then(|image| image.attr("source"))
                .map(|declared| resolve_reference(ctx.map_dir, declared)),
        },
    };

    layers.push(Layer {
        id: optional(element, "id", ctx.path)?,
        name: element.attr("name").unwrap_or_default().to_string(),
        visible,
        properties: properties_of(element),
        data,
    });
    Ok(())
}

fn parse_tile_layer(element: &XmlElement, ctx: &LayerContext) -> Result<TileGrid, LoadError> {
    let width = optional(element, "width", ctx.path)?.unwrap_or(ctx.width);
    let height = optional(element, "height", ctx.path)?.unwrap_or(ctx.height);
    let name = element.attr("name").unwrap_or_default();

    let Some(data) = element.child("data") else {
        return Ok(TileGrid::new(width, height));
    };
    let cells = decode_tile_data(data, ctx.path)?;
    let count = cells.len();
    TileGrid::from_cells(width, height, cells).ok_or_else(|| {
        LoadError::invalid(
            ctx.path,
            format!(
                "layer '{name}' has {count} tiles, expected {}",
                width as usize * height as usize
            ),
        )
    })
}

fn decode_tile_data(data: &XmlElement, path: &Path) -> Result<Vec<Gid>, LoadError> {
    if data.child("chunk").is_some() {
        return Err(LoadError::unsupported(path, "chunked tile data"));
    }

    match data.attr("encoding") {
        None => data
            .children_named("tile")
            .map(|tile| parse_gid(tile.attr("gid").unwrap_or("0"), path))
            .collect(),
        Some("csv") => data
            .text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_gid(s, path))
            .collect(),
        Some("base64") => {
            if let Some(compression) = data.attr("compression").filter(|c| !c.is_empty()) {
                return Err(LoadError::unsupported(
                    path,
                    format!("{compression}-compressed tile data"),
                ));
            }
            let packed: String = data.text.split_whitespace().collect();
            let bytes = BASE64_STANDARD
                .decode(packed)
                .map_err(|e| LoadError::invalid(path, format!("bad base64 tile data: {e}")))?;
            if bytes.len() % 4 != 0 {
                return Err(LoadError::invalid(
                    path,
                    "base64 tile data is not a whole number of GIDs",
                ));
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|b| Gid(u32::from_le_bytes([b[0], b[1], b[2], b[3]])))
                .collect())
        }
        Some(other) => Err(LoadError::unsupported(
            path,
            format!("'{other}' tile encoding"),
        )),
    }
}

fn parse_gid(raw: &str, path: &Path) -> Result<Gid, LoadError> {
    raw.parse::<u32>()
        .map(Gid)
        .map_err(|_| LoadError::invalid(path, format!("invalid tile GID '{raw}'")))
}

fn parse_object(element: &XmlElement, path: &Path) -> Result<MapObject, LoadError> {
    let mut object = MapObject::new(
        optional(element, "id", path)?.unwrap_or(0),
        optional(element, "x", path)?.unwrap_or(0.0),
        optional(element, "y", path)?.unwrap_or(0.0),
    );
    object.name = element.attr("name").unwrap_or_default().to_string();
    object.class = element
        .attr("type")
        .or_else(|| element.attr("class"))
        .unwrap_or_default()
        .to_string();
    object.width = optional(element, "width", path)?;
    object.height = optional(element, "height", path)?;
    object.gid = optional(element, "gid", path)?.map(Gid);
    object.visible = element.attr("visible") != Some("0");
    object.properties = properties_of(element);
    Ok(object)
}

fn properties_of(element: &XmlElement) -> Properties {
    element
        .child("properties")
        .map(parse_properties)
        .unwrap_or_default()
}

/// Convert a `<properties>` element into typed values
pub fn parse_properties(element: &XmlElement) -> Properties {
    element
        .children_named("property")
        .filter_map(|property| {
            let name = property.attr("name")?;
            Some((name.to_string(), property_value(property)))
        })
        .collect()
}

fn property_value(property: &XmlElement) -> Value {
    let kind = property.attr("type").unwrap_or("string");
    if kind == "class" {
        return Value::Object(properties_of(property));
    }

    let raw = property
        .attr("value")
        .map(str::to_string)
        .unwrap_or_else(|| property.text.clone());
    match kind {
        "int" | "object" => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::String(raw)),
        "float" => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::String(raw)),
        "bool" => match raw.trim() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::String(raw),
        },
        _ => Value::String(raw),
    }
}

fn optional<T: FromStr>(
    element: &XmlElement,
    key: &str,
    path: &Path,
) -> Result<Option<T>, LoadError> {
    element
        .attr(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                LoadError::invalid(
                    path,
                    format!("<{}> has invalid {key}=\"{raw}\"", element.name),
                )
            })
        })
        .transpose()
}

fn required<T: FromStr>(element: &XmlElement, key: &str, path: &Path) -> Result<T, LoadError> {
    optional(element, key, path)?.ok_or_else(|| {
        LoadError::invalid(path, format!("<{}> is missing {key}", element.name))
    })
}
