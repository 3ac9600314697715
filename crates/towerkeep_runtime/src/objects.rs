//! Interpretation of map objects as teleports, bosses and NPCs

use crate::entities::{Boss, NpcSpawn, Teleport};
use thiserror::Error;
use towerkeep_core::{MapDocument, MapObject, PixelRect, Value};
use towerkeep_dialogue::{collect_numbered_lines, NpcRole};
use tracing::{error, info, warn};

/// What a map object stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Teleport,
    Boss,
    Npc(NpcRole),
    Unknown,
}

/// Substring rules for NPC tags, checked in order
const NPC_RULES: &[(&str, NpcRole)] = &[
    ("barman", NpcRole::Barman),
    ("merchant", NpcRole::Merchant),
    ("npc", NpcRole::Other),
];

/// Classify an object tag (case-insensitive)
pub fn classify(tag: &str) -> ObjectKind {
    let tag = tag.to_lowercase();
    match tag.as_str() {
        "teleport" => return ObjectKind::Teleport,
        "boss" => return ObjectKind::Boss,
        _ => {}
    }
    NPC_RULES
        .iter()
        .find(|(needle, _)| tag.contains(needle))
        .map(|(_, role)| ObjectKind::Npc(*role))
        .unwrap_or(ObjectKind::Unknown)
}

#[derive(Debug, Error, PartialEq)]
pub enum ObjectInterpretationError {
    #[error("object {id} ('{tag}') has non-finite geometry")]
    NonFiniteGeometry { id: u32, tag: String },
}

fn objects_of_kind(
    map: &MapDocument,
    predicate: impl Fn(ObjectKind) -> bool,
) -> impl Iterator<Item = (&MapObject, ObjectKind)> {
    map.objects()
        .map(|object| (object, classify(object.tag())))
        .filter(move |(_, kind)| predicate(*kind))
}

fn position(object: &MapObject) -> Result<(i32, i32), ObjectInterpretationError> {
    let finite = object.x.is_finite()
        && object.y.is_finite()
        && object.width.is_none_or(f32::is_finite)
        && object.height.is_none_or(f32::is_finite);
    if !finite {
        return Err(ObjectInterpretationError::NonFiniteGeometry {
            id: object.id,
            tag: object.tag().to_string(),
        });
    }
    Ok((object.x as i32, object.y as i32))
}

/// Extent in whole pixels; absent or zero becomes 1
fn extent(size: Option<f32>) -> i32 {
    match size.map(|s| s as i32) {
        Some(0) | None => 1,
        Some(size) => size,
    }
}

fn text_of(value: &Value) -> Option<String> {
    let text = match value.as_string() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Optional numeric property; a non-numeric value is dropped with a warning
fn coordinate(object: &MapObject, key: &str) -> Option<f64> {
    let value = object.property(key)?;
    if matches!(value, Value::Null) {
        return None;
    }
    let number = value.to_number();
    if number.is_none() {
        warn!(
            "Teleport {} has non-numeric {key} = '{value}', ignoring it",
            object.id
        );
    }
    number
}

pub fn build_teleports(map: &MapDocument) -> Result<Vec<Teleport>, ObjectInterpretationError> {
    objects_of_kind(map, |kind| kind == ObjectKind::Teleport)
        .map(|(object, _)| {
            let (x, y) = position(object)?;
            let destination = ["dest", "map", "destination"]
                .iter()
                .filter_map(|key| object.property(key))
                .find_map(text_of);
            Ok(Teleport {
                rect: PixelRect::new(x, y, extent(object.width), extent(object.height)),
                destination,
                dest_x: coordinate(object, "dest_x"),
                dest_y: coordinate(object, "dest_y"),
            })
        })
        .collect()
}

pub fn build_bosses(map: &MapDocument) -> Result<Vec<Boss>, ObjectInterpretationError> {
    objects_of_kind(map, |kind| kind == ObjectKind::Boss)
        .map(|(object, _)| {
            let (x, y) = position(object)?;
            info!("Found boss at ({x}, {y})");
            Ok(Boss::new(x, y, map.tile_width, map.tile_height))
        })
        .collect()
}

pub fn build_npcs(map: &MapDocument) -> Result<Vec<NpcSpawn>, ObjectInterpretationError> {
    objects_of_kind(map, |kind| matches!(kind, ObjectKind::Npc(_)))
        .map(|(object, kind)| {
            let (x, y) = position(object)?;
            let role = match kind {
                ObjectKind::Npc(role) => role,
                _ => NpcRole::Other,
            };
            let name = match role {
                NpcRole::Barman => "barman".to_string(),
                NpcRole::Merchant => "merchant".to_string(),
                NpcRole::Other => object.tag().to_string(),
            };
            let custom = collect_numbered_lines(&object.properties, "dialogue");
            let custom_dialogue = !custom.is_empty();
            let lines = if custom_dialogue {
                custom
            } else {
                role.default_lines()
            };
            info!("Found NPC '{name}' at ({x}, {y})");
            Ok(NpcSpawn {
                x,
                y,
                name,
                role,
                lines,
                custom_dialogue,
            })
        })
        .collect()
}

/// Log a failed category and continue with nothing
pub fn or_empty<T>(category: &str, result: Result<Vec<T>, ObjectInterpretationError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        error!("Error loading {category}: {e}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use towerkeep_core::Layer;

    fn map_with(objects: Vec<MapObject>) -> MapDocument {
        let mut map = MapDocument::new("test.tmx", 10, 10, 32, 32);
        map.layers = vec![Layer::new_object_layer("objects", objects)];
        map
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Teleport"), ObjectKind::Teleport);
        assert_eq!(classify("BOSS"), ObjectKind::Boss);
        assert_eq!(classify("boss_npc"), ObjectKind::Npc(NpcRole::Other));
        assert_eq!(classify("old_Barman"), ObjectKind::Npc(NpcRole::Barman));
        assert_eq!(classify("merchant_npc"), ObjectKind::Npc(NpcRole::Merchant));
        assert_eq!(classify("barman_merchant"), ObjectKind::Npc(NpcRole::Barman));
        assert_eq!(classify("teleporter"), ObjectKind::Unknown);
        assert_eq!(classify(""), ObjectKind::Unknown);
    }

    #[test]
    fn test_teleport_without_size() {
        let map = map_with(vec![MapObject::new(1, 40.7, 12.2)
            .with_class("teleport")
            .with_property("dest", "level2")]);
        let teleports = build_teleports(&map).unwrap();
        assert_eq!(teleports.len(), 1);
        assert_eq!(teleports[0].rect, PixelRect::new(40, 12, 1, 1));
        assert_eq!(teleports[0].destination.as_deref(), Some("level2"));
        assert_eq!(teleports[0].dest_x, None);
    }

    #[test]
    fn test_teleport_destination_fallbacks() {
        let map = map_with(vec![
            MapObject::new(1, 0.0, 0.0)
                .with_name("teleport")
                .with_size(0.0, 48.0)
                .with_property("dest", "")
                .with_property("map", "cave")
                .with_property("destination", "ignored"),
            MapObject::new(2, 0.0, 0.0)
                .with_class("teleport")
                .with_property("destination", "tower"),
            MapObject::new(3, 0.0, 0.0).with_class("teleport"),
        ]);
        let teleports = build_teleports(&map).unwrap();
        assert_eq!(teleports[0].destination.as_deref(), Some("cave"));
        assert_eq!(teleports[0].rect, PixelRect::new(0, 0, 1, 48));
        assert_eq!(teleports[1].destination.as_deref(), Some("tower"));
        assert_eq!(teleports[2].destination, None);
    }

    #[test]
    fn test_teleport_coordinates() {
        let map = map_with(vec![MapObject::new(1, 0.0, 0.0)
            .with_class("teleport")
            .with_property("dest_x", 12)
            .with_property("dest_y", "7.5")]);
        let teleports = build_teleports(&map).unwrap();
        assert_eq!(teleports[0].dest_x, Some(12.0));
        assert_eq!(teleports[0].dest_y, Some(7.5));
    }

    #[test]
    fn test_bad_coordinate_keeps_teleport() {
        let map = map_with(vec![
            MapObject::new(1, 0.0, 0.0)
                .with_class("teleport")
                .with_property("dest", "cave"),
            MapObject::new(2, 32.0, 0.0)
                .with_class("teleport")
                .with_property("dest", "town")
                .with_property("dest_x", "spawn")
                .with_property("dest_y", 40),
        ]);
        let teleports = or_empty("teleports", build_teleports(&map));
        assert_eq!(teleports.len(), 2);
        assert_eq!(teleports[1].destination.as_deref(), Some("town"));
        assert_eq!(teleports[1].dest_x, None);
        assert_eq!(teleports[1].dest_y, Some(40.0));
    }

    #[test]
    fn test_unusable_object_fails_only_its_category() {
        let map = map_with(vec![
            MapObject::new(4, f32::INFINITY, 0.0).with_class("teleport"),
            MapObject::new(5, 64.0, 64.0).with_class("boss"),
        ]);
        assert!(or_empty("teleports", build_teleports(&map)).is_empty());
        assert_eq!(build_bosses(&map).unwrap().len(), 1);
    }

    #[test]
    fn test_non_finite_geometry() {
        let map = map_with(vec![MapObject::new(9, f32::NAN, 0.0).with_class("boss")]);
        assert!(matches!(
            build_bosses(&map),
            Err(ObjectInterpretationError::NonFiniteGeometry { id: 9, .. })
        ));
    }

    #[test]
    fn test_boss_uses_map_tile_size() {
        let map = map_with(vec![MapObject::new(1, 96.9, 64.0).with_name("Boss")]);
        let bosses = build_bosses(&map).unwrap();
        assert_eq!(bosses, vec![Boss::new(96, 64, 32, 32)]);
    }

    #[test]
    fn test_npc_names_and_dialogue() {
        let map = map_with(vec![
            MapObject::new(1, 10.0, 20.0)
                .with_class("Barman_NPC")
                .with_property("dialogue1", "Hi")
                .with_property("dialogue2", "Bye")
                .with_property("dialogue4", "Skipped"),
            MapObject::new(2, 0.0, 0.0).with_class("traveling_merchant"),
            MapObject::new(3, 0.0, 0.0).with_name("Old_NPC"),
            MapObject::new(4, 0.0, 0.0).with_class("chest"),
        ]);
        let npcs = build_npcs(&map).unwrap();
        assert_eq!(npcs.len(), 3);

        assert_eq!(npcs[0].name, "barman");
        assert_eq!(npcs[0].lines, vec!["Hi", "Bye"]);
        assert!(npcs[0].custom_dialogue);
        assert_eq!((npcs[0].x, npcs[0].y), (10, 20));

        assert_eq!(npcs[1].name, "merchant");
        assert_eq!(npcs[1].lines, NpcRole::Merchant.default_lines());
        assert!(!npcs[1].custom_dialogue);

        assert_eq!(npcs[2].name, "Old_NPC");
        assert_eq!(npcs[2].role, NpcRole::Other);
    }
}
