//! Map file on disk through repair to an assembled world

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use towerkeep_core::PixelRect;
use towerkeep_runtime::{
    ElementType, FsProbe, MapWorld, MapWorldOptions, NpcSpawn, TowerOptions,
};

const SIZE: u32 = 20;

fn csv(cells: &[(u32, u32)]) -> String {
    (0..SIZE)
        .map(|row| {
            (0..SIZE)
                .map(|column| {
                    if cells.contains(&(column, row)) {
                        "1"
                    } else {
                        "0"
                    }
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn map_xml() -> String {
    let ground: Vec<_> = (0..SIZE)
        .flat_map(|row| (0..SIZE).map(move |column| (column, row)))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="{SIZE}" height="{SIZE}" tilewidth="32" tileheight="32">
 <tileset firstgid="1" source="/gone/elsewhere/keep.tsx"/>
 <layer id="1" name="ground" width="{SIZE}" height="{SIZE}">
  <data encoding="csv">
{ground}
</data>
 </layer>
 <layer id="2" name="Collision" width="{SIZE}" height="{SIZE}">
  <properties>
   <property name="blocked" type="bool" value="true"/>
  </properties>
  <data encoding="csv">
{collision}
</data>
 </layer>
 <objectgroup id="3" name="objects">
  <object id="1" type="teleport" x="40" y="50">
   <properties>
    <property name="dest" value="level2"/>
   </properties>
  </object>
  <object id="2" name="boss" x="320" y="320"/>
  <object id="3" type="merchant" x="100.5" y="200">
   <properties>
    <property name="dialogue1" value="Hi"/>
    <property name="dialogue2" value="Bye"/>
    <property name="dialogue4" value="Skipped"/>
   </properties>
  </object>
 </objectgroup>
</map>
"#,
        ground = csv(&ground),
        collision = csv(&[(2, 3), (6, 6)]),
    )
}

fn files(dir: &Path) -> BTreeSet<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[test]
fn test_broken_map_repairs_and_builds_world() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("winter_keep.tmx");
    fs::write(&map_path, map_xml()).unwrap();
    let art = dir.path().join("art");
    fs::create_dir(&art).unwrap();
    fs::write(art.join("tower_ice.png"), b"png").unwrap();

    let options = MapWorldOptions {
        towers: TowerOptions {
            image_dir: art,
            require_art: false,
        },
        ..Default::default()
    };
    let world = MapWorld::load(&map_path, &options, &FsProbe).unwrap();

    let report = world.repair().expect("map should have been repaired");
    assert_eq!(report.fixed_map, dir.path().join("winter_keep_fixed.tmx"));
    assert!(report.fixed_map.is_file());
    assert!(dir.path().join("keep.tsx").is_file());
    assert!(dir.path().join("keep.png").is_file());
    assert!(!report.is_degraded());

    assert_eq!(world.tile_size(), (32, 32));
    assert_eq!(world.grid_size(), (SIZE, SIZE));
    assert_eq!(
        world.collisions(),
        &[PixelRect::new(64, 96, 32, 32), PixelRect::new(192, 192, 32, 32)]
    );

    let teleports = world.teleports();
    assert_eq!(teleports.len(), 1);
    assert_eq!(teleports[0].rect, PixelRect::new(40, 50, 1, 1));
    assert_eq!(teleports[0].destination.as_deref(), Some("level2"));

    assert_eq!(world.bosses().len(), 1);
    assert_eq!((world.bosses()[0].x, world.bosses()[0].y), (320, 320));

    let npcs: &[NpcSpawn] = world.npcs();
    assert_eq!(npcs.len(), 1);
    assert_eq!(npcs[0].name, "merchant");
    assert_eq!(npcs[0].lines, vec!["Hi", "Bye"]);
    assert_eq!((npcs[0].x, npcs[0].y), (100, 200));

    // the ice tower at (5, 5) overlaps the collision cell at (6, 6)
    let towers: Vec<_> = world
        .towers()
        .iter()
        .map(|t| (t.element, t.column, t.row, t.art_available))
        .collect();
    assert_eq!(
        towers,
        vec![
            (ElementType::Ice, 12, 5, true),
            (ElementType::Water, 5, 12, false),
            (ElementType::Water, 12, 12, false),
        ]
    );
}

#[test]
fn test_repaired_map_loads_identically_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("winter_keep.tmx");
    fs::write(&map_path, map_xml()).unwrap();
    let options = MapWorldOptions::default();

    let first = MapWorld::load(&map_path, &options, &FsProbe).unwrap();
    let fixed = first.repair().unwrap().fixed_map.clone();
    let after_repair = files(dir.path());

    let second = MapWorld::load(&fixed, &options, &FsProbe).unwrap();
    let third = MapWorld::load(&fixed, &options, &FsProbe).unwrap();
    assert!(second.repair().is_none());
    assert!(third.repair().is_none());
    assert_eq!(files(dir.path()), after_repair);

    for world in [&second, &third] {
        assert_eq!(world.collisions(), first.collisions());
        assert_eq!(world.teleports(), first.teleports());
        assert_eq!(world.bosses(), first.bosses());
        assert_eq!(world.towers(), first.towers());
        assert_eq!(world.npcs(), first.npcs());
    }
}

#[test]
fn test_valid_map_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("meadow.tmx");
    let xml = map_xml().replace("/gone/elsewhere/keep.tsx", "keep.tsx");
    fs::write(&map_path, xml).unwrap();
    fs::write(
        dir.path().join("keep.tsx"),
        r#"<tileset name="keep" tilewidth="32" tileheight="32" tilecount="1" columns="1"/>"#,
    )
    .unwrap();

    let world = MapWorld::load(&map_path, &MapWorldOptions::default(), &FsProbe).unwrap();
    assert!(world.repair().is_none());
    assert!(!dir.path().join("meadow_fixed.tmx").exists());
    assert_eq!(world.summary().collisions, 2);
}
