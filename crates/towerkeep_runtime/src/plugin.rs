//! Bevy integration: background map loading, scene spawning and camera follow
//!
//! Maps are loaded on a worker thread. The finished [`MapWorld`] comes back
//! over a channel and is inserted as a resource, then its tiles and entities
//! are spawned as sprites. Map coordinates are y-down pixels; world
//! coordinates flip y.

use crate::camera::MapCamera;
use crate::entities::ElementType;
use crate::towers::FsProbe;
use crate::world::{MapWorld, MapWorldOptions, TileImage, TileSurface};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use crossbeam_channel::{Receiver, TryRecvError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use towerkeep_core::PixelRect;
use towerkeep_dialogue::NpcDialogue;
use towerkeep_loader::LoadError;

/// Z of the first tile; later tiles stack slightly above earlier ones
const TILE_Z: f32 = 0.0;
const TILE_Z_STEP: f32 = 0.0001;
const ENTITY_Z: f32 = 10.0;

#[derive(Resource, Debug, Clone, Default)]
pub struct MapWorldSettings {
    pub options: MapWorldOptions,
    /// Map requested at startup
    pub start: Option<PathBuf>,
}

/// Ask for a map to be loaded, replacing the current one when ready
#[derive(Message, Debug, Clone)]
pub struct LoadMapRequest {
    pub path: PathBuf,
}

/// Sent once a requested map has loaded
#[derive(Message, Debug, Clone)]
pub struct MapReady {
    pub path: PathBuf,
}

#[derive(Message, Debug, Clone)]
pub struct MapLoadFailed {
    pub path: PathBuf,
    pub message: String,
}

/// What the camera keeps centered, in map pixels
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct CameraFocus(pub PixelRect);

/// Marker for everything spawned from the current map
#[derive(Component, Debug, Clone, Copy)]
pub struct MapScene;

#[derive(Component, Debug, Clone, Copy)]
pub struct MapTile;

/// A load running on the worker thread
#[derive(Resource)]
pub struct PendingMapLoad {
    pub path: PathBuf,
    pub receiver: Receiver<Result<MapWorld, LoadError>>,
}

/// Plugin for map loading and display
pub struct MapWorldPlugin {
    pub settings: MapWorldSettings,
}

impl Plugin for MapWorldPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .init_resource::<CameraFocus>()
            .add_message::<LoadMapRequest>()
            .add_message::<MapReady>()
            .add_message::<MapLoadFailed>()
            .add_systems(Startup, request_start_map)
            .add_systems(
                Update,
                (
                    start_map_loads,
                    receive_loaded_map,
                    spawn_map_scene,
                    follow_focus,
                )
                    .chain(),
            );
    }
}

fn request_start_map(settings: Res<MapWorldSettings>, mut requests: MessageWriter<LoadMapRequest>) {
    if let Some(path) = &settings.start {
        requests.write(LoadMapRequest { path: path.clone() });
    }
}

/// Start a worker thread for the latest request
fn start_map_loads(
    mut commands: Commands,
    mut requests: MessageReader<LoadMapRequest>,
    settings: Res<MapWorldSettings>,
) {
    let Some(request) = requests.read().last() else {
        return;
    };

    info!("Loading map {}", request.path.display());
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let path = request.path.clone();
    let options = settings.options.clone();
    std::thread::spawn(move || {
        let result = MapWorld::load(&path, &options, &FsProbe);
        // the receiver is gone if a newer request replaced this one
        let _ = sender.send(result);
    });

    commands.insert_resource(PendingMapLoad {
        path: request.path.clone(),
        receiver,
    });
}

/// Hand a finished load over to the main world
fn receive_loaded_map(
    mut commands: Commands,
    pending: Option<Res<PendingMapLoad>>,
    mut ready: MessageWriter<MapReady>,
    mut failed: MessageWriter<MapLoadFailed>,
) {
    let Some(pending) = pending else {
        return;
    };

    let result = match pending.receiver.try_recv() {
        Ok(result) => result,
        Err(TryRecvError::Empty) => return,
        Err(TryRecvError::Disconnected) => {
            error!("Map loader for {} stopped without a result", pending.path.display());
            commands.remove_resource::<PendingMapLoad>();
            return;
        }
    };
    commands.remove_resource::<PendingMapLoad>();

    match result {
        Ok(world) => {
            if let Some(report) = world.repair() {
                warn!(
                    "{} was repaired into {}",
                    report.original.display(),
                    report.fixed_map.display()
                );
            }
            commands.insert_resource(world);
            ready.write(MapReady {
                path: pending.path.clone(),
            });
        }
        Err(e) => {
            error!("Failed to load map {}: {e}", pending.path.display());
            failed.write(MapLoadFailed {
                path: pending.path.clone(),
                message: e.to_string(),
            });
        }
    }
}

/// Turn a map path into an asset path the default asset source accepts
fn asset_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Map pixel rect to a world-space center
fn world_center(rect: &PixelRect, z: f32) -> Transform {
    Transform::from_xyz(
        rect.x as f32 + rect.width as f32 / 2.0,
        -(rect.y as f32 + rect.height as f32 / 2.0),
        z,
    )
}

/// Draws tiles by spawning one sprite per blit
struct SpriteSurface<'w, 's, 'a> {
    commands: &'a mut Commands<'w, 's>,
    asset_server: &'a AssetServer,
    images: HashMap<PathBuf, Handle<Image>>,
    z: f32,
}

impl TileSurface for SpriteSurface<'_, '_, '_> {
    fn blit(&mut self, tile: &TileImage<'_>, x: i32, y: i32) {
        let server = self.asset_server;
        let image = self
            .images
            .entry(tile.image.to_path_buf())
            .or_insert_with(|| server.load(asset_path(tile.image)))
            .clone();
        let source = tile.source;
        let rect = Rect::new(
            source.x as f32,
            source.y as f32,
            source.right() as f32,
            source.bottom() as f32,
        );
        let screen = PixelRect::new(x, y, source.width, source.height);

        self.commands.spawn((
            MapScene,
            MapTile,
            Sprite {
                image,
                rect: Some(rect),
                flip_x: tile.flip_x,
                flip_y: tile.flip_y,
                ..default()
            },
            world_center(&screen, self.z),
        ));
        self.z += TILE_Z_STEP;
    }
}

fn marker_sprite(color: Color, width: f32, height: f32) -> Sprite {
    Sprite {
        color,
        custom_size: Some(Vec2::new(width, height)),
        ..default()
    }
}

/// Replace the spawned scene with the newly loaded map
fn spawn_map_scene(
    mut commands: Commands,
    mut ready: MessageReader<MapReady>,
    world: Option<Res<MapWorld>>,
    settings: Res<MapWorldSettings>,
    asset_server: Res<AssetServer>,
    existing: Query<Entity, With<MapScene>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    if ready.read().last().is_none() {
        return;
    }
    let Some(world) = world else {
        return;
    };

    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let mut surface = SpriteSurface {
        commands: &mut commands,
        asset_server: &asset_server,
        images: HashMap::new(),
        z: TILE_Z,
    };
    world.draw(&mut surface, 0, 0);

    let (tile_width, tile_height) = world.tile_size();
    let tile = Vec2::new(tile_width as f32, tile_height as f32);

    for teleport in world.teleports() {
        commands.spawn((
            MapScene,
            teleport.clone(),
            Name::new("Teleport"),
            marker_sprite(
                Color::srgba(0.6, 0.2, 0.9, 0.4),
                teleport.rect.width as f32,
                teleport.rect.height as f32,
            ),
            world_center(&teleport.rect, ENTITY_Z),
        ));
    }

    for boss in world.bosses() {
        let rect = PixelRect::new(boss.x, boss.y, tile_width as i32, tile_height as i32);
        commands.spawn((
            MapScene,
            boss.clone(),
            Name::new("Boss"),
            marker_sprite(Color::srgba(0.9, 0.1, 0.1, 0.9), tile.x, tile.y),
            world_center(&rect, ENTITY_Z),
        ));
    }

    for npc in world.npcs() {
        let rect = PixelRect::new(npc.x, npc.y, tile_width as i32, tile_height as i32);
        commands.spawn((
            MapScene,
            npc.clone(),
            NpcDialogue {
                lines: npc.lines.clone(),
            },
            Name::new(npc.name.clone()),
            marker_sprite(Color::srgba(0.2, 0.8, 0.3, 0.9), tile.x, tile.y),
            world_center(&rect, ENTITY_Z),
        ));
    }

    let tower_dir = &settings.options.towers.image_dir;
    for tower in world.towers() {
        let size = Vec2::new(tower.rect.width as f32, tower.rect.height as f32);
        let sprite = if tower.art_available {
            Sprite {
                image: asset_server
                    .load(asset_path(&tower_dir.join(tower.element.art_file_name()))),
                custom_size: Some(size),
                ..default()
            }
        } else {
            marker_sprite(element_color(tower.element), size.x, size.y)
        };
        commands.spawn((
            MapScene,
            tower.clone(),
            Name::new(format!("{} tower", tower.element)),
            sprite,
            world_center(&tower.rect, ENTITY_Z),
        ));
    }

    let (map_width, map_height) = world.pixel_size();
    let (screen_width, screen_height) = windows
        .single()
        .map(|w| (w.width() as i32, w.height() as i32))
        .unwrap_or((map_width as i32, map_height as i32));
    commands.insert_resource(MapCamera::new(
        screen_width,
        screen_height,
        map_width as i32,
        map_height as i32,
    ));
}

fn element_color(element: ElementType) -> Color {
    match element {
        ElementType::Fire => Color::srgb(0.9, 0.4, 0.1),
        ElementType::Water => Color::srgb(0.2, 0.4, 0.9),
        ElementType::Void => Color::srgb(0.3, 0.1, 0.4),
        ElementType::Ice => Color::srgb(0.7, 0.9, 1.0),
        ElementType::Lightning => Color::srgb(1.0, 0.9, 0.2),
        ElementType::Holy => Color::srgb(1.0, 1.0, 0.8),
    }
}

/// Keep the view centered on the focus and inside the map
fn follow_focus(
    focus: Res<CameraFocus>,
    camera: Option<ResMut<MapCamera>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
    let Some(mut camera) = camera else {
        return;
    };
    if let Ok(window) = windows.single() {
        camera.update_screen_size(window.width() as i32, window.height() as i32);
    }
    camera.follow(focus.0);

    let (screen_width, screen_height) = camera.screen_size();
    for mut transform in &mut cameras {
        transform.translation.x = camera.x as f32 + screen_width as f32 / 2.0;
        transform.translation.y = -(camera.y as f32 + screen_height as f32 / 2.0);
    }
}

/// Map pixel rect covered by a sized sprite placed at its world center
pub fn entity_rect(transform: &Transform, sprite: &Sprite) -> Option<PixelRect> {
    let size = sprite.custom_size?;
    Some(PixelRect::new(
        (transform.translation.x - size.x / 2.0) as i32,
        (-transform.translation.y - size.y / 2.0) as i32,
        size.x as i32,
        size.y as i32,
    ))
}
