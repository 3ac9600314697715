//! Player movement, teleports and NPC conversations

use bevy::prelude::*;
use std::path::{Path, PathBuf};
use towerkeep_core::PixelRect;
use towerkeep_dialogue::{AdvanceDialogue, DialogueRunner, NpcDialogue, StartDialogue};
use towerkeep_runtime::{
    entity_rect, CameraFocus, LoadMapRequest, MapReady, MapWorld, NpcSpawn, PendingMapLoad,
};

/// Player speed in pixels per second
const PLAYER_SPEED: f32 = 160.0;
/// How close the player must be to talk, in tiles
const TALK_RANGE_TILES: f32 = 1.5;
const PLAYER_Z: f32 = 20.0;

/// Name the player was launched with
#[derive(Resource, Debug, Clone)]
pub struct PlayerName(pub String);

#[derive(Resource, Debug, Clone, Default)]
pub struct Player {
    /// Position and size in map pixels
    pub rect: PixelRect,
    /// Whether the player stood on a teleport last frame
    on_teleport: bool,
    /// Where to appear on the next map
    spawn: Option<(f64, f64)>,
    /// Movement not yet applied because it is less than a pixel
    carry: Vec2,
}

#[derive(Component)]
struct PlayerMarker;

pub struct GamePlugin {
    pub player_name: String,
}

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(PlayerName(self.player_name.clone()))
            .init_resource::<Player>()
            .add_systems(Startup, setup)
            .add_systems(
                Update,
                (
                    place_player,
                    move_player,
                    check_teleports,
                    talk_to_npcs,
                    advance_dialogue,
                    sync_player_sprite,
                )
                    .chain(),
            );
    }
}

fn setup(mut commands: Commands, name: Res<PlayerName>) {
    info!("Welcome, {}", name.0);
    commands.spawn(Camera2d);
    commands.spawn((
        PlayerMarker,
        Name::new(name.0.clone()),
        Sprite {
            color: Color::srgb(0.3, 0.6, 1.0),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, PLAYER_Z),
    ));
}

/// Path of a teleport destination, relative to the current map
pub fn resolve_destination(current_map: &Path, destination: &str) -> PathBuf {
    let dir = current_map.parent().unwrap_or_else(|| Path::new(""));
    let mut path = dir.join(destination);
    if path.extension().is_none() {
        path.set_extension("tmx");
    }
    path
}

/// Add `delta` to `carry` and take out the whole pixels
pub fn whole_pixels(carry: &mut Vec2, delta: Vec2) -> (i32, i32) {
    *carry += delta;
    let whole = carry.trunc();
    *carry -= whole;
    (whole.x as i32, whole.y as i32)
}

/// Move `rect` one axis at a time, refusing steps that leave the map or
/// hit something blocked
pub fn step(
    rect: PixelRect,
    dx: i32,
    dy: i32,
    bounds: (i32, i32),
    blocked: impl Fn(&PixelRect) -> bool,
) -> PixelRect {
    let allowed = |candidate: &PixelRect| {
        candidate.x >= 0
            && candidate.y >= 0
            && candidate.right() <= bounds.0
            && candidate.bottom() <= bounds.1
            && !blocked(candidate)
    };

    let mut rect = rect;
    for (mx, my) in [(dx, 0), (0, dy)] {
        if mx == 0 && my == 0 {
            continue;
        }
        let moved = rect.translated(mx, my);
        if allowed(&moved) {
            rect = moved;
        }
    }
    rect
}

/// Put the player on a freshly loaded map
fn place_player(
    mut ready: MessageReader<MapReady>,
    world: Option<Res<MapWorld>>,
    mut player: ResMut<Player>,
    mut focus: ResMut<CameraFocus>,
) {
    if ready.read().last().is_none() {
        return;
    }
    let Some(world) = world else {
        return;
    };

    let (tile_width, tile_height) = world.tile_size();
    let (map_width, map_height) = world.pixel_size();
    let (x, y) = player
        .spawn
        .take()
        .map(|(x, y)| (x as i32, y as i32))
        .unwrap_or((map_width as i32 / 2, map_height as i32 / 2));
    player.rect = PixelRect::new(x, y, tile_width as i32, tile_height as i32);
    player.carry = Vec2::ZERO;
    player.on_teleport = world.teleport_at(&player.rect).is_some();
    focus.0 = player.rect;
}

fn move_player(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    world: Option<Res<MapWorld>>,
    runner: Res<DialogueRunner>,
    mut player: ResMut<Player>,
    mut focus: ResMut<CameraFocus>,
) {
    let Some(world) = world else {
        return;
    };
    if runner.is_active() {
        return;
    }

    let mut direction = Vec2::ZERO;
    if keys.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]) {
        direction.y -= 1.0;
    }
    if keys.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]) {
        direction.y += 1.0;
    }
    if keys.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]) {
        direction.x -= 1.0;
    }
    if keys.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]) {
        direction.x += 1.0;
    }
    if direction == Vec2::ZERO {
        player.carry = Vec2::ZERO;
        return;
    }

    let delta = direction.normalize() * PLAYER_SPEED * time.delta_secs();
    let (dx, dy) = whole_pixels(&mut player.carry, delta);
    let (map_width, map_height) = world.pixel_size();
    player.rect = step(
        player.rect,
        dx,
        dy,
        (map_width as i32, map_height as i32),
        |rect| world.is_blocked(rect),
    );
    focus.0 = player.rect;
}

/// Request the destination map when the player steps onto a teleport
fn check_teleports(
    world: Option<Res<MapWorld>>,
    pending: Option<Res<PendingMapLoad>>,
    mut player: ResMut<Player>,
    mut requests: MessageWriter<LoadMapRequest>,
) {
    let Some(world) = world else {
        return;
    };
    let teleport = world.teleport_at(&player.rect);
    let entered = teleport.is_some() && !player.on_teleport;
    player.on_teleport = teleport.is_some();
    if !entered || pending.is_some() {
        return;
    }
    let Some(teleport) = teleport else {
        return;
    };
    let Some(destination) = &teleport.destination else {
        debug!("Teleport at {:?} has no destination", teleport.rect);
        return;
    };

    let path = resolve_destination(&world.document().path, destination);
    info!("Teleporting to {}", path.display());
    player.spawn = teleport.dest_x.zip(teleport.dest_y);
    requests.write(LoadMapRequest { path });
}

fn talk_to_npcs(
    keys: Res<ButtonInput<KeyCode>>,
    runner: Res<DialogueRunner>,
    player: Res<Player>,
    world: Option<Res<MapWorld>>,
    npcs: Query<(Entity, &NpcDialogue, &Transform, &Sprite), With<NpcSpawn>>,
    mut start: MessageWriter<StartDialogue>,
) {
    if !keys.just_pressed(KeyCode::KeyE) || runner.is_active() {
        return;
    }
    let Some(world) = world else {
        return;
    };

    let (tile_width, _) = world.tile_size();
    let range = TALK_RANGE_TILES * tile_width as f32;
    let center = |rect: &PixelRect| {
        Vec2::new(
            rect.x as f32 + rect.width as f32 / 2.0,
            rect.y as f32 + rect.height as f32 / 2.0,
        )
    };
    let here = center(&player.rect);

    let nearest = npcs
        .iter()
        .filter_map(|(entity, dialogue, transform, sprite)| {
            let rect = entity_rect(transform, sprite)?;
            Some((entity, dialogue, center(&rect).distance(here)))
        })
        .filter(|(_, _, distance)| *distance <= range)
        .min_by(|a, b| a.2.total_cmp(&b.2));

    if let Some((speaker, dialogue, _)) = nearest {
        start.write(StartDialogue {
            speaker,
            lines: dialogue.lines.clone(),
        });
    }
}

fn advance_dialogue(
    keys: Res<ButtonInput<KeyCode>>,
    runner: Res<DialogueRunner>,
    mut advance: MessageWriter<AdvanceDialogue>,
) {
    if keys.just_pressed(KeyCode::Space) && runner.is_active() {
        advance.write(AdvanceDialogue);
    }
}

fn sync_player_sprite(
    player: Res<Player>,
    mut query: Query<(&mut Transform, &mut Sprite), With<PlayerMarker>>,
) {
    let rect = player.rect;
    for (mut transform, mut sprite) in &mut query {
        sprite.custom_size = Some(Vec2::new(rect.width as f32, rect.height as f32));
        transform.translation.x = rect.x as f32 + rect.width as f32 / 2.0;
        transform.translation.y = -(rect.y as f32 + rect.height as f32 / 2.0);
    }
}
