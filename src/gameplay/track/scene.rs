use super::{Barrier, LoopTrack, StraightTrack, TrackBehavior, TrackGate, TrackShape};
use crate::gameplay::session::SimulationSession;
use crate::states::GameState;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

const LINE_HEIGHT: f32 = 0.02;
const LINE_DEPTH: f32 = 1.0;
const WALL_HEIGHT: f32 = 1.0;
const WALL_THICKNESS: f32 = 0.5;
const BARRIER_HEIGHT: f32 = 1.2;
const GROUND_MARGIN: f32 = 40.0;
const ANNULUS_RESOLUTION: u32 = 256;

pub(super) struct TrackScenePlugin;

impl Plugin for TrackScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRace), spawn_track_scene)
            .add_systems(OnExit(GameState::InRace), cleanup_track_scene);
    }
}

#[derive(Component)]
struct TrackVisual;

struct TrackPalette {
    grass: Handle<StandardMaterial>,
    road: Handle<StandardMaterial>,
    start_line: Handle<StandardMaterial>,
    finish_line: Handle<StandardMaterial>,
    wall: Handle<StandardMaterial>,
}

impl TrackPalette {
    fn new(materials: &mut Assets<StandardMaterial>) -> Self {
        let mut unlit = |color: Color| {
            materials.add(StandardMaterial {
                base_color: color,
                unlit: true,
                ..default()
            })
        };
        Self {
            grass: unlit(Color::srgb(0.13, 0.55, 0.13)),
            road: unlit(Color::srgb(0.2, 0.2, 0.2)),
            start_line: unlit(Color::WHITE),
            finish_line: unlit(Color::srgb(1.0, 0.85, 0.0)),
            wall: unlit(Color::srgb(0.8, 0.8, 0.8)),
        }
    }
}

fn spawn_track_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    session: Option<Res<SimulationSession>>,
    existing: Query<Entity, With<TrackVisual>>,
) {
    let Some(session) = session else {
        return;
    };
    if !existing.is_empty() {
        return;
    }

    let palette = TrackPalette::new(&mut materials);
    let root = commands
        .spawn((
            Name::new(format!("Track:{}", session.track.id)),
            TrackVisual,
            Transform::default(),
            Visibility::Inherited,
        ))
        .id();

    match &session.track.shape {
        TrackShape::Straight(track) => {
            spawn_straight_track(&mut commands, root, &mut meshes, &palette, track)
        }
        TrackShape::Loop(track) => {
            spawn_loop_track(&mut commands, root, &mut meshes, &palette, track)
        }
    }

    info!("Spawned scene for track `{}`.", session.track.id);
}

fn spawn_straight_track(
    commands: &mut Commands,
    root: Entity,
    meshes: &mut Assets<Mesh>,
    palette: &TrackPalette,
    track: &StraightTrack,
) {
    let width = track.right - track.left;
    let length = track.bottom - track.top;
    let center_x = (track.left + track.right) * 0.5;
    let center_z = (track.top + track.bottom) * 0.5;

    let grass = meshes.add(Plane3d::default().mesh().size(
        width + GROUND_MARGIN * 2.0,
        length + GROUND_MARGIN * 2.0,
    ));
    let road = meshes.add(Plane3d::default().mesh().size(width, length));
    let line = meshes.add(Cuboid::new(width, LINE_HEIGHT, LINE_DEPTH));
    let side_wall = meshes.add(Cuboid::new(WALL_THICKNESS, WALL_HEIGHT, length));

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(grass),
            MeshMaterial3d(palette.grass.clone()),
            Transform::from_xyz(center_x, -0.02, center_z),
        ));
        parent.spawn((
            Mesh3d(road),
            MeshMaterial3d(palette.road.clone()),
            Transform::from_xyz(center_x, 0.0, center_z),
        ));
        parent.spawn((
            Name::new("StartLine"),
            Mesh3d(line.clone()),
            MeshMaterial3d(palette.start_line.clone()),
            Transform::from_xyz(center_x, LINE_HEIGHT, track.start_line_z),
        ));
        parent.spawn((
            Name::new("FinishLine"),
            Mesh3d(line),
            MeshMaterial3d(palette.finish_line.clone()),
            Transform::from_xyz(center_x, LINE_HEIGHT, track.finish_z),
        ));
        for x in [track.left - WALL_THICKNESS * 0.5, track.right + WALL_THICKNESS * 0.5] {
            parent.spawn((
                Mesh3d(side_wall.clone()),
                MeshMaterial3d(palette.wall.clone()),
                Transform::from_xyz(x, WALL_HEIGHT * 0.5, center_z),
            ));
        }
    });
}

fn spawn_loop_track(
    commands: &mut Commands,
    root: Entity,
    meshes: &mut Assets<Mesh>,
    palette: &TrackPalette,
    track: &LoopTrack,
) {
    let ground_radius = track.outer_radius + GROUND_MARGIN;
    let grass = meshes.add(
        Circle::new(ground_radius)
            .mesh()
            .resolution(ANNULUS_RESOLUTION),
    );
    let road = meshes.add(
        Annulus::new(track.inner_radius, track.outer_radius)
            .mesh()
            .resolution(ANNULUS_RESOLUTION),
    );
    let center = Vec3::new(track.center.x, 0.0, track.center.y);
    let lay_flat = Quat::from_rotation_x(-FRAC_PI_2);

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(grass),
            MeshMaterial3d(palette.grass.clone()),
            Transform::from_translation(center - Vec3::Y * 0.02).with_rotation(lay_flat),
        ));
        parent.spawn((
            Mesh3d(road),
            MeshMaterial3d(palette.road.clone()),
            Transform::from_translation(center).with_rotation(lay_flat),
        ));

        for (name, gate, material) in [
            ("StartLine", &track.start_line, &palette.start_line),
            ("FinishLine", &track.finish_line, &palette.finish_line),
        ] {
            parent.spawn((
                Name::new(name),
                Mesh3d(meshes.add(gate_mesh(gate))),
                MeshMaterial3d(material.clone()),
                gate_transform(gate.position + Vec3::Y * LINE_HEIGHT, gate.forward),
            ));
        }

        for barrier in track.barriers() {
            parent.spawn((
                Name::new("Barrier"),
                Mesh3d(meshes.add(barrier_mesh(barrier))),
                MeshMaterial3d(palette.wall.clone()),
                gate_transform(
                    barrier.position + Vec3::Y * BARRIER_HEIGHT * 0.5,
                    barrier.forward,
                ),
            ));
        }
    });
}

fn gate_mesh(gate: &TrackGate) -> Cuboid {
    Cuboid::new(gate.half_width * 2.0, LINE_HEIGHT, LINE_DEPTH)
}

fn barrier_mesh(barrier: &Barrier) -> Cuboid {
    Cuboid::new(barrier.half_width * 2.0, BARRIER_HEIGHT, barrier.thickness)
}

/// Local -Z along `forward`, so a cuboid's X extent spans the track width.
fn gate_transform(position: Vec3, forward: Vec3) -> Transform {
    Transform::from_translation(position).looking_to(forward, Vec3::Y)
}

fn cleanup_track_scene(mut commands: Commands, visuals: Query<Entity, With<TrackVisual>>) {
    for entity in &visuals {
        commands.entity(entity).try_despawn();
    }
}
