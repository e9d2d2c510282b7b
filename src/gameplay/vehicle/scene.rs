use crate::config::{CameraConfig, GameConfig};
use crate::gameplay::session::SimulationSession;
use crate::gameplay::RaceSet;
use crate::states::GameState;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

const CAR_BODY_SIZE: Vec3 = Vec3::new(2.0, 1.0, 4.0);
const WHEEL_RADIUS: f32 = 0.5;
const WHEEL_WIDTH: f32 = 0.3;
const WHEEL_OFFSETS: [Vec3; 4] = [
    Vec3::new(-1.0, 0.0, -1.5),
    Vec3::new(1.0, 0.0, -1.5),
    Vec3::new(-1.0, 0.0, 1.5),
    Vec3::new(1.0, 0.0, 1.5),
];

pub(super) struct VehicleScenePlugin;

impl Plugin for VehicleScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRace), spawn_vehicle_scene)
            .add_systems(OnExit(GameState::InRace), cleanup_vehicle_scene)
            .add_systems(
                Update,
                (sync_vehicle_transform, spin_wheels, camera_follow_vehicle)
                    .chain()
                    .in_set(RaceSet::Present),
            );
    }
}

#[derive(Component)]
pub struct PlayerVehicle;

#[derive(Component, Debug, Clone, Copy, Default)]
struct WheelVisual {
    spin: f32,
}

#[derive(Component)]
pub struct FollowCamera;

fn spawn_vehicle_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    session: Option<Res<SimulationSession>>,
    existing_player: Query<Entity, With<PlayerVehicle>>,
    mut camera_query: Query<&mut Transform, (With<FollowCamera>, Without<PlayerVehicle>)>,
) {
    let Some(session) = session else {
        warn!("Entered InRace without an active session; vehicle scene not spawned.");
        return;
    };
    if !existing_player.is_empty() {
        return;
    }

    let vehicle = &session.vehicle;
    let body_mesh = meshes.add(Cuboid::from_size(CAR_BODY_SIZE));
    let wheel_mesh = meshes.add(Cylinder::new(WHEEL_RADIUS, WHEEL_WIDTH));
    let body_material = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.0, 0.0),
        unlit: true,
        ..default()
    });
    let wheel_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.2, 0.2, 0.2),
        unlit: true,
        ..default()
    });

    commands
        .spawn((
            Name::new("PlayerVehicle"),
            PlayerVehicle,
            Transform::from_translation(vehicle.position).with_rotation(vehicle.rotation()),
            Visibility::Inherited,
        ))
        .with_children(|parent| {
            parent.spawn((
                Name::new("PlayerBody"),
                Mesh3d(body_mesh),
                MeshMaterial3d(body_material),
                Transform::default(),
            ));

            for offset in WHEEL_OFFSETS {
                parent.spawn((
                    Name::new("PlayerWheel"),
                    WheelVisual::default(),
                    Mesh3d(wheel_mesh.clone()),
                    MeshMaterial3d(wheel_material.clone()),
                    Transform::from_translation(offset).with_rotation(wheel_rotation(0.0)),
                ));
            }
        });

    // Start at the ideal follow pose so the first frames do not sweep in from the origin.
    if let Ok(mut camera_transform) = camera_query.single_mut() {
        let camera = &config.game.camera;
        camera_transform.translation =
            follow_camera_target(vehicle.position, vehicle.heading, camera);
        camera_transform.look_at(look_at_point(vehicle.position, camera), Vec3::Y);
    }
}

fn cleanup_vehicle_scene(mut commands: Commands, player_query: Query<Entity, With<PlayerVehicle>>) {
    for entity in &player_query {
        commands.entity(entity).try_despawn();
    }
}

fn sync_vehicle_transform(
    session: Res<SimulationSession>,
    mut player_query: Query<&mut Transform, With<PlayerVehicle>>,
) {
    let Ok(mut transform) = player_query.single_mut() else {
        return;
    };
    transform.translation = session.vehicle.position;
    transform.rotation = session.vehicle.rotation();
}

fn spin_wheels(
    session: Res<SimulationSession>,
    config: Res<GameConfig>,
    mut wheel_query: Query<(&mut WheelVisual, &mut Transform)>,
) {
    let delta = wheel_spin_delta(
        session.vehicle.speed,
        config.game.presentation.wheel_spin_factor,
    );
    for (mut wheel, mut transform) in &mut wheel_query {
        wheel.spin += delta;
        transform.rotation = wheel_rotation(wheel.spin);
    }
}

fn camera_follow_vehicle(
    session: Res<SimulationSession>,
    config: Res<GameConfig>,
    mut camera_query: Query<&mut Transform, (With<FollowCamera>, Without<PlayerVehicle>)>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let camera = &config.game.camera;
    let vehicle = &session.vehicle;
    camera_transform.translation = smoothed_camera_position(
        camera_transform.translation,
        follow_camera_target(vehicle.position, vehicle.heading, camera),
        camera.follow_lerp,
    );
    camera_transform.look_at(look_at_point(vehicle.position, camera), Vec3::Y);
}

pub fn wheel_spin_delta(speed: f32, wheel_spin_factor: f32) -> f32 {
    speed * wheel_spin_factor
}

fn wheel_rotation(spin: f32) -> Quat {
    Quat::from_rotation_x(spin) * Quat::from_rotation_z(FRAC_PI_2)
}

/// Behind-and-above point the camera chases, rotated with the car.
pub fn follow_camera_target(position: Vec3, heading: f32, camera: &CameraConfig) -> Vec3 {
    position + Quat::from_rotation_y(heading) * Vec3::from_array(camera.follow_offset)
}

pub fn smoothed_camera_position(current: Vec3, target: Vec3, lerp: f32) -> Vec3 {
    current.lerp(target, lerp)
}

fn look_at_point(position: Vec3, camera: &CameraConfig) -> Vec3 {
    position + Vec3::Y * camera.look_at_height
}
