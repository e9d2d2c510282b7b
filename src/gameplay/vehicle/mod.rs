pub mod scene;

use crate::config::{GameConfig, PhysicsProfile};
use crate::gameplay::track::StartPose;
use crate::gameplay::RaceSet;
use crate::web::TouchDriveInput;
use bevy::prelude::*;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleInput>()
            .init_resource::<VehicleInputBindings>()
            .add_systems(
                Update,
                read_vehicle_input
                    .in_set(RaceSet::Input)
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_plugins(scene::VehicleScenePlugin);
    }
}

/// The six control signals sampled once per frame.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleInput {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub reset: bool,
    pub emergency_brake: bool,
}

#[derive(Resource, Debug, Clone)]
struct VehicleInputBindings {
    accelerate: Vec<KeyCode>,
    brake: Vec<KeyCode>,
    turn_left: Vec<KeyCode>,
    turn_right: Vec<KeyCode>,
    reset: Vec<KeyCode>,
    emergency_brake: Vec<KeyCode>,
}

impl Default for VehicleInputBindings {
    fn default() -> Self {
        Self {
            accelerate: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            brake: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            turn_left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            turn_right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            reset: vec![KeyCode::KeyR],
            emergency_brake: vec![KeyCode::Space],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub position: Vec3,
    /// Where the last integration step started; crossings are swept from here.
    pub previous_position: Vec3,
    pub heading: f32,
    pub speed: f32,
    pub velocity: Vec3,
    pub lap: u32,
    pub crossing_start: bool,
    pub crossing_finish: bool,
}

impl VehicleState {
    pub fn at_pose(pose: StartPose) -> Self {
        Self {
            position: pose.position,
            previous_position: pose.position,
            heading: pose.heading,
            speed: 0.0,
            velocity: Vec3::ZERO,
            lap: 0,
            crossing_start: false,
            crossing_finish: false,
        }
    }

    pub fn reset_to(&mut self, pose: StartPose) {
        *self = Self::at_pose(pose);
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.heading)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionOutcome {
    pub emergency_braking: bool,
}

/// Unit forward vector: -Z rotated about +Y by `heading`.
pub fn forward_direction(heading: f32) -> Vec3 {
    Quat::from_rotation_y(heading) * Vec3::NEG_Z
}

/// Advances one frame of kinematic motion. Rates in `profile` are per frame, not per second.
pub fn integrate_motion(
    state: &mut VehicleState,
    input: &VehicleInput,
    profile: &PhysicsProfile,
) -> MotionOutcome {
    if input.turn_left {
        state.heading += profile.turn_speed;
    }
    if input.turn_right {
        state.heading -= profile.turn_speed;
    }
    let forward = forward_direction(state.heading);

    let emergency_braking = input.emergency_brake && state.speed > 0.0;
    if emergency_braking {
        state.speed = (state.speed - profile.emergency_brake_force).max(0.0);
    } else {
        if input.accelerate && !input.emergency_brake {
            state.speed += profile.acceleration;
        }

        if input.brake {
            if state.speed > 0.0 {
                state.speed -= profile.braking_force;
            } else {
                state.speed -= profile.acceleration * 0.5;
            }
        }

        if !input.accelerate && !input.brake && !input.emergency_brake {
            state.speed *= profile.friction;
            if state.speed.abs() < profile.stop_epsilon {
                state.speed = 0.0;
            }
        }
    }

    state.speed = state.speed.max(profile.min_speed()).min(profile.max_speed);
    state.velocity = forward * state.speed;
    state.previous_position = state.position;
    state.position += state.velocity;

    MotionOutcome { emergency_braking }
}

fn read_vehicle_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<VehicleInputBindings>,
    touch_input: Option<Res<TouchDriveInput>>,
    mut input: ResMut<VehicleInput>,
) {
    let held = |keys: &[KeyCode]| keys.iter().any(|key| keyboard.pressed(*key));
    let touch = touch_input.as_deref().copied().unwrap_or_default();

    *input = VehicleInput {
        accelerate: held(&bindings.accelerate) || touch.accelerate,
        brake: held(&bindings.brake) || touch.brake,
        turn_left: held(&bindings.turn_left) || touch.turn_left,
        turn_right: held(&bindings.turn_right) || touch.turn_right,
        reset: held(&bindings.reset),
        emergency_brake: held(&bindings.emergency_brake),
    };
}
