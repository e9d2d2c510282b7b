pub mod scene;

use crate::config::{LoopShapeConfig, StraightShapeConfig, TrackConfig, TrackShapeConfig};
use crate::gameplay::vehicle::VehicleState;
use bevy::prelude::*;
use std::f32::consts::PI;

const RADIAL_CONTACT_SPEED_SCALE: f32 = 0.9;
const BARRIER_CONTACT_SPEED_SCALE: f32 = 0.8;

pub struct TrackGameplayPlugin;

impl Plugin for TrackGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(scene::TrackScenePlugin);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPose {
    pub position: Vec3,
    pub heading: f32,
}

/// A short wall segment. `forward` is the blocking axis, `right` spans its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barrier {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub half_width: f32,
    pub thickness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    BoundaryContact,
    BarrierCollision { barrier: usize },
    LapCounted { lap: u32 },
    FinishCrossed,
}

/// Geometry rules for one track layout. `clamp_position` runs before `detect_events` each tick.
pub trait TrackBehavior {
    fn clamp_position(&self, vehicle: &mut VehicleState) -> Vec<TrackEvent>;
    fn detect_events(&self, vehicle: &mut VehicleState) -> Vec<TrackEvent>;
    fn barriers(&self) -> &[Barrier];
}

#[derive(Debug, Clone)]
pub struct TrackDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub physics_profile: String,
    pub start_pose: StartPose,
    pub shape: TrackShape,
}

impl TrackDefinition {
    pub fn from_config(track: &TrackConfig) -> Self {
        let (shape, start_pose) = match &track.shape {
            TrackShapeConfig::Straight(shape) => {
                let straight = StraightTrack::from_config(shape);
                let pose = StartPose {
                    position: Vec3::from_array(shape.start_position),
                    heading: shape.start_heading_deg.to_radians(),
                };
                (TrackShape::Straight(straight), pose)
            }
            TrackShapeConfig::Loop(shape) => {
                let looped = LoopTrack::from_config(shape);
                let pose = looped.derived_start_pose(shape);
                (TrackShape::Loop(looped), pose)
            }
        };

        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            description: track.description.clone(),
            physics_profile: track.physics_profile.clone(),
            start_pose,
            shape,
        }
    }

    pub fn behavior(&self) -> &dyn TrackBehavior {
        match &self.shape {
            TrackShape::Straight(track) => track,
            TrackShape::Loop(track) => track,
        }
    }

    pub fn counts_laps(&self) -> bool {
        matches!(self.shape, TrackShape::Loop(_))
    }
}

#[derive(Debug, Clone)]
pub enum TrackShape {
    Straight(StraightTrack),
    Loop(LoopTrack),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StraightTrack {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub finish_z: f32,
    pub start_line_z: f32,
}

impl StraightTrack {
    fn from_config(shape: &StraightShapeConfig) -> Self {
        Self {
            left: shape.left,
            right: shape.right,
            top: shape.top,
            bottom: shape.bottom,
            finish_z: shape.finish_z,
            start_line_z: shape.start_line_z,
        }
    }
}

impl TrackBehavior for StraightTrack {
    fn clamp_position(&self, vehicle: &mut VehicleState) -> Vec<TrackEvent> {
        let mut hit_wall = false;

        if vehicle.position.x < self.left {
            vehicle.position.x = self.left;
            vehicle.velocity.x = 0.0;
            hit_wall = true;
        } else if vehicle.position.x > self.right {
            vehicle.position.x = self.right;
            vehicle.velocity.x = 0.0;
            hit_wall = true;
        }

        if vehicle.position.z < self.top {
            vehicle.position.z = self.top;
            vehicle.velocity.z = 0.0;
            hit_wall = true;
        } else if vehicle.position.z > self.bottom {
            vehicle.position.z = self.bottom;
            vehicle.velocity.z = 0.0;
            hit_wall = true;
        }

        if hit_wall {
            vec![TrackEvent::BoundaryContact]
        } else {
            Vec::new()
        }
    }

    fn detect_events(&self, vehicle: &mut VehicleState) -> Vec<TrackEvent> {
        if vehicle.position.z >= self.finish_z {
            vehicle.crossing_finish = false;
            return Vec::new();
        }

        if vehicle.crossing_finish {
            return Vec::new();
        }

        vehicle.crossing_finish = true;
        vec![TrackEvent::FinishCrossed]
    }

    fn barriers(&self) -> &[Barrier] {
        &[]
    }
}

/// Line anchored on the track with a travel axis and a radial axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGate {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub half_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopTrack {
    pub center: Vec2,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub start_line: TrackGate,
    pub finish_line: TrackGate,
    pub start_enter_distance: f32,
    pub start_clear_distance: f32,
    pub finish_enter_distance: f32,
    pub finish_clear_distance: f32,
    barriers: Vec<Barrier>,
}

impl LoopTrack {
    fn from_config(shape: &LoopShapeConfig) -> Self {
        let center = Vec2::from_array(shape.center);
        let mid_radius = (shape.inner_radius + shape.outer_radius) * 0.5;
        let half_width = (shape.outer_radius - shape.inner_radius) * 0.5;

        let gate_at = |angle_deg: f32| {
            let angle = angle_deg.to_radians();
            TrackGate {
                position: ring_point(center, mid_radius, angle, 0.0),
                forward: travel_tangent(angle),
                right: radial_direction(angle),
                half_width,
            }
        };

        let barriers = shape
            .barriers
            .iter()
            .map(|barrier| {
                let angle = barrier.angle_deg.to_radians();
                Barrier {
                    position: ring_point(center, mid_radius + barrier.radial_offset, angle, 0.0),
                    forward: travel_tangent(angle),
                    right: radial_direction(angle),
                    half_width: barrier.half_width,
                    thickness: barrier.thickness,
                }
            })
            .collect();

        Self {
            center,
            inner_radius: shape.inner_radius,
            outer_radius: shape.outer_radius,
            start_line: gate_at(shape.start_line_angle_deg),
            finish_line: gate_at(shape.finish_line_angle_deg),
            start_enter_distance: shape.start_enter_distance,
            start_clear_distance: shape.start_clear_distance,
            finish_enter_distance: shape.finish_enter_distance,
            finish_clear_distance: shape.finish_clear_distance,
            barriers,
        }
    }

    /// Spawns behind the start line at mid radius, facing the direction of travel.
    fn derived_start_pose(&self, shape: &LoopShapeConfig) -> StartPose {
        let angle = (shape.start_line_angle_deg - shape.spawn_offset_deg).to_radians();
        StartPose {
            position: ring_point(self.center, self.mid_radius(), angle, shape.spawn_height),
            heading: heading_for_tangent(angle),
        }
    }

    pub fn mid_radius(&self) -> f32 {
        (self.inner_radius + self.outer_radius) * 0.5
    }

    fn planar_offset(&self, position: Vec3) -> Vec2 {
        Vec2::new(position.x, position.z) - self.center
    }

    fn push_to_radius(&self, vehicle: &mut VehicleState, offset: Vec2, radius: f32) {
        let direction = offset.try_normalize().unwrap_or(Vec2::X);
        let target = self.center + direction * radius;
        vehicle.position.x = target.x;
        vehicle.position.z = target.y;
        vehicle.speed *= RADIAL_CONTACT_SPEED_SCALE;
    }
}

impl TrackBehavior for LoopTrack {
    fn clamp_position(&self, vehicle: &mut VehicleState) -> Vec<TrackEvent> {
        let mut events = Vec::new();

        let offset = self.planar_offset(vehicle.position);
        let distance = offset.length();
        if distance < self.inner_radius {
            self.push_to_radius(vehicle, offset, self.inner_radius);
            events.push(TrackEvent::BoundaryContact);
        } else if distance > self.outer_radius {
            self.push_to_radius(vehicle, offset, self.outer_radius);
            events.push(TrackEvent::BoundaryContact);
        }

        for (index, barrier) in self.barriers.iter().enumerate() {
            let offset = planar(vehicle.position - barrier.position);
            let lateral = offset.dot(barrier.right);
            let longitudinal = offset.dot(barrier.forward);

            let touching = lateral.abs() <= barrier.half_width
                && longitudinal.abs() < barrier.thickness;
            let passed_through = swept_crossing(
                barrier.position,
                barrier.forward,
                vehicle.previous_position,
                vehicle.position,
            )
            .is_some_and(|point| {
                planar(point - barrier.position).dot(barrier.right).abs() <= barrier.half_width
            });
            if !touching && !passed_through {
                continue;
            }

            // Back out on the side the step started from.
            let approach = planar(vehicle.previous_position - barrier.position).dot(barrier.forward);
            let side = if approach != 0.0 {
                approach.signum()
            } else {
                longitudinal.signum()
            };
            vehicle.position += barrier.forward * (side * barrier.thickness - longitudinal);
            vehicle.speed *= BARRIER_CONTACT_SPEED_SCALE;
            events.push(TrackEvent::BarrierCollision { barrier: index });
        }

        events
    }

    fn detect_events(&self, vehicle: &mut VehicleState) -> Vec<TrackEvent> {
        let mut events = Vec::new();

        let start_distance = planar(vehicle.position - self.start_line.position).length();
        if start_distance < self.start_enter_distance && !vehicle.crossing_start {
            let offset = self.planar_offset(vehicle.position);
            let local_angle = offset.y.atan2(offset.x);
            if travel_tangent(local_angle).dot(vehicle.velocity) > 0.0 {
                vehicle.lap += 1;
                vehicle.crossing_start = true;
                events.push(TrackEvent::LapCounted { lap: vehicle.lap });
            }
        } else if start_distance > self.start_clear_distance {
            vehicle.crossing_start = false;
        }

        let finish = &self.finish_line;
        let offset = planar(vehicle.position - finish.position);
        let longitudinal = offset.dot(finish.forward);
        let within_gate = |point: Vec3| {
            planar(point - finish.position).dot(finish.right).abs() <= finish.half_width
        };
        // A fast car can step over the whole zone in one frame, so the step itself is tested too.
        let reached = (longitudinal.abs() < self.finish_enter_distance
            && within_gate(vehicle.position))
            || swept_crossing(
                finish.position,
                finish.forward,
                vehicle.previous_position,
                vehicle.position,
            )
            .is_some_and(within_gate);
        if reached && vehicle.lap >= 1 && !vehicle.crossing_finish {
            vehicle.crossing_finish = true;
            events.push(TrackEvent::FinishCrossed);
        } else if !reached && longitudinal.abs() > self.finish_clear_distance {
            vehicle.crossing_finish = false;
        }

        events
    }

    fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }
}

/// Point on the ring at `angle`, measured from +X toward +Z in the ground plane.
pub fn ring_point(center: Vec2, radius: f32, angle: f32, height: f32) -> Vec3 {
    Vec3::new(
        center.x + radius * angle.cos(),
        height,
        center.y + radius * angle.sin(),
    )
}

/// Direction of travel around the loop (increasing angle).
pub fn travel_tangent(angle: f32) -> Vec3 {
    Vec3::new(-angle.sin(), 0.0, angle.cos())
}

fn radial_direction(angle: f32) -> Vec3 {
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

fn heading_for_tangent(angle: f32) -> f32 {
    PI - angle
}

fn planar(offset: Vec3) -> Vec3 {
    Vec3::new(offset.x, 0.0, offset.z)
}

/// Point where the step `from -> to` passes the plane through `anchor` facing `normal`.
fn swept_crossing(anchor: Vec3, normal: Vec3, from: Vec3, to: Vec3) -> Option<Vec3> {
    let before = planar(from - anchor).dot(normal);
    let after = planar(to - anchor).dot(normal);
    if (before < 0.0) == (after < 0.0) {
        return None;
    }
    let t = before / (before - after);
    Some(from.lerp(to, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{loop_profile, loop_track, straight_track};
    use crate::gameplay::vehicle::{forward_direction, integrate_motion, VehicleInput};

    fn straight() -> TrackDefinition {
        TrackDefinition::from_config(&straight_track())
    }

    fn looped() -> TrackDefinition {
        TrackDefinition::from_config(&loop_track())
    }

    fn loop_shape(track: &TrackDefinition) -> &LoopTrack {
        match &track.shape {
            TrackShape::Loop(shape) => shape,
            TrackShape::Straight(_) => panic!("expected loop track"),
        }
    }

    fn vehicle_at(position: Vec3, velocity: Vec3) -> VehicleState {
        let mut vehicle = VehicleState::at_pose(StartPose {
            position,
            heading: 0.0,
        });
        vehicle.velocity = velocity;
        vehicle.speed = velocity.length();
        vehicle
    }

    #[test]
    fn straight_clamp_stops_sideways_motion_at_the_wall() {
        let track = straight();
        let mut vehicle = vehicle_at(Vec3::new(6.3, 0.5, 10.0), Vec3::new(0.4, 0.0, -1.0));

        let events = track.behavior().clamp_position(&mut vehicle);

        assert_eq!(vehicle.position.x, 5.0);
        assert_eq!(vehicle.velocity.x, 0.0);
        assert_eq!(vehicle.velocity.z, -1.0);
        assert_eq!(events, vec![TrackEvent::BoundaryContact]);
    }

    #[test]
    fn straight_clamp_leaves_inside_positions_untouched() {
        let track = straight();
        let mut vehicle = vehicle_at(Vec3::new(1.0, 0.5, 0.0), Vec3::new(0.0, 0.0, -1.0));

        let events = track.behavior().clamp_position(&mut vehicle);

        assert!(events.is_empty());
        assert_eq!(vehicle.position, Vec3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn straight_finish_fires_once_per_crossing() {
        let track = straight();
        let mut vehicle = vehicle_at(Vec3::new(0.0, 0.5, -24.2), Vec3::new(0.0, 0.0, -0.1));

        let finishes = (0..10)
            .flat_map(|_| track.behavior().detect_events(&mut vehicle))
            .filter(|event| *event == TrackEvent::FinishCrossed)
            .count();
        assert_eq!(finishes, 1);

        vehicle.position.z = -20.0;
        assert!(track.behavior().detect_events(&mut vehicle).is_empty());
        assert!(!vehicle.crossing_finish);

        vehicle.position.z = -24.3;
        assert_eq!(
            track.behavior().detect_events(&mut vehicle),
            vec![TrackEvent::FinishCrossed]
        );
    }

    #[test]
    fn loop_start_pose_sits_behind_start_line_facing_travel() {
        let track = looped();
        let shape = loop_shape(&track);
        let pose = track.start_pose;

        let radius = Vec2::new(pose.position.x, pose.position.z).length();
        assert!((radius - 200.0).abs() < 1.0e-3);
        assert_eq!(pose.position.y, 0.5);

        let angle = pose.position.z.atan2(pose.position.x);
        assert!((angle.to_degrees() - 84.0).abs() < 1.0e-3);

        let forward = forward_direction(pose.heading);
        assert!((forward - travel_tangent(angle)).length() < 1.0e-5);

        let to_start = shape.start_line.position - pose.position;
        assert!(to_start.dot(forward) > 0.0);
        assert!(to_start.length() > shape.start_enter_distance);
    }

    #[test]
    fn loop_pushes_back_inside_the_outer_radius() {
        let track = looped();
        let mut vehicle = vehicle_at(Vec3::new(0.0, 0.5, -230.0), Vec3::new(-1.0, 0.0, 0.0));
        vehicle.speed = 4.0;

        let events = track.behavior().clamp_position(&mut vehicle);

        let radius = Vec2::new(vehicle.position.x, vehicle.position.z).length();
        assert!((radius - 215.0).abs() < 1.0e-3);
        assert!((vehicle.speed - 3.6).abs() < 1.0e-6);
        assert!(events.contains(&TrackEvent::BoundaryContact));
    }

    #[test]
    fn loop_pushes_out_to_the_inner_radius() {
        let track = looped();
        let mut vehicle = vehicle_at(Vec3::new(-150.0, 0.5, 0.0), Vec3::ZERO);
        vehicle.speed = 2.0;

        track.behavior().clamp_position(&mut vehicle);

        assert!((vehicle.position.x + 185.0).abs() < 1.0e-3);
        assert!(vehicle.position.z.abs() < 1.0e-3);
        assert!((vehicle.speed - 1.8).abs() < 1.0e-6);
    }

    #[test]
    fn loop_push_at_center_falls_back_to_positive_x() {
        let track = looped();
        let mut vehicle = vehicle_at(Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO);

        track.behavior().clamp_position(&mut vehicle);

        assert!((vehicle.position.x - 185.0).abs() < 1.0e-3);
        assert!(vehicle.position.z.abs() < 1.0e-3);
    }

    #[test]
    fn barrier_contact_pushes_vehicle_clear_and_slows_it() {
        let track = looped();
        let barrier = track.behavior().barriers()[0];
        let start = barrier.position + barrier.forward * 0.5 + Vec3::Y * 0.5;
        let mut vehicle = vehicle_at(start, -barrier.forward);
        vehicle.speed = 5.0;

        let events = track.behavior().clamp_position(&mut vehicle);

        let longitudinal = planar(vehicle.position - barrier.position).dot(barrier.forward);
        assert!((longitudinal - barrier.thickness).abs() < 1.0e-3);
        assert!((vehicle.speed - 4.0).abs() < 1.0e-6);
        assert!(events.contains(&TrackEvent::BarrierCollision { barrier: 0 }));
    }

    #[test]
    fn full_speed_step_into_a_barrier_backs_out_the_way_it_came() {
        let track = looped();
        let barrier = track.behavior().barriers()[0];
        let max_speed = loop_profile().max_speed;

        for landing in [0.3, 3.0, 4.5] {
            let from = barrier.position + Vec3::Y * 0.5 + barrier.forward * (landing - max_speed);
            let mut vehicle = vehicle_at(from, barrier.forward * max_speed);
            vehicle.position = from + vehicle.velocity;

            let events = track.behavior().clamp_position(&mut vehicle);

            let longitudinal = planar(vehicle.position - barrier.position).dot(barrier.forward);
            assert!(
                (longitudinal + barrier.thickness).abs() < 1.0e-3,
                "landing at {landing} ended at {longitudinal}"
            );
            assert!(events.contains(&TrackEvent::BarrierCollision { barrier: 0 }));
            assert!((vehicle.speed - max_speed * 0.8).abs() < 1.0e-5);
        }
    }

    #[test]
    fn step_past_the_barrier_end_is_not_a_collision() {
        let track = looped();
        let barrier = track.behavior().barriers()[0];
        let lane = barrier.right * (barrier.half_width + 2.0);
        let from = barrier.position + lane - barrier.forward * 3.0;
        let mut vehicle = vehicle_at(from, barrier.forward * 6.0);
        vehicle.position = from + vehicle.velocity;

        let events = track.behavior().clamp_position(&mut vehicle);

        assert!(events.is_empty());
        assert_eq!(vehicle.position, from + barrier.forward * 6.0);
    }

    #[test]
    fn barrier_ignores_vehicles_beside_its_width() {
        let track = looped();
        let barrier = track.behavior().barriers()[0];
        let beside = barrier.position + barrier.right * (barrier.half_width + 1.0);
        let mut vehicle = vehicle_at(beside, barrier.forward);
        vehicle.speed = 5.0;

        let events = track.behavior().clamp_position(&mut vehicle);

        assert!(!events
            .iter()
            .any(|event| matches!(event, TrackEvent::BarrierCollision { .. })));
        assert_eq!(vehicle.speed, 5.0);
    }

    #[test]
    fn start_crossing_with_the_tangent_counts_one_lap() {
        let track = looped();
        let shape = loop_shape(&track);
        let forward = shape.start_line.forward;
        let mut vehicle = vehicle_at(shape.start_line.position, forward);

        let laps = (0..10)
            .flat_map(|_| track.behavior().detect_events(&mut vehicle))
            .filter(|event| matches!(event, TrackEvent::LapCounted { .. }))
            .count();

        assert_eq!(laps, 1);
        assert_eq!(vehicle.lap, 1);
        assert!(vehicle.crossing_start);
    }

    #[test]
    fn start_crossing_against_the_tangent_does_not_count() {
        let track = looped();
        let shape = loop_shape(&track);
        let mut vehicle = vehicle_at(shape.start_line.position, -shape.start_line.forward);

        for _ in 0..10 {
            track.behavior().detect_events(&mut vehicle);
        }

        assert_eq!(vehicle.lap, 0);
        assert!(!vehicle.crossing_start);
    }

    #[test]
    fn start_flag_clears_once_vehicle_leaves_the_zone() {
        let track = looped();
        let shape = loop_shape(&track);
        let mut vehicle = vehicle_at(shape.start_line.position, shape.start_line.forward);
        track.behavior().detect_events(&mut vehicle);
        assert!(vehicle.crossing_start);

        vehicle.position =
            shape.start_line.position + shape.start_line.forward * (shape.start_clear_distance + 1.0);
        track.behavior().detect_events(&mut vehicle);

        assert!(!vehicle.crossing_start);
        assert_eq!(vehicle.lap, 1);
    }

    #[test]
    fn loop_finish_fires_once_inside_the_zone_after_a_lap() {
        let track = looped();
        let shape = loop_shape(&track);
        let mut vehicle = vehicle_at(shape.finish_line.position, shape.finish_line.forward);
        vehicle.lap = 1;

        let finishes = (0..10)
            .flat_map(|_| track.behavior().detect_events(&mut vehicle))
            .filter(|event| *event == TrackEvent::FinishCrossed)
            .count();

        assert_eq!(finishes, 1);
        assert!(vehicle.crossing_finish);
    }

    #[test]
    fn loop_finish_is_ignored_before_the_first_lap() {
        let track = looped();
        let shape = loop_shape(&track);
        let mut vehicle = vehicle_at(shape.finish_line.position, shape.finish_line.forward);

        let events = track.behavior().detect_events(&mut vehicle);

        assert!(!events.contains(&TrackEvent::FinishCrossed));
        assert!(!vehicle.crossing_finish);
    }

    #[test]
    fn loop_finish_fires_when_a_full_speed_step_jumps_the_zone() {
        let track = looped();
        let shape = loop_shape(&track);
        let finish = shape.finish_line;
        let profile = loop_profile();
        let angle = finish.position.z.atan2(finish.position.x);
        let mut vehicle = VehicleState::at_pose(StartPose {
            position: finish.position - finish.forward * 3.0 + Vec3::Y * 0.5,
            heading: heading_for_tangent(angle),
        });
        vehicle.speed = profile.max_speed;
        vehicle.lap = 1;
        let input = VehicleInput {
            accelerate: true,
            ..default()
        };

        let mut finishes = 0;
        for _ in 0..4 {
            integrate_motion(&mut vehicle, &input, &profile);
            track.behavior().clamp_position(&mut vehicle);
            finishes += track
                .behavior()
                .detect_events(&mut vehicle)
                .into_iter()
                .filter(|event| *event == TrackEvent::FinishCrossed)
                .count();

            let longitudinal = planar(vehicle.position - finish.position).dot(finish.forward);
            assert!(longitudinal.abs() >= shape.finish_enter_distance);
        }

        assert_eq!(finishes, 1);
        assert!(!vehicle.crossing_finish);
    }

    #[test]
    fn loop_finish_ignores_steps_that_cross_outside_the_gate() {
        let track = looped();
        let shape = loop_shape(&track);
        let finish = shape.finish_line;
        let wide = finish.right * (finish.half_width + 3.0);
        let mut vehicle = vehicle_at(finish.position + wide - finish.forward * 3.0, finish.forward);
        vehicle.lap = 1;
        vehicle.position = finish.position + wide + finish.forward * 3.0;

        let events = track.behavior().detect_events(&mut vehicle);

        assert!(!events.contains(&TrackEvent::FinishCrossed));
    }

    #[test]
    fn loop_finish_rearms_after_clearing_the_line() {
        let track = looped();
        let shape = loop_shape(&track);
        let finish = shape.finish_line;
        let mut vehicle = vehicle_at(finish.position, finish.forward);
        vehicle.lap = 1;
        track.behavior().detect_events(&mut vehicle);

        vehicle.position = finish.position + finish.forward * (shape.finish_clear_distance + 0.5);
        track.behavior().detect_events(&mut vehicle);
        assert!(!vehicle.crossing_finish);

        vehicle.position = finish.position;
        let events = track.behavior().detect_events(&mut vehicle);
        assert!(events.contains(&TrackEvent::FinishCrossed));
    }
}
