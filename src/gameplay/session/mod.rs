use crate::config::{GameConfig, PhysicsProfile};
use crate::gameplay::race::{format_race_time, RaceTimer};
use crate::gameplay::track::{TrackDefinition, TrackEvent};
use crate::gameplay::vehicle::{integrate_motion, VehicleInput, VehicleState};
use crate::gameplay::RaceSet;
use bevy::prelude::*;

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<RaceEvent>()
            .add_systems(
                Update,
                sync_session_with_config
                    .before(RaceSet::Simulate)
                    .run_if(resource_exists::<SimulationSession>)
                    .run_if(resource_exists_and_changed::<GameConfig>),
            )
            .add_systems(Update, tick_simulation.in_set(RaceSet::Simulate))
            .add_systems(Update, log_race_events.in_set(RaceSet::Present));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    Manual,
    AutoReset,
    TrackSelected,
}

#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum RaceEvent {
    Started,
    LapCompleted { lap: u32 },
    Finished { final_time: f64 },
    BarrierHit { barrier: usize },
    Reset { cause: ResetCause },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub track_events: Vec<TrackEvent>,
    pub emergency_braking: bool,
    pub race_started: bool,
    pub final_time: Option<f64>,
    pub reset: Option<ResetCause>,
}

impl TickReport {
    pub fn race_events(&self) -> Vec<RaceEvent> {
        let mut events = Vec::new();
        if let Some(cause) = self.reset {
            events.push(RaceEvent::Reset { cause });
        }
        if self.race_started {
            events.push(RaceEvent::Started);
        }
        for event in &self.track_events {
            match *event {
                TrackEvent::LapCounted { lap } => events.push(RaceEvent::LapCompleted { lap }),
                TrackEvent::BarrierCollision { barrier } => {
                    events.push(RaceEvent::BarrierHit { barrier })
                }
                TrackEvent::BoundaryContact | TrackEvent::FinishCrossed => {}
            }
        }
        if let Some(final_time) = self.final_time {
            events.push(RaceEvent::Finished { final_time });
        }
        events
    }
}

/// Everything one race needs: the selected track, its physics, the car and the clock.
#[derive(Resource, Debug, Clone)]
pub struct SimulationSession {
    pub track: TrackDefinition,
    pub physics: PhysicsProfile,
    pub vehicle: VehicleState,
    pub timer: RaceTimer,
    pub auto_reset_seconds: f64,
    pub emergency_braking: bool,
    reset_held: bool,
    reset_count: u32,
}

impl SimulationSession {
    pub fn new(track: TrackDefinition, physics: PhysicsProfile, auto_reset_seconds: f64) -> Self {
        let vehicle = VehicleState::at_pose(track.start_pose);
        Self {
            track,
            physics,
            vehicle,
            timer: RaceTimer::default(),
            auto_reset_seconds,
            emergency_braking: false,
            reset_held: false,
            reset_count: 0,
        }
    }

    pub fn from_config(config: &GameConfig, track_id: &str) -> Result<Self, String> {
        let Some(track_config) = config.tracks_by_id.get(track_id) else {
            return Err(format!("unknown track id `{track_id}`"));
        };
        let Some(physics) = config.physics_for_track(track_config) else {
            return Err(format!(
                "track `{track_id}` references unknown physics profile `{}`",
                track_config.physics_profile
            ));
        };

        Ok(Self::new(
            TrackDefinition::from_config(track_config),
            physics.clone(),
            config.game.app.auto_reset_seconds,
        ))
    }

    pub fn reset_count(&self) -> u32 {
        self.reset_count
    }

    /// Puts the car back on the start pose and clears the clock.
    pub fn reset(&mut self, cause: ResetCause) {
        self.vehicle.reset_to(self.track.start_pose);
        self.timer.reset();
        self.emergency_braking = false;
        self.reset_count += 1;
        debug!("Session reset ({cause:?}), total resets: {}.", self.reset_count);
    }

    /// One frame: pending auto-reset, reset key, motion, track rules, then the race clock.
    pub fn tick(&mut self, input: &VehicleInput, now: f64) -> TickReport {
        let mut report = TickReport::default();

        if self.timer.take_due_reset(now) {
            self.reset(ResetCause::AutoReset);
            report.reset = Some(ResetCause::AutoReset);
        }

        if input.reset {
            if self.reset_held {
                self.vehicle.reset_to(self.track.start_pose);
            } else {
                self.reset(ResetCause::Manual);
                report.reset = Some(ResetCause::Manual);
            }
            self.reset_held = true;
            return report;
        }
        self.reset_held = false;

        let motion = integrate_motion(&mut self.vehicle, input, &self.physics);
        self.emergency_braking = motion.emergency_braking;
        report.emergency_braking = motion.emergency_braking;

        let behavior = self.track.behavior();
        report
            .track_events
            .extend(behavior.clamp_position(&mut self.vehicle));
        report
            .track_events
            .extend(behavior.detect_events(&mut self.vehicle));

        if input.accelerate || input.brake {
            report.race_started = self.timer.start(now);
        }
        if report.track_events.contains(&TrackEvent::FinishCrossed) {
            report.final_time = self.timer.record_finish(now, self.auto_reset_seconds);
        }
        self.timer.update_elapsed(now);

        report
    }
}

fn tick_simulation(
    time: Res<Time>,
    input: Res<VehicleInput>,
    mut session: ResMut<SimulationSession>,
    mut race_events: MessageWriter<RaceEvent>,
) {
    let report = session.tick(&input, time.elapsed_secs_f64());
    for event in report.race_events() {
        race_events.write(event);
    }
}

fn sync_session_with_config(config: Res<GameConfig>, mut session: ResMut<SimulationSession>) {
    session.auto_reset_seconds = config.game.app.auto_reset_seconds;

    let Some(profile) = config.physics_by_id.get(&session.track.physics_profile) else {
        warn!(
            "Physics profile `{}` disappeared from config; keeping the current values.",
            session.track.physics_profile
        );
        return;
    };
    if *profile != session.physics {
        session.physics = profile.clone();
        info!("Applied physics profile `{}` to the running session.", profile.id);
    }
}

fn log_race_events(session: Res<SimulationSession>, mut race_events: MessageReader<RaceEvent>) {
    for event in race_events.read() {
        match event {
            RaceEvent::Started => info!("Race started on `{}`.", session.track.id),
            RaceEvent::LapCompleted { lap } => info!("Lap {lap} on `{}`.", session.track.id),
            RaceEvent::Finished { final_time } => info!(
                "Finished `{}` in {}; resetting in {:.0} seconds.",
                session.track.id,
                format_race_time(*final_time),
                session.auto_reset_seconds
            ),
            RaceEvent::BarrierHit { barrier } => debug!("Barrier {barrier} hit."),
            RaceEvent::Reset { cause } => info!("Race reset ({cause:?})."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{sample_config, sprint_profile};
    use crate::gameplay::race::RacePhase;
    use crate::gameplay::track::{travel_tangent, TrackShape};
    use crate::gameplay::vehicle::forward_direction;

    const FRAME: f64 = 1.0 / 60.0;

    fn straight_session() -> SimulationSession {
        SimulationSession::from_config(&sample_config(), "straight_sprint")
            .expect("straight track should build")
    }

    fn accelerate() -> VehicleInput {
        VehicleInput {
            accelerate: true,
            ..default()
        }
    }

    fn reset_key() -> VehicleInput {
        VehicleInput {
            reset: true,
            ..default()
        }
    }

    /// Starts the race at `t = 0` and places the car just short of the finish line.
    fn finish_at(session: &mut SimulationSession, finish_time: f64) -> TickReport {
        session.tick(&accelerate(), 0.0);
        session.vehicle.position.z = -23.9;
        session.vehicle.speed = 1.0;
        session.tick(&accelerate(), finish_time)
    }

    /// Steers for a lane `lane_radius` from the loop centre and holds speed near `cruise`.
    fn lap_driver(session: &SimulationSession, lane_radius: f32, cruise: f32) -> VehicleInput {
        let TrackShape::Loop(track) = &session.track.shape else {
            panic!("loop track expected");
        };
        let vehicle = &session.vehicle;
        let offset = Vec2::new(vehicle.position.x, vehicle.position.z) - track.center;
        let angle = offset.y.atan2(offset.x);
        let drift = ((offset.length() - lane_radius) * 0.05).clamp(-0.5, 0.5);
        let outward = Vec3::new(angle.cos(), 0.0, angle.sin());
        let wanted = (travel_tangent(angle) - outward * drift).normalize();
        let steer = forward_direction(vehicle.heading).cross(wanted).y;

        VehicleInput {
            accelerate: vehicle.speed < cruise,
            turn_left: steer > 0.01,
            turn_right: steer < -0.01,
            ..default()
        }
    }

    #[test]
    fn loop_lap_finishes_and_auto_resets() {
        let mut session = SimulationSession::from_config(&sample_config(), "grand_loop")
            .expect("loop track builds");
        let mut race_events = Vec::new();
        let mut frame = 0u32;

        while session.timer.phase() != RacePhase::Finished {
            assert!(frame < 3000, "no finish after {frame} frames");
            let input = lap_driver(&session, 207.0, 4.0);
            let report = session.tick(&input, f64::from(frame) * FRAME);
            race_events.extend(report.race_events());
            frame += 1;
        }

        assert_eq!(session.vehicle.lap, 1);
        assert_eq!(
            race_events
                .iter()
                .filter(|event| matches!(event, RaceEvent::LapCompleted { .. }))
                .count(),
            1
        );
        assert!(!race_events
            .iter()
            .any(|event| matches!(event, RaceEvent::BarrierHit { .. })));
        assert_eq!(race_events.first(), Some(&RaceEvent::Started));
        let finished_at = session.timer.finish_timestamp().expect("finish recorded");
        assert!(matches!(race_events.last(), Some(RaceEvent::Finished { .. })));

        let mut now = finished_at;
        let reset = loop {
            now += FRAME;
            assert!(now < finished_at + 4.0, "auto-reset never fired");
            if let Some(cause) = session.tick(&VehicleInput::default(), now).reset {
                break cause;
            }
        };

        assert_eq!(reset, ResetCause::AutoReset);
        assert!(now >= finished_at + session.auto_reset_seconds);
        assert_eq!(session.timer.phase(), RacePhase::Idle);
        assert_eq!(session.vehicle.lap, 0);
        assert_eq!(session.vehicle.position, session.track.start_pose.position);
    }

    #[test]
    fn unknown_track_is_rejected() {
        let error = SimulationSession::from_config(&sample_config(), "nowhere")
            .expect_err("missing track");
        assert!(error.contains("nowhere"));
    }

    #[test]
    fn loop_session_spawns_on_the_derived_start_pose() {
        let session = SimulationSession::from_config(&sample_config(), "grand_loop")
            .expect("loop track builds");

        assert_eq!(session.vehicle.position, session.track.start_pose.position);
        assert_eq!(session.physics.id, "grand_loop");
        assert!(session.track.counts_laps());
    }

    #[test]
    fn timer_starts_on_first_accelerate_after_reset() {
        let mut session = straight_session();
        let t0 = 5.0;

        session.tick(&reset_key(), t0);
        assert_eq!(session.timer.phase(), RacePhase::Idle);

        session.tick(&VehicleInput::default(), t0 + 0.5);
        assert_eq!(session.timer.phase(), RacePhase::Idle);

        let report = session.tick(&accelerate(), t0 + 1.0);
        assert!(report.race_started);
        assert_eq!(session.timer.phase(), RacePhase::Running);
        assert_eq!(session.timer.start_timestamp(), Some(t0 + 1.0));
    }

    #[test]
    fn brake_also_starts_the_timer() {
        let mut session = straight_session();
        let input = VehicleInput {
            brake: true,
            ..default()
        };

        session.tick(&input, 2.0);

        assert_eq!(session.timer.phase(), RacePhase::Running);
    }

    #[test]
    fn straight_finish_records_final_time_and_schedules_reset() {
        let mut session = straight_session();

        let report = finish_at(&mut session, 12.5);

        assert_eq!(report.final_time, Some(12.5));
        assert_eq!(session.timer.phase(), RacePhase::Finished);
        let pending = session.timer.pending_reset().expect("auto-reset scheduled");
        assert!((pending.due_at - 15.5).abs() < 1.0e-9);
        assert!(report
            .race_events()
            .contains(&RaceEvent::Finished { final_time: 12.5 }));
    }

    #[test]
    fn auto_reset_waits_the_full_delay() {
        let mut session = straight_session();
        finish_at(&mut session, 10.0);
        let resets_before = session.reset_count();

        let mut now = 10.0;
        while now < 12.99 {
            now += FRAME;
            session.tick(&VehicleInput::default(), now.min(12.99));
            assert_eq!(session.timer.phase(), RacePhase::Finished);
        }

        let report = session.tick(&VehicleInput::default(), 13.0);
        assert_eq!(report.reset, Some(ResetCause::AutoReset));
        assert_eq!(session.timer.phase(), RacePhase::Idle);
        assert_eq!(session.vehicle.position, session.track.start_pose.position);
        assert_eq!(session.reset_count(), resets_before + 1);
    }

    #[test]
    fn manual_reset_cancels_the_pending_auto_reset() {
        let mut session = straight_session();
        finish_at(&mut session, 10.0);
        let resets_before = session.reset_count();

        session.tick(&reset_key(), 11.0);
        assert!(session.timer.pending_reset().is_none());

        let mut now = 11.0;
        while now < 20.0 {
            now += FRAME;
            let report = session.tick(&VehicleInput::default(), now);
            assert_eq!(report.reset, None);
        }

        assert_eq!(session.reset_count(), resets_before + 1);
        assert_eq!(session.timer.phase(), RacePhase::Idle);
    }

    #[test]
    fn holding_reset_counts_a_single_reset() {
        let mut session = straight_session();
        session.tick(&accelerate(), 0.0);

        for frame in 0..30 {
            session.tick(&reset_key(), 1.0 + frame as f64 * FRAME);
        }

        assert_eq!(session.reset_count(), 1);
        assert_eq!(session.vehicle.speed, 0.0);
    }

    #[test]
    fn finish_after_finishing_is_ignored() {
        let mut session = straight_session();
        finish_at(&mut session, 10.0);

        session.vehicle.position.z = -10.0;
        session.tick(&VehicleInput::default(), 10.5);
        session.vehicle.position.z = -23.9;
        session.vehicle.speed = 1.0;
        let report = session.tick(&accelerate(), 11.0);

        assert!(report.track_events.contains(&TrackEvent::FinishCrossed));
        assert_eq!(report.final_time, None);
        assert_eq!(session.timer.finish_timestamp(), Some(10.0));
    }

    #[test]
    fn emergency_brake_flag_is_reported() {
        let mut session = straight_session();
        session.vehicle.speed = 5.0;
        let input = VehicleInput {
            emergency_brake: true,
            ..default()
        };

        let report = session.tick(&input, 1.0);

        assert!(report.emergency_braking);
        assert!(session.emergency_braking);
    }

    #[test]
    fn straight_run_moves_toward_the_finish() {
        let mut session = straight_session();
        session.physics = sprint_profile();

        for frame in 0..1000 {
            session.tick(&accelerate(), frame as f64 * FRAME);
            assert!(session.vehicle.speed <= session.physics.max_speed);
        }

        assert!(session.vehicle.position.z < 22.0);
    }
}
