use crate::config::{GameConfig, NetworkConfig};
use crate::gameplay::race::RacePhase;
use crate::gameplay::session::SimulationSession;
use crate::gameplay::RaceSet;
use crate::states::GameState;
use bevy::prelude::*;
use serde::Serialize;
use std::collections::VecDeque;

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NetworkManager>()
            .add_systems(
                Update,
                sync_network_with_config.run_if(resource_exists_and_changed::<GameConfig>),
            )
            .add_systems(
                Update,
                publish_player_state
                    .in_set(RaceSet::Present)
                    .run_if(in_state(GameState::InRace))
                    .run_if(resource_exists::<SimulationSession>)
                    .run_if(network_active),
            );
    }
}

/// Outbound-only multiplayer stub: messages are encoded and queued, never sent.
#[derive(Resource, Debug)]
pub struct NetworkManager {
    active: bool,
    server_url: Option<String>,
    player_id: Option<String>,
    send_interval_ms: u64,
    outbox_capacity: usize,
    last_sync_ms: Option<u64>,
    outbox: VecDeque<String>,
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::with_limits(&NetworkConfig::default())
    }
}

impl NetworkManager {
    pub fn with_limits(config: &NetworkConfig) -> Self {
        Self {
            active: false,
            server_url: None,
            player_id: None,
            send_interval_ms: config.send_interval_ms,
            outbox_capacity: config.outbox_capacity.max(1),
            last_sync_ms: None,
            outbox: VecDeque::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    pub fn outbox(&self) -> &VecDeque<String> {
        &self.outbox
    }

    pub fn initialize_multiplayer(&mut self, server_url: &str) {
        info!("Multiplayer is not available yet; queueing updates for `{server_url}` locally.");
        self.server_url = Some(server_url.to_string());
        self.active = true;
        self.last_sync_ms = None;
    }

    /// Queues one `player_update` message unless the previous one is too recent.
    /// Returns whether a message was queued.
    pub fn send_player_state(
        &mut self,
        snapshot: &PlayerStateSnapshot,
        now_ms: u64,
    ) -> Result<bool, serde_json::Error> {
        if !self.active {
            return Ok(false);
        }
        if let Some(last) = self.last_sync_ms {
            if now_ms.saturating_sub(last) <= self.send_interval_ms {
                return Ok(false);
            }
        }

        let message = PlayerUpdateMessage {
            kind: "player_update",
            player_id: self.player_id.as_deref(),
            state: snapshot,
            timestamp_ms: now_ms,
        };
        let encoded = serde_json::to_string(&message)?;
        self.last_sync_ms = Some(now_ms);

        if self.outbox.len() >= self.outbox_capacity {
            self.outbox.pop_front();
        }
        self.outbox.push_back(encoded);
        debug!("Queued player update ({} pending).", self.outbox.len());
        Ok(true)
    }

    pub fn disconnect(&mut self) {
        if self.active {
            info!("Multiplayer session closed.");
        }
        self.active = false;
        self.player_id = None;
        self.last_sync_ms = None;
        self.outbox.clear();
    }
}

#[derive(Serialize)]
struct PlayerUpdateMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    player_id: Option<&'a str>,
    state: &'a PlayerStateSnapshot,
    timestamp_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarSnapshot {
    pub position: [f32; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub rotation: [f32; 4],
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceSnapshot {
    pub started: bool,
    pub finished: bool,
    pub start_time: Option<f64>,
    pub finish_time: Option<f64>,
    pub elapsed_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStateSnapshot {
    pub car: CarSnapshot,
    pub race: RaceSnapshot,
    pub track_id: String,
}

impl PlayerStateSnapshot {
    pub fn capture(session: &SimulationSession) -> Self {
        let vehicle = &session.vehicle;
        let timer = &session.timer;
        Self {
            car: CarSnapshot {
                position: vehicle.position.to_array(),
                rotation: vehicle.rotation().to_array(),
                velocity: vehicle.velocity.to_array(),
                angular_velocity: [0.0; 3],
            },
            race: RaceSnapshot {
                started: timer.phase() != RacePhase::Idle,
                finished: timer.phase() == RacePhase::Finished,
                start_time: timer.start_timestamp(),
                finish_time: timer.finish_timestamp(),
                elapsed_time: timer.elapsed_seconds(),
            },
            track_id: session.track.id.clone(),
        }
    }
}

fn network_active(network: Res<NetworkManager>) -> bool {
    network.is_active()
}

fn sync_network_with_config(config: Res<GameConfig>, mut network: ResMut<NetworkManager>) {
    let settings = &config.game.network;
    network.send_interval_ms = settings.send_interval_ms;
    network.outbox_capacity = settings.outbox_capacity.max(1);

    if settings.enabled && !network.is_active() {
        network.initialize_multiplayer(&settings.server_url);
    } else if !settings.enabled && network.is_active() {
        network.disconnect();
    }
}

fn publish_player_state(
    time: Res<Time>,
    session: Res<SimulationSession>,
    mut network: ResMut<NetworkManager>,
) {
    let snapshot = PlayerStateSnapshot::capture(&session);
    let now_ms = time.elapsed().as_millis() as u64;
    if let Err(error) = network.send_player_state(&snapshot, now_ms) {
        warn!("Failed to encode player update: {error}");
    }
}
