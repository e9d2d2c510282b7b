use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = "config";

const GAME_FILE: &str = "game.toml";
const PHYSICS_FILE: &str = "physics.toml";
const TRACKS_FILE: &str = "tracks.toml";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_for_platform().unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_for_platform() {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {} tracks, {} physics profiles, network {}.",
        config.tracks.tracks.len(),
        config.physics_by_id.len(),
        if config.game.network.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub physics: PhysicsFile,
    pub tracks: TracksFile,
    pub physics_by_id: HashMap<String, PhysicsProfile>,
    pub tracks_by_id: HashMap<String, TrackConfig>,
}

impl GameConfig {
    /// Native builds read `config/` from disk so F5 picks up edits; the browser build has no
    /// filesystem and uses the copies embedded at compile time.
    pub fn load_for_platform() -> Result<Self, ConfigError> {
        if cfg!(target_arch = "wasm32") {
            Self::load_embedded()
        } else {
            Self::load_from_dir(Path::new(CONFIG_DIR))
        }
    }

    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join(GAME_FILE))?;
        let physics: PhysicsFile = read_toml(&config_dir.join(PHYSICS_FILE))?;
        let tracks: TracksFile = read_toml(&config_dir.join(TRACKS_FILE))?;
        Self::from_files(game, physics, tracks)
    }

    pub fn load_embedded() -> Result<Self, ConfigError> {
        let dir = Path::new(CONFIG_DIR);
        let game: GameFile = parse_toml(
            &dir.join(GAME_FILE),
            include_str!("../../config/game.toml"),
        )?;
        let physics: PhysicsFile = parse_toml(
            &dir.join(PHYSICS_FILE),
            include_str!("../../config/physics.toml"),
        )?;
        let tracks: TracksFile = parse_toml(
            &dir.join(TRACKS_FILE),
            include_str!("../../config/tracks.toml"),
        )?;
        Self::from_files(game, physics, tracks)
    }

    fn from_files(
        game: GameFile,
        physics: PhysicsFile,
        tracks: TracksFile,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            physics_by_id: to_index("physics.toml::profiles", &physics.profiles)?,
            tracks_by_id: to_index("tracks.toml::tracks", &tracks.tracks)?,
            game,
            physics,
            tracks,
        };

        config.validate_references()?;
        Ok(config)
    }

    pub fn is_web_mode_active(&self) -> bool {
        cfg!(target_arch = "wasm32") || self.game.web.force_web_mode
    }

    pub fn physics_for_track(&self, track: &TrackConfig) -> Option<&PhysicsProfile> {
        self.physics_by_id.get(&track.physics_profile)
    }

    /// Replaces a physics profile in both the ordered list and the id index.
    pub fn replace_physics_profile(&mut self, profile: PhysicsProfile) -> Result<(), String> {
        let Some(indexed) = self.physics_by_id.get_mut(&profile.id) else {
            return Err(format!(
                "physics profile `{}` not found in physics_by_id",
                profile.id
            ));
        };
        *indexed = profile.clone();

        let Some(listed) = self
            .physics
            .profiles
            .iter_mut()
            .find(|row| row.id == profile.id)
        else {
            return Err(format!(
                "physics profile `{}` not found in profiles list",
                profile.id
            ));
        };
        *listed = profile;
        Ok(())
    }

    fn validate_references(&self) -> Result<(), ConfigError> {
        let app = &self.game.app;
        if let Some(track_id) = app.auto_select_track.as_deref() {
            if !self.tracks_by_id.contains_key(track_id) {
                return Err(ConfigError::Validation(format!(
                    "game.toml::app.auto_select_track references unknown track id `{track_id}`"
                )));
            }
        }
        if app.auto_reset_seconds < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app.auto_reset_seconds must be >= 0".to_string(),
            ));
        }

        let camera = &self.game.camera;
        if !(0.0 < camera.follow_lerp && camera.follow_lerp <= 1.0) {
            return Err(ConfigError::Validation(
                "game.toml::camera.follow_lerp must be in (0, 1]".to_string(),
            ));
        }

        let network = &self.game.network;
        if network.enabled && network.server_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "game.toml::network.server_url cannot be empty when network is enabled"
                    .to_string(),
            ));
        }
        if network.send_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "game.toml::network.send_interval_ms must be >= 1".to_string(),
            ));
        }
        if network.outbox_capacity == 0 {
            return Err(ConfigError::Validation(
                "game.toml::network.outbox_capacity must be >= 1".to_string(),
            ));
        }

        for (index, profile) in self.physics.profiles.iter().enumerate() {
            profile
                .validate()
                .map_err(|message| {
                    ConfigError::Validation(format!(
                        "physics.toml::profiles[{index}].{message}"
                    ))
                })?;
        }

        if self.tracks.tracks.is_empty() {
            return Err(ConfigError::Validation(
                "tracks.toml::tracks must contain at least one track".to_string(),
            ));
        }

        for (index, track) in self.tracks.tracks.iter().enumerate() {
            if !self.physics_by_id.contains_key(&track.physics_profile) {
                return Err(ConfigError::Validation(format!(
                    "tracks.toml::tracks[{index}].physics_profile references unknown profile id `{}`",
                    track.physics_profile
                )));
            }
            if track.name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "tracks.toml::tracks[{index}].name cannot be empty"
                )));
            }

            match &track.shape {
                TrackShapeConfig::Straight(shape) => validate_straight_shape(index, shape)?,
                TrackShapeConfig::Loop(shape) => validate_loop_shape(index, shape)?,
            }
        }

        Ok(())
    }
}

fn validate_straight_shape(index: usize, shape: &StraightShapeConfig) -> Result<(), ConfigError> {
    if shape.left >= shape.right {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape requires left < right"
        )));
    }
    if shape.top >= shape.bottom {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape requires top < bottom"
        )));
    }
    if !(shape.top..=shape.bottom).contains(&shape.finish_z) {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape.finish_z must lie within [top, bottom]"
        )));
    }
    let [x, _, z] = shape.start_position;
    if !(shape.left..=shape.right).contains(&x) || !(shape.top..=shape.bottom).contains(&z) {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape.start_position must lie inside the track bounds"
        )));
    }
    if z < shape.finish_z {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape.start_position is already past finish_z"
        )));
    }
    Ok(())
}

fn validate_loop_shape(index: usize, shape: &LoopShapeConfig) -> Result<(), ConfigError> {
    if shape.inner_radius < 0.0 || shape.inner_radius >= shape.outer_radius {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape requires 0 <= inner_radius < outer_radius"
        )));
    }
    if shape.start_enter_distance <= 0.0
        || shape.start_enter_distance >= shape.start_clear_distance
    {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape requires 0 < start_enter_distance < start_clear_distance"
        )));
    }
    if shape.finish_enter_distance <= 0.0
        || shape.finish_enter_distance >= shape.finish_clear_distance
    {
        return Err(ConfigError::Validation(format!(
            "tracks.toml::tracks[{index}].shape requires 0 < finish_enter_distance < finish_clear_distance"
        )));
    }
    for (barrier_index, barrier) in shape.barriers.iter().enumerate() {
        if barrier.half_width <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "tracks.toml::tracks[{index}].shape.barriers[{barrier_index}].half_width must be > 0"
            )));
        }
        if barrier.thickness <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "tracks.toml::tracks[{index}].shape.barriers[{barrier_index}].thickness must be > 0"
            )));
        }
    }
    Ok(())
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml(path, &raw)
}

fn parse_toml<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub camera: CameraConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub window_title: String,
    #[serde(default)]
    pub auto_select_track: Option<String>,
    pub debug_overlay: bool,
    #[serde(default = "default_auto_reset_seconds")]
    pub auto_reset_seconds: f64,
}

fn default_auto_reset_seconds() -> f64 {
    3.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub follow_offset: [f32; 3],
    pub look_at_height: f32,
    pub follow_lerp: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationConfig {
    #[serde(default = "default_wheel_spin_factor")]
    pub wheel_spin_factor: f32,
    #[serde(default = "default_sky_color")]
    pub sky_color: [f32; 3],
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            wheel_spin_factor: default_wheel_spin_factor(),
            sky_color: default_sky_color(),
        }
    }
}

fn default_wheel_spin_factor() -> f32 {
    0.2
}

fn default_sky_color() -> [f32; 3] {
    [0.53, 0.81, 0.92]
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub enabled: bool,
    pub server_url: String,
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: String::new(),
            send_interval_ms: default_send_interval_ms(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_send_interval_ms() -> u64 {
    50
}

fn default_outbox_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub show_touch_controls: bool,
    #[serde(default)]
    pub force_web_mode: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            show_touch_controls: true,
            force_web_mode: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsFile {
    pub profiles: Vec<PhysicsProfile>,
}

/// Per-frame tuning for the kinematic car. All rates are applied once per tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhysicsProfile {
    pub id: String,
    pub max_speed: f32,
    pub acceleration: f32,
    pub braking_force: f32,
    pub emergency_brake_force: f32,
    pub friction: f32,
    pub turn_speed: f32,
    pub stop_epsilon: f32,
}

impl PhysicsProfile {
    pub fn min_speed(&self) -> f32 {
        -self.max_speed * 0.5
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_speed <= 0.0 {
            return Err("max_speed must be > 0".to_string());
        }
        if self.acceleration <= 0.0 {
            return Err("acceleration must be > 0".to_string());
        }
        if self.braking_force < 0.0 {
            return Err("braking_force must be >= 0".to_string());
        }
        if self.emergency_brake_force < 0.0 {
            return Err("emergency_brake_force must be >= 0".to_string());
        }
        if !(0.0 < self.friction && self.friction <= 1.0) {
            return Err("friction must be in (0, 1]".to_string());
        }
        if self.turn_speed < 0.0 {
            return Err("turn_speed must be >= 0".to_string());
        }
        if self.stop_epsilon < 0.0 {
            return Err("stop_epsilon must be >= 0".to_string());
        }
        Ok(())
    }
}

impl HasId for PhysicsProfile {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksFile {
    pub tracks: Vec<TrackConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub physics_profile: String,
    pub shape: TrackShapeConfig,
}

impl HasId for TrackConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackShapeConfig {
    Straight(StraightShapeConfig),
    Loop(LoopShapeConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StraightShapeConfig {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub finish_z: f32,
    pub start_line_z: f32,
    pub start_position: [f32; 3],
    #[serde(default)]
    pub start_heading_deg: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoopShapeConfig {
    pub center: [f32; 2],
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub start_line_angle_deg: f32,
    pub spawn_offset_deg: f32,
    pub finish_line_angle_deg: f32,
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f32,
    #[serde(default = "default_start_enter_distance")]
    pub start_enter_distance: f32,
    #[serde(default = "default_start_clear_distance")]
    pub start_clear_distance: f32,
    #[serde(default = "default_finish_enter_distance")]
    pub finish_enter_distance: f32,
    #[serde(default = "default_finish_clear_distance")]
    pub finish_clear_distance: f32,
    #[serde(default)]
    pub barriers: Vec<BarrierConfig>,
}

fn default_spawn_height() -> f32 {
    0.5
}

fn default_start_enter_distance() -> f32 {
    16.0
}

fn default_start_clear_distance() -> f32 {
    24.0
}

fn default_finish_enter_distance() -> f32 {
    2.0
}

fn default_finish_clear_distance() -> f32 {
    5.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarrierConfig {
    pub angle_deg: f32,
    #[serde(default)]
    pub radial_offset: f32,
    pub half_width: f32,
    pub thickness: f32,
}
