use crate::config::{GameConfig, PhysicsProfile, CONFIG_DIR};
use crate::gameplay::session::SimulationSession;
use crate::gameplay::vehicle::VehicleInput;
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use std::fs;
use std::path::Path;

const PHYSICS_FILE: &str = "physics.toml";

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugOverlayState>()
            .init_resource::<ControlsHelpState>()
            .init_resource::<PhysicsTuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, (toggle_debug_overlay, toggle_controls_help))
            .add_systems(Update, toggle_physics_tuning_panel)
            .add_systems(Update, sync_debug_overlay_visibility)
            .add_systems(
                Update,
                refresh_debug_overlay
                    .run_if(in_state(GameState::InRace))
                    .run_if(resource_exists::<SimulationSession>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                physics_tuning_panel_ui
                    .run_if(in_state(GameState::InRace))
                    .run_if(resource_exists::<GameConfig>)
                    .run_if(resource_exists::<SimulationSession>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct ControlsHelpText;

#[derive(Resource, Debug, Clone)]
struct DebugOverlayState {
    visible: bool,
}

impl Default for DebugOverlayState {
    fn default() -> Self {
        Self { visible: true }
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct ControlsHelpState {
    visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct PhysicsTuningParams {
    max_speed: f32,
    acceleration: f32,
    braking_force: f32,
    emergency_brake_force: f32,
    friction: f32,
    turn_speed: f32,
    stop_epsilon: f32,
}

impl PhysicsTuningParams {
    fn from_profile(profile: &PhysicsProfile) -> Self {
        Self {
            max_speed: profile.max_speed,
            acceleration: profile.acceleration,
            braking_force: profile.braking_force,
            emergency_brake_force: profile.emergency_brake_force,
            friction: profile.friction,
            turn_speed: profile.turn_speed,
            stop_epsilon: profile.stop_epsilon,
        }
    }

    fn apply_to_profile(&self, profile: &mut PhysicsProfile) {
        profile.max_speed = self.max_speed;
        profile.acceleration = self.acceleration;
        profile.braking_force = self.braking_force;
        profile.emergency_brake_force = self.emergency_brake_force;
        profile.friction = self.friction;
        profile.turn_speed = self.turn_speed;
        profile.stop_epsilon = self.stop_epsilon;
    }

    fn fields(&self) -> [(&'static str, f32); 7] {
        [
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("braking_force", self.braking_force),
            ("emergency_brake_force", self.emergency_brake_force),
            ("friction", self.friction),
            ("turn_speed", self.turn_speed),
            ("stop_epsilon", self.stop_epsilon),
        ]
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct PhysicsTuningPanelState {
    visible: bool,
    source_profile_id: String,
    params: Option<PhysicsTuningParams>,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    controls_help: Res<ControlsHelpState>,
    config: Option<Res<GameConfig>>,
    existing: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new("Select a track to start driving."),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::WHITE),
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            top: Val::Px(10.0),
            padding: UiRect::all(Val::Px(8.0)),
            ..default()
        },
        ZIndex(100),
    ));

    commands.spawn((
        ControlsHelpText,
        Text::new(controls_help_text()),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            bottom: Val::Px(10.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        if controls_help.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
        ZIndex(100),
    ));
}

fn toggle_debug_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<DebugOverlayState>,
) {
    if keyboard.just_pressed(KeyCode::F3) {
        state.visible = !state.visible;
        info!(
            "Debug overlay {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn toggle_controls_help(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<ControlsHelpState>,
    config: Option<Res<GameConfig>>,
) {
    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Controls help {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

#[allow(clippy::type_complexity)]
fn sync_debug_overlay_visibility(
    overlay_state: Res<DebugOverlayState>,
    help_state: Res<ControlsHelpState>,
    mut overlay_query: Query<&mut Visibility, (With<DebugOverlayText>, Without<ControlsHelpText>)>,
    mut help_query: Query<&mut Visibility, (With<ControlsHelpText>, Without<DebugOverlayText>)>,
) {
    if overlay_state.is_changed() {
        for mut visibility in &mut overlay_query {
            *visibility = visible_if(overlay_state.visible);
        }
    }

    if help_state.is_changed() {
        for mut visibility in &mut help_query {
            *visibility = visible_if(help_state.visible);
        }
    }
}

fn visible_if(visible: bool) -> Visibility {
    if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn refresh_debug_overlay(
    diagnostics: Res<DiagnosticsStore>,
    session: Res<SimulationSession>,
    input: Option<Res<VehicleInput>>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);
    let input = input.as_deref().copied().unwrap_or_default();

    *text = Text::new(debug_overlay_text(fps, &session, &input));
}

fn debug_overlay_text(fps: f64, session: &SimulationSession, input: &VehicleInput) -> String {
    let vehicle = &session.vehicle;
    let position = vehicle.position.round();

    let mut controls = Vec::new();
    if input.accelerate {
        controls.push("Accelerating");
    }
    if input.brake {
        controls.push("Braking");
    }
    if input.turn_left {
        controls.push("Turning Left");
    }
    if input.turn_right {
        controls.push("Turning Right");
    }
    if input.emergency_brake {
        controls.push("EMERGENCY BRAKE");
    }
    let controls = if controls.is_empty() {
        "none".to_string()
    } else {
        controls.join(" ")
    };

    format!(
        "FPS: {fps:.0}\n\
Track: {track} ({profile})\n\
Speed: {speed:.1}\n\
Position: ({x}, {y}, {z})\n\
Controls: {controls}\n\
Phase: {phase} | Lap: {lap}\n\
Crossing start: {crossing_start} | Crossing finish: {crossing_finish}",
        track = session.track.name,
        profile = session.physics.id,
        speed = (vehicle.speed * 10.0).round() / 10.0,
        x = position.x,
        y = position.y,
        z = position.z,
        phase = session.timer.phase().label(),
        lap = vehicle.lap,
        crossing_start = vehicle.crossing_start,
        crossing_finish = vehicle.crossing_finish,
    )
}

fn toggle_physics_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<PhysicsTuningPanelState>,
    config: Option<Res<GameConfig>>,
    session: Option<Res<SimulationSession>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyP) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    if panel_state.visible {
        if let (Some(config), Some(session)) = (config, session) {
            if let Err(error) = load_panel_params(
                &mut panel_state,
                &config,
                &session.track.physics_profile,
            ) {
                panel_state.status = error;
            }
        }
        info!("Physics tuning panel shown.");
    } else {
        info!("Physics tuning panel hidden.");
    }
}

fn physics_tuning_panel_ui(
    mut contexts: EguiContexts,
    mut panel_state: ResMut<PhysicsTuningPanelState>,
    mut config: ResMut<GameConfig>,
    session: Res<SimulationSession>,
) {
    if !panel_state.visible {
        return;
    }

    let active_profile_id = session.track.physics_profile.clone();
    if panel_state.params.is_none() || panel_state.source_profile_id != active_profile_id {
        if let Err(error) =
            load_panel_params(&mut panel_state, &config, &active_profile_id)
        {
            panel_state.status = error;
            return;
        }
    }

    let Some(mut params) = panel_state.params.clone() else {
        return;
    };

    let mut window_open = panel_state.visible;
    let mut params_changed = false;
    let mut revert_clicked = false;
    let mut save_clicked = false;
    let status = panel_state.status.clone();

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Physics Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(460.0)
        .show(ctx, |ui| {
            ui.label(format!("Profile: {active_profile_id}"));
            ui.label("Rates are applied once per frame.");
            ui.separator();

            params_changed |=
                tuning_slider_row(ui, "max_speed", &mut params.max_speed, 0.1..=60.0, 0.05);
            params_changed |= tuning_slider_row(
                ui,
                "acceleration",
                &mut params.acceleration,
                0.001..=0.2,
                0.001,
            );
            params_changed |= tuning_slider_row(
                ui,
                "braking_force",
                &mut params.braking_force,
                0.0..=2.0,
                0.005,
            );
            params_changed |= tuning_slider_row(
                ui,
                "emergency_brake_force",
                &mut params.emergency_brake_force,
                0.0..=4.0,
                0.005,
            );
            params_changed |=
                tuning_slider_row(ui, "friction", &mut params.friction, 0.5..=1.0, 0.001);
            params_changed |=
                tuning_slider_row(ui, "turn_speed", &mut params.turn_speed, 0.0..=0.2, 0.001);
            params_changed |= tuning_slider_row(
                ui,
                "stop_epsilon",
                &mut params.stop_epsilon,
                0.0..=0.1,
                0.0005,
            );

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Revert").clicked() {
                    revert_clicked = true;
                }
                if ui.button("Save to physics.toml").clicked() {
                    save_clicked = true;
                }
            });

            if !status.is_empty() {
                ui.separator();
                ui.label(status);
            }
        });

    panel_state.visible = window_open;

    if revert_clicked {
        match load_panel_params(&mut panel_state, &config, &active_profile_id) {
            Ok(()) => panel_state.status = "Sliders reset to the loaded profile.".to_string(),
            Err(error) => panel_state.status = error,
        }
        return;
    }

    panel_state.params = Some(params.clone());

    if params_changed {
        match apply_live_tuning(&mut config, &active_profile_id, &params) {
            Ok(()) => {
                panel_state.status = "Live values applied to the running car.".to_string()
            }
            Err(error) => panel_state.status = error,
        }
    }

    if save_clicked {
        match save_tuning_to_disk(&mut config, &active_profile_id, &params) {
            Ok(message) => {
                panel_state.status = message;
                if let Err(error) =
                    load_panel_params(&mut panel_state, &config, &active_profile_id)
                {
                    panel_state.status = error;
                }
            }
            Err(error) => panel_state.status = error,
        }
    }
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed |= ui
            .add(egui::Slider::new(value, slider_range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(value).speed(drag_speed as f64))
            .changed();
    });
    changed
}

fn load_panel_params(
    panel_state: &mut PhysicsTuningPanelState,
    config: &GameConfig,
    profile_id: &str,
) -> Result<(), String> {
    let Some(profile) = config.physics_by_id.get(profile_id) else {
        return Err(format!(
            "Physics tuning panel: profile `{profile_id}` not found in config."
        ));
    };

    panel_state.source_profile_id = profile_id.to_string();
    panel_state.params = Some(PhysicsTuningParams::from_profile(profile));
    Ok(())
}

fn apply_live_tuning(
    config: &mut GameConfig,
    profile_id: &str,
    params: &PhysicsTuningParams,
) -> Result<(), String> {
    let Some(current) = config.physics_by_id.get(profile_id) else {
        return Err(format!(
            "Physics tuning panel: profile `{profile_id}` not found in physics_by_id."
        ));
    };

    let mut tuned = current.clone();
    params.apply_to_profile(&mut tuned);
    config
        .replace_physics_profile(tuned)
        .map_err(|error| format!("Physics tuning panel: {error}."))
}

fn save_tuning_to_disk(
    config: &mut GameConfig,
    profile_id: &str,
    params: &PhysicsTuningParams,
) -> Result<String, String> {
    let config_dir = Path::new(CONFIG_DIR);
    let path = config_dir.join(PHYSICS_FILE);
    let original_raw = fs::read_to_string(&path)
        .map_err(|error| format!("cannot read `{}`: {error}", path.display()))?;
    let mut root: toml::Value = toml::from_str(&original_raw)
        .map_err(|error| format!("cannot parse `{}`: {error}", path.display()))?;

    patch_profile_in_toml(&mut root, profile_id, params)?;

    let updated_raw = toml::to_string_pretty(&root)
        .map_err(|error| format!("cannot serialize physics profiles: {error}"))?;
    fs::write(&path, updated_raw)
        .map_err(|error| format!("cannot write `{}`: {error}", path.display()))?;

    match GameConfig::load_from_dir(config_dir) {
        Ok(new_config) => {
            *config = new_config;
            Ok(format!("Saved to {}.", path.display()))
        }
        Err(error) => {
            if let Err(write_error) = fs::write(&path, original_raw) {
                warn!("Failed restoring `{}`: {write_error}", path.display());
            }
            if let Ok(restored) = GameConfig::load_from_dir(config_dir) {
                *config = restored;
            }
            Err(format!(
                "Saved values were rejected ({error}); restored `{}`.",
                path.display()
            ))
        }
    }
}

fn patch_profile_in_toml(
    root: &mut toml::Value,
    profile_id: &str,
    params: &PhysicsTuningParams,
) -> Result<(), String> {
    let Some(profiles) = root.get_mut("profiles").and_then(toml::Value::as_array_mut) else {
        return Err("physics.toml: missing or invalid `profiles` array".to_string());
    };

    let Some(profile_table) = profiles.iter_mut().find_map(|profile_value| {
        let table = profile_value.as_table_mut()?;
        if table.get("id").and_then(toml::Value::as_str) == Some(profile_id) {
            Some(table)
        } else {
            None
        }
    }) else {
        return Err(format!(
            "physics.toml: could not find profile with id `{profile_id}`"
        ));
    };

    for (key, value) in params.fields() {
        set_toml_float(profile_table, key, value)?;
    }

    Ok(())
}

fn set_toml_float(
    table: &mut toml::map::Map<String, toml::Value>,
    key: &str,
    value: f32,
) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("`{key}` must be finite"));
    }

    table.insert(key.to_string(), toml::Value::Float(value as f64));
    Ok(())
}

fn controls_help_text() -> &'static str {
    "Keybinds\n\
H - Toggle this panel\n\
F3 - Toggle debug overlay\n\
P - Toggle physics tuning panel\n\
F5 - Hot-reload config\n\
W / Up - Accelerate\n\
S / Down - Brake / reverse\n\
A / Left - Turn left\n\
D / Right - Turn right\n\
Space - Emergency brake\n\
R - Reset car\n\
Esc - Back to track select"
}
