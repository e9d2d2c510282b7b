use crate::gameplay::race::{format_race_time, RacePhase, RaceTimer};
use crate::gameplay::session::SimulationSession;
use crate::gameplay::track::TrackDefinition;
use crate::states::GameState;
use bevy::prelude::*;

const HUD_PANEL_Z_INDEX: i32 = 190;
const HUD_PANEL_BG: Color = Color::srgba(0.06, 0.09, 0.12, 0.80);
const HUD_PANEL_BORDER: Color = Color::srgba(0.58, 0.68, 0.76, 0.92);
const HUD_TEXT_PRIMARY: Color = Color::srgb(0.94, 0.97, 1.0);
const HUD_TEXT_MUTED: Color = Color::srgb(0.76, 0.83, 0.9);
const BRAKE_TEXT_COLOR: Color = Color::srgb(1.0, 0.0, 0.0);

pub struct GameHudPlugin;

impl Plugin for GameHudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRace), spawn_game_hud)
            .add_systems(OnExit(GameState::InRace), cleanup_game_hud)
            .add_systems(
                Update,
                (update_game_hud, update_race_banners)
                    .chain()
                    .run_if(in_state(GameState::InRace))
                    .run_if(resource_exists::<SimulationSession>),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudTextKind {
    TrackName,
    TrackHint,
    Timer,
    Lap,
}

#[derive(Component)]
struct BrakeIndicator;

#[derive(Component)]
struct FinishNotification;

fn spawn_game_hud(mut commands: Commands, existing_hud: Query<Entity, With<GameHudRoot>>) {
    if !existing_hud.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                ..default()
            },
            ZIndex(HUD_PANEL_Z_INDEX),
        ))
        .with_children(|root| {
            root.spawn((
                Name::new("GameHudRacePanel"),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(10.0),
                    right: Val::Px(12.0),
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(4.0),
                    padding: UiRect::all(Val::Px(10.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(HUD_PANEL_BG),
                BorderColor::all(HUD_PANEL_BORDER),
            ))
            .with_children(|panel| {
                for (kind, initial, size, color) in [
                    (HudTextKind::TrackName, "", 16.0, HUD_TEXT_MUTED),
                    (HudTextKind::TrackHint, "", 13.0, HUD_TEXT_MUTED),
                    (HudTextKind::Timer, "Time: 0.00s", 24.0, HUD_TEXT_PRIMARY),
                    (HudTextKind::Lap, "", 18.0, HUD_TEXT_PRIMARY),
                ] {
                    panel.spawn((
                        kind,
                        Text::new(initial),
                        TextFont {
                            font_size: size,
                            ..default()
                        },
                        TextColor(color),
                    ));
                }
            });

            root.spawn((
                Name::new("BrakeIndicator"),
                BrakeIndicator,
                Text::new("BRAKING!"),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(BRAKE_TEXT_COLOR),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Percent(50.0),
                    left: Val::Percent(50.0),
                    ..default()
                },
                Visibility::Hidden,
            ));

            root.spawn((
                Name::new("FinishNotification"),
                FinishNotification,
                Text::new(""),
                TextFont {
                    font_size: 32.0,
                    ..default()
                },
                TextColor(HUD_TEXT_PRIMARY),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Percent(30.0),
                    left: Val::Percent(38.0),
                    padding: UiRect::all(Val::Px(16.0)),
                    ..default()
                },
                BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.7)),
                Visibility::Hidden,
            ));
        });
}

fn cleanup_game_hud(mut commands: Commands, hud_query: Query<Entity, With<GameHudRoot>>) {
    for entity in &hud_query {
        commands.entity(entity).try_despawn();
    }
}

fn update_game_hud(
    session: Res<SimulationSession>,
    mut text_query: Query<(&HudTextKind, &mut Text)>,
) {
    for (kind, mut text) in &mut text_query {
        let value = match kind {
            HudTextKind::TrackName => session.track.name.clone(),
            HudTextKind::TrackHint => track_hint_text(&session.track, &session.timer),
            HudTextKind::Timer => timer_text(&session.timer),
            HudTextKind::Lap => {
                if session.track.counts_laps() {
                    format!("Lap: {}", session.vehicle.lap)
                } else {
                    String::new()
                }
            }
        };
        if text.0 != value {
            text.0 = value;
        }
    }
}

#[allow(clippy::type_complexity)]
fn update_race_banners(
    time: Res<Time>,
    session: Res<SimulationSession>,
    mut brake_query: Query<&mut Visibility, (With<BrakeIndicator>, Without<FinishNotification>)>,
    mut finish_query: Query<(&mut Text, &mut Visibility), With<FinishNotification>>,
) {
    if let Ok(mut visibility) = brake_query.single_mut() {
        *visibility = if session.emergency_braking {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }

    let Ok((mut text, mut visibility)) = finish_query.single_mut() else {
        return;
    };
    match finish_notification_text(&session.timer, time.elapsed_secs_f64()) {
        Some(message) => {
            text.0 = message;
            *visibility = Visibility::Inherited;
        }
        None => *visibility = Visibility::Hidden,
    }
}

pub fn timer_text(timer: &RaceTimer) -> String {
    let elapsed = format_race_time(timer.elapsed_seconds());
    match timer.phase() {
        RacePhase::Finished => format!("Final Time: {elapsed}"),
        RacePhase::Idle | RacePhase::Running => format!("Time: {elapsed}"),
    }
}

/// The track description, shown until the car first moves off.
pub fn track_hint_text(track: &TrackDefinition, timer: &RaceTimer) -> String {
    match timer.phase() {
        RacePhase::Idle => track.description.clone(),
        RacePhase::Running | RacePhase::Finished => String::new(),
    }
}

pub fn finish_notification_text(timer: &RaceTimer, now: f64) -> Option<String> {
    if timer.phase() != RacePhase::Finished {
        return None;
    }
    let countdown = timer.reset_countdown(now).unwrap_or(0.0).ceil();
    Some(format!(
        "Finish!\nTime: {}\nResetting in {countdown:.0} seconds...",
        format_race_time(timer.elapsed_seconds())
    ))
}
