use crate::config::GameConfig;
use crate::gameplay::session::{ResetCause, SimulationSession};
use crate::gameplay::vehicle::scene::FollowCamera;
use bevy::app::AppExit;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

const TRACK_KEYS: [KeyCode; 9] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    TrackSelect,
    InRace,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .add_systems(Startup, setup_camera)
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(
                Update,
                boot_to_track_select
                    .run_if(in_state(GameState::Boot))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::TrackSelect), enter_track_select)
            .add_systems(OnExit(GameState::TrackSelect), cleanup_track_menu)
            .add_systems(
                Update,
                track_select_controls
                    .run_if(in_state(GameState::TrackSelect))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::InRace), enter_in_race)
            .add_systems(OnExit(GameState::InRace), end_session)
            .add_systems(Update, in_race_controls.run_if(in_state(GameState::InRace)));
    }
}

#[derive(Component)]
struct TrackMenuRoot;

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("FollowCamera"),
        FollowCamera,
        Camera3d::default(),
        Transform::from_xyz(0.0, 3.5, 30.0).looking_at(Vec3::new(0.0, 0.5, 22.0), Vec3::Y),
    ));
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_track_select(
    config: Res<GameConfig>,
    mut commands: Commands,
    mut next_state: ResMut<NextState<GameState>>,
    mut window_query: Query<&mut Window, With<PrimaryWindow>>,
) {
    if let Ok(mut window) = window_query.single_mut() {
        window.title = config.game.app.window_title.clone();
    }
    commands.insert_resource(ClearColor(Color::srgb_from_array(
        config.game.presentation.sky_color,
    )));
    next_state.set(GameState::TrackSelect);
}

fn enter_track_select(mut commands: Commands, config: Res<GameConfig>) {
    info!("Entered state: TrackSelect");

    let menu_text = track_menu_text(&config);
    commands
        .spawn((
            Name::new("TrackMenu"),
            TrackMenuRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.01, 0.02, 0.03, 0.80)),
            ZIndex(300),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        min_width: Val::Px(420.0),
                        flex_direction: FlexDirection::Column,
                        row_gap: Val::Px(10.0),
                        padding: UiRect::all(Val::Px(16.0)),
                        border: UiRect::all(Val::Px(1.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.08, 0.10, 0.13, 0.96)),
                    BorderColor::all(Color::srgba(0.56, 0.62, 0.68, 0.92)),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        Text::new("SELECT TRACK"),
                        TextFont {
                            font_size: 44.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.94, 0.97, 1.00)),
                    ));
                    panel.spawn((
                        Text::new(menu_text),
                        TextFont {
                            font_size: 22.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.90, 0.94, 0.98)),
                    ));
                });
        });
}

fn cleanup_track_menu(mut commands: Commands, menu_query: Query<Entity, With<TrackMenuRoot>>) {
    for entity in &menu_query {
        commands.entity(entity).try_despawn();
    }
}

fn track_select_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<GameConfig>,
    mut commands: Commands,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
        return;
    }

    let chosen = config.game.app.auto_select_track.clone().or_else(|| {
        TRACK_KEYS
            .iter()
            .zip(&config.tracks.tracks)
            .find(|(key, _)| keyboard.just_pressed(**key))
            .map(|(_, track)| track.id.clone())
    });
    let Some(track_id) = chosen else {
        return;
    };

    match SimulationSession::from_config(&config, &track_id) {
        Ok(mut session) => {
            session.reset(ResetCause::TrackSelected);
            info!(
                "Selected track `{}` ({}) with physics profile `{}`.",
                session.track.id, session.track.name, session.physics.id
            );
            commands.insert_resource(session);
            next_state.set(GameState::InRace);
        }
        Err(error) => error!("Track selection failed: {error}"),
    }
}

fn enter_in_race() {
    info!("Entered state: InRace");
}

fn in_race_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Option<Res<GameConfig>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let auto_selected = config
        .map(|config| config.game.app.auto_select_track.is_some())
        .unwrap_or(false);
    if keyboard.just_pressed(KeyCode::Escape) && !auto_selected {
        next_state.set(GameState::TrackSelect);
    }
}

fn end_session(mut commands: Commands) {
    commands.remove_resource::<SimulationSession>();
    info!("Race session ended.");
}

fn track_menu_text(config: &GameConfig) -> String {
    let mut lines = config
        .tracks
        .tracks
        .iter()
        .zip(1..=TRACK_KEYS.len())
        .map(|(track, number)| {
            if track.description.is_empty() {
                format!("{number} - {}", track.name)
            } else {
                format!("{number} - {}: {}", track.name, track.description)
            }
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push("Q - Quit".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;

    #[test]
    fn menu_numbers_tracks_in_config_order() {
        let text = track_menu_text(&sample_config());

        assert!(text.starts_with("1 - Straight Sprint\n2 - Grand Loop"));
        assert!(text.ends_with("Q - Quit"));
    }
}
