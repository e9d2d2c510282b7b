use crate::config::GameConfig;
use crate::states::GameState;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

const ZONE_FILL: Color = Color::srgba(0.05, 0.07, 0.09, 0.08);
const ZONE_EDGE_IDLE: Color = Color::srgba(0.80, 0.86, 0.90, 0.18);
const ZONE_EDGE_HELD: Color = Color::srgba(1.0, 0.85, 0.0, 0.70);

/// Browser canvas setup and the on-screen driving lanes used on touch devices.
pub struct WebSupportPlugin;

impl Plugin for WebSupportPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TouchDriveInput>()
            .init_resource::<WebMode>()
            .add_systems(Startup, fit_canvas_to_browser)
            .add_systems(
                Update,
                refresh_web_mode.run_if(resource_exists_and_changed::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::InRace), spawn_touch_pad)
            .add_systems(OnExit(GameState::InRace), despawn_touch_pad)
            .add_systems(
                Update,
                (sample_touch_pad, highlight_touch_pad)
                    .chain()
                    .run_if(in_state(GameState::InRace)),
            );
    }
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebMode {
    pub active: bool,
    pub touch_pad: bool,
}

impl Default for WebMode {
    fn default() -> Self {
        Self {
            active: cfg!(target_arch = "wasm32"),
            touch_pad: true,
        }
    }
}

impl WebMode {
    fn touch_pad_enabled(&self) -> bool {
        self.active && self.touch_pad
    }
}

/// Pedal and steering signals held through the touch pad this frame.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchDriveInput {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
}

impl TouchDriveInput {
    fn hold(&mut self, lane: DriveLane) {
        *self.signal_mut(lane) = true;
    }

    fn holds(&self, lane: DriveLane) -> bool {
        match lane {
            DriveLane::Left => self.turn_left,
            DriveLane::Brake => self.brake,
            DriveLane::Accelerate => self.accelerate,
            DriveLane::Right => self.turn_right,
        }
    }

    fn signal_mut(&mut self, lane: DriveLane) -> &mut bool {
        match lane {
            DriveLane::Left => &mut self.turn_left,
            DriveLane::Brake => &mut self.brake,
            DriveLane::Accelerate => &mut self.accelerate,
            DriveLane::Right => &mut self.turn_right,
        }
    }
}

/// Screen quarters, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveLane {
    Left,
    Brake,
    Accelerate,
    Right,
}

impl DriveLane {
    const ALL: [Self; 4] = [Self::Left, Self::Brake, Self::Accelerate, Self::Right];

    fn caption(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Brake => "BRAKE",
            Self::Accelerate => "ACCEL",
            Self::Right => "RIGHT",
        }
    }

    fn under(x: f32, screen_width: f32) -> Self {
        let quarter = screen_width.max(1.0) / Self::ALL.len() as f32;
        let slot = (x / quarter).floor().max(0.0) as usize;
        Self::ALL[slot.min(Self::ALL.len() - 1)]
    }
}

#[derive(Component)]
struct TouchPad;

#[derive(Component)]
struct TouchPadZone(DriveLane);

#[cfg(target_arch = "wasm32")]
fn fit_canvas_to_browser(mut windows: Query<&mut Window, With<PrimaryWindow>>) {
    let Ok(mut window) = windows.single_mut() else {
        return;
    };
    window.fit_canvas_to_parent = true;
    // Keeps the page from scrolling or zooming while a thumb rests on a lane.
    window.prevent_default_event_handling = true;
}

#[cfg(not(target_arch = "wasm32"))]
fn fit_canvas_to_browser() {}

fn refresh_web_mode(config: Res<GameConfig>, mut mode: ResMut<WebMode>) {
    let next = WebMode {
        active: config.is_web_mode_active(),
        touch_pad: config.game.web.show_touch_controls,
    };
    if *mode != next {
        info!(
            "Web mode {}, touch pad {}.",
            if next.active { "on" } else { "off" },
            if next.touch_pad { "enabled" } else { "disabled" }
        );
        *mode = next;
    }
}

fn spawn_touch_pad(mut commands: Commands, existing: Query<(), With<TouchPad>>) {
    if !existing.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("TouchPad"),
            TouchPad,
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                ..default()
            },
            Visibility::Hidden,
            ZIndex(150),
        ))
        .with_children(|pad| {
            for lane in DriveLane::ALL {
                pad.spawn((
                    Name::new(format!("TouchPadZone:{}", lane.caption())),
                    TouchPadZone(lane),
                    Node {
                        width: Val::Percent(25.0),
                        height: Val::Percent(100.0),
                        flex_direction: FlexDirection::Column,
                        justify_content: JustifyContent::FlexEnd,
                        align_items: AlignItems::Center,
                        padding: UiRect::bottom(Val::Px(24.0)),
                        border: UiRect::horizontal(Val::Px(2.0)),
                        ..default()
                    },
                    BackgroundColor(ZONE_FILL),
                    BorderColor::all(ZONE_EDGE_IDLE),
                ))
                .with_child((
                    Text::new(lane.caption()),
                    TextFont {
                        font_size: 22.0,
                        ..default()
                    },
                    TextColor(Color::srgba(1.0, 1.0, 1.0, 0.65)),
                ));
            }
        });
}

fn despawn_touch_pad(
    mut commands: Commands,
    pads: Query<Entity, With<TouchPad>>,
    mut touch_input: ResMut<TouchDriveInput>,
) {
    for entity in &pads {
        commands.entity(entity).try_despawn();
    }
    *touch_input = TouchDriveInput::default();
}

fn sample_touch_pad(
    mode: Res<WebMode>,
    touches: Res<Touches>,
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut touch_input: ResMut<TouchDriveInput>,
) {
    let mut held = TouchDriveInput::default();

    if mode.touch_pad_enabled() {
        if let Ok(window) = windows.single() {
            let width = window.width();
            let mouse_x = mouse
                .pressed(MouseButton::Left)
                .then(|| window.cursor_position())
                .flatten()
                .map(|cursor| cursor.x);

            for x in touches.iter().map(|touch| touch.position().x).chain(mouse_x) {
                held.hold(DriveLane::under(x, width));
            }
        }
    }

    if *touch_input != held {
        *touch_input = held;
    }
}

fn highlight_touch_pad(
    mode: Res<WebMode>,
    touch_input: Res<TouchDriveInput>,
    mut pads: Query<&mut Visibility, With<TouchPad>>,
    mut zones: Query<(&TouchPadZone, &mut BorderColor)>,
) {
    let Ok(mut visibility) = pads.single_mut() else {
        return;
    };
    *visibility = if mode.touch_pad_enabled() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    if !touch_input.is_changed() {
        return;
    }
    for (zone, mut border) in &mut zones {
        let edge = if touch_input.holds(zone.0) {
            ZONE_EDGE_HELD
        } else {
            ZONE_EDGE_IDLE
        };
        *border = BorderColor::all(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_quarters_map_to_lanes() {
        assert_eq!(DriveLane::under(10.0, 800.0), DriveLane::Left);
        assert_eq!(DriveLane::under(250.0, 800.0), DriveLane::Brake);
        assert_eq!(DriveLane::under(450.0, 800.0), DriveLane::Accelerate);
        assert_eq!(DriveLane::under(799.0, 800.0), DriveLane::Right);
    }

    #[test]
    fn positions_off_screen_fall_into_the_edge_lanes() {
        assert_eq!(DriveLane::under(-5.0, 800.0), DriveLane::Left);
        assert_eq!(DriveLane::under(900.0, 800.0), DriveLane::Right);
        assert_eq!(DriveLane::under(5.0, 0.0), DriveLane::Right);
    }

    #[test]
    fn held_lanes_set_matching_signals() {
        let mut input = TouchDriveInput::default();
        input.hold(DriveLane::Accelerate);
        input.hold(DriveLane::Left);

        assert!(input.accelerate && input.turn_left);
        assert!(!input.brake && !input.turn_right);
        assert!(input.holds(DriveLane::Left));
        assert!(!input.holds(DriveLane::Right));
    }

    #[test]
    fn touch_pad_needs_web_mode_and_the_setting() {
        let desktop = WebMode {
            active: false,
            touch_pad: true,
        };
        let browser = WebMode {
            active: true,
            touch_pad: true,
        };
        let hidden = WebMode {
            active: true,
            touch_pad: false,
        };

        assert!(!desktop.touch_pad_enabled());
        assert!(browser.touch_pad_enabled());
        assert!(!hidden.touch_pad_enabled());
    }
}
