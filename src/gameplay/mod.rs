pub mod race;
pub mod session;
pub mod track;
pub mod vehicle;

use crate::states::GameState;
use bevy::prelude::*;
use session::{SessionPlugin, SimulationSession};
use track::TrackGameplayPlugin;
use vehicle::VehicleGameplayPlugin;

/// Per-frame stages of a race, run in order while a session is active.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceSet {
    Input,
    Simulate,
    Present,
}

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (RaceSet::Input, RaceSet::Simulate, RaceSet::Present)
                .chain()
                .run_if(in_state(GameState::InRace))
                .run_if(resource_exists::<SimulationSession>),
        )
        .add_plugins(VehicleGameplayPlugin)
        .add_plugins(TrackGameplayPlugin)
        .add_plugins(SessionPlugin);
    }
}
