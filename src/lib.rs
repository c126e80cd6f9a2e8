//! Leaf particle simulation library
//!
//! Thousands of leaves settle, sleep, tumble in the wind, and react to tools
//! and hazards through a single impulse entry point.  A coarse density grid
//! over the leaves feeds a targeting oracle that tells AI hazards where to
//! strike.
//!
//! Add [`LeafDriftPlugin`] to an app that already has `MinimalPlugins` (or
//! `DefaultPlugins`), then write an [`stage::EnterStage`] message to populate
//! a stage.

pub mod config;
pub mod constants;
pub mod density;
pub mod error;
pub mod hazards;
pub mod interaction;
pub mod simulation;
pub mod stage;
pub mod stagger;
pub mod store;
pub mod targeting;
pub mod wind;

use bevy::prelude::*;

use config::LeafConfig;
use stage::{EnterStage, StageRegistry};

/// Frame order of the leaf systems, all in `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafSet {
    /// Stage entry: repopulate, respawn hazards.
    Stage,
    Wind,
    /// Tools queue impulses.
    Interact,
    /// Hazards queue impulses.
    Hazards,
    /// Integrate, contain, collide.
    Simulate,
    /// Refresh the density grid.
    Sample,
    Target,
}

/// Everything: config, stages, simulation, tools, hazards, targeting.
pub struct LeafDriftPlugin;

impl Plugin for LeafDriftPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LeafConfig>()
            .init_resource::<StageRegistry>()
            .add_message::<EnterStage>()
            .configure_sets(
                Update,
                (
                    LeafSet::Stage,
                    LeafSet::Wind,
                    LeafSet::Interact,
                    LeafSet::Hazards,
                    LeafSet::Simulate,
                    LeafSet::Sample,
                    LeafSet::Target,
                )
                    .chain(),
            )
            // Config first so every other startup system sees the final values.
            .add_systems(Startup, config::load_leaf_config)
            .add_systems(Update, stage::enter_stage_system.in_set(LeafSet::Stage))
            .add_plugins((
                simulation::SimulationPlugin,
                interaction::InteractionPlugin,
                hazards::HazardsPlugin,
                targeting::TargetingPlugin,
            ));
    }
}
