//! Environmental hazards that disturb the leaves.
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`burst`] | [`RadialBurst`] falloff kernel shared by every blast |
//! | [`vent`] | [`AirVent`]: fixed burst on a repeating timer |
//! | [`lightning`] | [`LightningStorm`]: volleys at random points of the stage |
//! | [`vortex`] | [`Vortex`]: funnel circling the stage centre |
//! | [`burrower`] | [`Burrower`]: hunts the densest pile and blasts it |
//!
//! Hazards are entities tagged [`StageHazard`], spawned by
//! [`spawn_stage_hazards`] on stage entry and despawned on the next one.  Like
//! the tools, they change particles only through the store's impulse API.

pub mod burrower;
pub mod burst;
pub mod lightning;
pub mod vent;
pub mod vortex;

pub use burrower::{Burrower, BurrowerPhase, BurrowerSpec};
pub use burst::RadialBurst;
pub use lightning::{LightningSpec, LightningStorm};
pub use vent::{AirVent, VentSpec};
pub use vortex::{Vortex, VortexSpec};

use bevy::prelude::*;
use serde::Deserialize;

use crate::config::LeafConfig;
use crate::constants::{SNIPER_SCATTER_FORCE, SNIPER_SCATTER_RADIUS};
use crate::error::SimResult;
use crate::stage::{ActiveStage, HazardSpec, StageLayout};
use crate::store::ParticleStore;
use crate::targeting::sniper::Sniper;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Marker for every entity that belongs to the current stage.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct StageHazard;

/// A shove the host's player controller should apply to the player if they
/// stand within `radius` of `origin`.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct PlayerPush {
    pub origin: Vec3,
    pub radius: f32,
    pub strength: f32,
}

/// The `[hazards]` config section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HazardParams {
    /// Blast applied where a sniper shot lands.
    pub sniper_scatter: RadialBurst,
}

impl Default for HazardParams {
    fn default() -> Self {
        Self {
            sniper_scatter: RadialBurst::scatter(SNIPER_SCATTER_RADIUS, SNIPER_SCATTER_FORCE),
        }
    }
}

impl HazardParams {
    pub fn validate(&self) -> SimResult<()> {
        self.sniper_scatter.validate("hazards.sniper_scatter")
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

/// Spawn one entity per hazard in `layout`.
pub fn spawn_stage_hazards(commands: &mut Commands, layout: &StageLayout, config: &LeafConfig) {
    for spec in &layout.hazards {
        match spec {
            HazardSpec::Vent(vent) => {
                commands.spawn((StageHazard, AirVent::from_spec(vent)));
            }
            HazardSpec::Lightning(storm) => {
                commands.spawn((StageHazard, LightningStorm::from_spec(storm)));
            }
            HazardSpec::Vortex(vortex) => {
                commands.spawn((StageHazard, Vortex::new(vortex, layout.region.center())));
            }
            HazardSpec::Burrower(burrower) => {
                commands.spawn((StageHazard, Burrower::new(burrower, layout.region)));
            }
            HazardSpec::Sniper => {
                commands.spawn((StageHazard, Sniper::new(&config.targeting)));
            }
        }
    }
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct HazardsPlugin;

impl Plugin for HazardsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<PlayerPush>().add_systems(
            Update,
            (
                air_vent_system,
                lightning_system,
                vortex_system,
                burrower_system,
            )
                .in_set(crate::LeafSet::Hazards),
        );
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

pub fn air_vent_system(
    time: Res<Time>,
    mut vents: Query<&mut AirVent>,
    mut store: ResMut<ParticleStore>,
    mut pushes: MessageWriter<PlayerPush>,
) {
    let mut rng = rand::thread_rng();
    for mut vent in vents.iter_mut() {
        if !vent.tick(time.delta()) {
            continue;
        }
        let hit = vent.burst.apply(&mut store, vent.center, &mut rng);
        debug!("Vent at {:?} fired, hit {hit} leaves", vent.center);
        pushes.write(PlayerPush {
            origin: vent.center,
            radius: vent.burst.radius,
            strength: vent.burst.push,
        });
    }
}

pub fn lightning_system(
    time: Res<Time>,
    config: Res<LeafConfig>,
    stage: Option<Res<ActiveStage>>,
    mut storms: Query<&mut LightningStorm>,
    mut store: ResMut<ParticleStore>,
) {
    let Some(stage) = stage else {
        return;
    };
    let region = stage.layout.region;
    let mut rng = rand::thread_rng();
    for mut storm in storms.iter_mut() {
        for _ in 0..storm.tick(time.delta_secs()) {
            let xz = region.random_point(&mut rng);
            let center = Vec3::new(xz.x, config.sim.ground_y, xz.y);
            let hit = storm.burst.apply(&mut store, center, &mut rng);
            debug!("Lightning struck ({:.1}, {:.1}), hit {hit} leaves", xz.x, xz.y);
        }
    }
}

pub fn vortex_system(
    time: Res<Time>,
    config: Res<LeafConfig>,
    mut vortices: Query<&mut Vortex>,
    mut store: ResMut<ParticleStore>,
) {
    let dt = time.delta_secs().min(config.sim.max_step_dt);
    for mut vortex in vortices.iter_mut() {
        vortex.advance(dt);
        vortex.apply(&mut store, dt);
    }
}

pub fn burrower_system(
    time: Res<Time>,
    config: Res<LeafConfig>,
    mut burrowers: Query<&mut Burrower>,
    mut store: ResMut<ParticleStore>,
    mut pushes: MessageWriter<PlayerPush>,
) {
    let mut rng = rand::thread_rng();
    let dt = time.delta_secs();
    for mut burrower in burrowers.iter_mut() {
        if let Some(center) = burrower.update(dt, &mut store, config.sim.ground_y, &mut rng) {
            pushes.write(PlayerPush {
                origin: center,
                radius: burrower.burst.radius,
                strength: burrower.burst.push,
            });
        }
    }
}
