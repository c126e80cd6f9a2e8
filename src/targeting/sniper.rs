//! The sniper: a hazard that asks the targeting oracle where the player is
//! headed and scatters the leaves there.
//!
//! Each shot is a two-frame affair.  When the cooldown elapses the sniper
//! snapshots the latest density grid and the player's pose, and spawns the
//! prediction on the async compute pool.  A later frame finds the task done
//! and applies the scatter burst at the chosen cell.

use std::time::Duration;

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{Prediction, TargetingOracle, TargetingParams, TargetingQuery};
use crate::config::LeafConfig;
use crate::density::DensitySampler;
use crate::interaction::ToolInput;
use crate::store::ParticleStore;

#[derive(Component)]
pub struct Sniper {
    warmup_remaining: f32,
    cooldown: Timer,
    pending: Option<Task<Prediction>>,
    /// The most recent resolved shot.
    pub last_shot: Option<Prediction>,
    pub shots: u32,
}

impl Sniper {
    /// First shot after `initial_delay_secs + cooldown_secs`, then every
    /// `cooldown_secs`.
    pub fn new(params: &TargetingParams) -> Self {
        Self {
            warmup_remaining: params.initial_delay_secs,
            cooldown: Timer::from_seconds(params.cooldown_secs, TimerMode::Repeating),
            pending: None,
            last_shot: None,
            shots: 0,
        }
    }

    /// Advance the cooldown; `true` when a new shot should be aimed.  A shot
    /// still in flight swallows the trigger.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if self.warmup_remaining > 0.0 {
            self.warmup_remaining -= delta.as_secs_f32();
            return false;
        }
        self.cooldown.tick(delta);
        self.cooldown.just_finished() && self.pending.is_none()
    }
}

/// Builds a query from the player's pose and the latest grid.
pub fn player_query(sampler: &DensitySampler, input: &ToolInput) -> TargetingQuery {
    TargetingQuery {
        grid: sampler.grid.clone(),
        agent_pos: Vec2::new(input.eye.x, input.eye.z),
        agent_dir: Vec2::new(input.forward.x, input.forward.z),
    }
}

pub fn sniper_aim_system(
    time: Res<Time>,
    oracle: Option<Res<TargetingOracle>>,
    sampler: Option<Res<DensitySampler>>,
    input: Res<ToolInput>,
    mut snipers: Query<&mut Sniper>,
) {
    let (Some(oracle), Some(sampler)) = (oracle, sampler) else {
        return;
    };
    for mut sniper in snipers.iter_mut() {
        if !sniper.tick(time.delta()) {
            continue;
        }
        let query = player_query(&sampler, &input);
        let oracle = TargetingOracle::clone(&oracle);
        let task = AsyncComputeTaskPool::get().spawn(async move {
            let mut rng = StdRng::from_entropy();
            oracle.predict(&query, &mut rng).await
        });
        sniper.pending = Some(task);
        debug!("Sniper aiming");
    }
}

pub fn sniper_fire_system(
    config: Res<LeafConfig>,
    mut snipers: Query<&mut Sniper>,
    mut store: ResMut<ParticleStore>,
) {
    let mut rng = rand::thread_rng();
    for mut sniper in snipers.iter_mut() {
        let Some(task) = sniper.pending.as_mut() else {
            continue;
        };
        let Some(shot) = task.now_or_never() else {
            continue;
        };
        sniper.pending = None;

        let center = Vec3::new(shot.world_pos.x, config.sim.ground_y, shot.world_pos.y);
        let hit = config.hazards.sniper_scatter.apply(&mut store, center, &mut rng);
        info!(
            "Sniper hit cell {} at ({:.1}, {:.1}), scattered {hit} leaves{}",
            shot.cell_index,
            shot.world_pos.x,
            shot.world_pos.y,
            if shot.used_model { "" } else { " (heuristic)" }
        );
        sniper.shots += 1;
        sniper.last_shot = Some(shot);
    }
}
