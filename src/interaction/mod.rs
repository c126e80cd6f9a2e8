//! Player tools: hand, rake, blower, vacuum.
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`upgrade`] | [`UpgradeLevel`] tiers and linear range/strength scaling |
//! | [`hand`] | Ray pick under the cursor, gather neighbours, collect |
//! | [`rake`] | Scrape grounded leaves toward the operator |
//! | [`blower`] | Cone push ahead of the nozzle |
//! | [`vacuum`] | Radial pull toward the operator, collect inside a radius |
//!
//! Every adapter is a plain function over the [`ParticleStore`] that returns
//! an [`InteractionSummary`].  Adapters own no particle state; they read
//! positions and change particles only through `apply_impulse` and `collect`.
//!
//! [`tool_interaction_system`] reads the [`ToolInput`] resource (written by
//! the host's input plumbing), throttles activations with [`ToolTicker`], and
//! reports collections through the [`LeavesCollected`] message.

pub mod blower;
pub mod hand;
pub mod rake;
pub mod upgrade;
pub mod vacuum;

pub use blower::BlowerParams;
pub use hand::HandParams;
pub use rake::RakeParams;
pub use upgrade::UpgradeLevel;
pub use vacuum::VacuumParams;

use bevy::prelude::*;
use serde::Deserialize;

use crate::config::LeafConfig;
use crate::constants::{TOOL_FALLBACK_AHEAD, TOOL_MAX_REACH};
use crate::error::SimResult;
use crate::store::ParticleStore;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolKind {
    #[default]
    Hand,
    Rake,
    Blower,
    Vacuum,
}

/// Upgrade tier of every tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolLevels {
    pub hand: UpgradeLevel,
    pub rake: UpgradeLevel,
    pub blower: UpgradeLevel,
    pub vacuum: UpgradeLevel,
}

impl ToolLevels {
    pub fn get(&self, kind: ToolKind) -> UpgradeLevel {
        match kind {
            ToolKind::Hand => self.hand,
            ToolKind::Rake => self.rake,
            ToolKind::Blower => self.blower,
            ToolKind::Vacuum => self.vacuum,
        }
    }
}

/// Operator state for the current frame, written by input plumbing.
#[derive(Resource, Debug, Clone, Default)]
pub struct ToolInput {
    pub active: ToolKind,
    /// Trigger held this frame.
    pub triggered: bool,
    pub eye: Vec3,
    /// View direction (need not be normalized).
    pub forward: Vec3,
    pub levels: ToolLevels,
}

/// What one tool activation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionSummary {
    /// Particles that received an impulse or were collected.
    pub affected: u32,
    /// Particles removed from the simulation.
    pub collected: u32,
}

/// Sent whenever a tool collects leaves.  Consumed by the host's economy.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeavesCollected {
    pub count: u32,
}

/// Per-tool tuning, the `[tools]` config section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolParams {
    pub hand: HandParams,
    pub rake: RakeParams,
    pub blower: BlowerParams,
    pub vacuum: VacuumParams,
}

impl ToolParams {
    pub fn validate(&self) -> SimResult<()> {
        self.hand.validate()?;
        self.rake.validate()?;
        self.blower.validate()?;
        self.vacuum.validate()?;
        Ok(())
    }

    /// Activation interval while the trigger is held.
    pub fn tick_secs(&self, kind: ToolKind) -> f32 {
        match kind {
            ToolKind::Hand => self.hand.tick_secs,
            ToolKind::Rake => self.rake.tick_secs,
            ToolKind::Blower => self.blower.tick_secs,
            ToolKind::Vacuum => self.vacuum.tick_secs,
        }
    }
}

// ── Throttling ────────────────────────────────────────────────────────────────

/// Fires a held tool once per interval; a fresh press fires immediately.
#[derive(Resource, Debug, Clone, Default)]
pub struct ToolTicker {
    /// Seconds since the last activation; `None` while released.
    since_last: Option<f32>,
    tool: Option<ToolKind>,
}

impl ToolTicker {
    /// Returns `true` when `kind` should activate this frame.
    pub fn tick(&mut self, kind: ToolKind, triggered: bool, dt: f32, interval: f32) -> bool {
        if !triggered || self.tool != Some(kind) {
            self.since_last = None;
            self.tool = Some(kind);
        }
        if !triggered {
            return false;
        }
        match self.since_last {
            None => {
                self.since_last = Some(0.0);
                true
            }
            Some(elapsed) => {
                let elapsed = elapsed + dt;
                if elapsed >= interval {
                    // Keep the remainder but never bank more than one tick.
                    self.since_last = Some((elapsed - interval).min(interval));
                    true
                } else {
                    self.since_last = Some(elapsed);
                    false
                }
            }
        }
    }
}

// ── Aiming ────────────────────────────────────────────────────────────────────

/// Where the view ray meets the ground plane `y = ground_y`.
///
/// A hit further than `max_reach` from the eye is pulled back along the ray
/// to `max_reach`.  A ray that never meets the ground yields the point
/// [`TOOL_FALLBACK_AHEAD`] metres along the ray.
pub fn ground_aim_point(eye: Vec3, forward: Vec3, max_reach: f32, ground_y: f32) -> Vec3 {
    let dir = forward.normalize_or_zero();
    if dir.y < -1.0e-6 {
        let t = (ground_y - eye.y) / dir.y;
        if t >= 0.0 {
            return if t > max_reach {
                eye + dir * max_reach
            } else {
                eye + dir * t
            };
        }
    }
    eye + dir * TOOL_FALLBACK_AHEAD
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ToolInput>()
            .init_resource::<ToolTicker>()
            .add_message::<LeavesCollected>()
            .add_systems(
                Update,
                tool_interaction_system.in_set(crate::LeafSet::Interact),
            );
    }
}

/// Activate the held tool when its ticker fires.
pub fn tool_interaction_system(
    time: Res<Time>,
    config: Res<LeafConfig>,
    input: Res<ToolInput>,
    mut ticker: ResMut<ToolTicker>,
    mut store: ResMut<ParticleStore>,
    mut collected: MessageWriter<LeavesCollected>,
) {
    let tools = &config.tools;
    let kind = input.active;
    if !ticker.tick(kind, input.triggered, time.delta_secs(), tools.tick_secs(kind)) {
        return;
    }

    let level = input.levels.get(kind);
    let summary = match kind {
        ToolKind::Hand => hand::pick(&mut store, input.eye, input.forward, level, &tools.hand),
        ToolKind::Rake => {
            let aim = ground_aim_point(input.eye, input.forward, TOOL_MAX_REACH, config.sim.ground_y);
            rake::scrape(&mut store, aim, input.forward, level, &tools.rake)
        }
        ToolKind::Blower => blower::blow(
            &mut store,
            input.eye,
            input.forward,
            level,
            &tools.blower,
            &mut rand::thread_rng(),
        ),
        ToolKind::Vacuum => vacuum::suck(&mut store, input.eye, &tools.vacuum),
    };

    debug!("{:?} (level {}) affected {} leaves", kind, level.get(), summary.affected);
    if summary.collected > 0 {
        collected.write(LeavesCollected {
            count: summary.collected,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ticker_fires_on_press_then_every_interval() {
        let mut ticker = ToolTicker::default();
        // Binary-exact steps.
        let dt = 0.0625;
        let fired: Vec<bool> = (0..9)
            .map(|_| ticker.tick(ToolKind::Rake, true, dt, 0.25))
            .collect();
        assert_eq!(
            fired,
            vec![true, false, false, false, true, false, false, false, true]
        );
    }

    #[test]
    fn ticker_resets_on_release_and_tool_switch() {
        let mut ticker = ToolTicker::default();
        assert!(ticker.tick(ToolKind::Hand, true, 0.01, 0.2));
        assert!(!ticker.tick(ToolKind::Hand, true, 0.01, 0.2));
        assert!(!ticker.tick(ToolKind::Hand, false, 0.01, 0.2));
        assert!(ticker.tick(ToolKind::Hand, true, 0.01, 0.2));
        assert!(ticker.tick(ToolKind::Vacuum, true, 0.01, 0.05));
    }

    #[test]
    fn aim_hits_ground_within_reach() {
        let aim = ground_aim_point(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, -1.0), 6.0, 0.0);
        assert_relative_eq!(aim.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(aim.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn aim_is_clamped_to_reach() {
        let eye = Vec3::new(0.0, 2.0, 0.0);
        let aim = ground_aim_point(eye, Vec3::new(0.0, -0.1, -1.0), 6.0, 0.0);
        assert_relative_eq!(aim.distance(eye), 6.0, epsilon = 1e-4);
        assert!(aim.y > 0.0);
    }

    #[test]
    fn aim_falls_back_ahead_when_looking_up() {
        let eye = Vec3::new(1.0, 2.0, 0.0);
        let aim = ground_aim_point(eye, Vec3::Y, 6.0, 0.0);
        assert_relative_eq!(aim.distance(eye), TOOL_FALLBACK_AHEAD, epsilon = 1e-5);
    }
}
