//! Burrowing creatures that hunt the thickest leaf piles in their zone.
//!
//! Phase machine:
//!
//! ```text
//! Wait ──(interval, a pile exists)──▶ Hunting ──(arrived)──▶ Blasting ──▶ Descent ──▶ Wait
//! ```
//!
//! While waiting the burrower rasterizes its zone on a coarse grid and heads
//! for the densest cell.  It travels underground at a fixed speed, blasts once
//! on arrival, lingers on the surface, then sinks back down.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use super::burst::RadialBurst;
use crate::constants::*;
use crate::density::{DensityGrid, GridLayout};
use crate::stage::Region;
use crate::store::ParticleStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BurrowerSpec {
    /// Starting position `(x, z)`.
    pub start: [f32; 2],
    pub radius: f32,
    pub strength: f32,
    pub interval_secs: f32,
    pub speed: f32,
    pub blast_secs: f32,
    pub descent_secs: f32,
    /// Cell size of the pile-search grid.
    pub grid_cell: f32,
}

impl Default for BurrowerSpec {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0],
            radius: BURROWER_RADIUS,
            strength: BURROWER_STRENGTH,
            interval_secs: BURROWER_INTERVAL_SECS,
            speed: BURROWER_SPEED,
            blast_secs: BURROWER_BLAST_SECS,
            descent_secs: BURROWER_DESCENT_SECS,
            grid_cell: BURROWER_GRID_CELL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurrowerPhase {
    Wait { remaining: f32 },
    Hunting { target: Vec2 },
    Blasting { remaining: f32 },
    Descent { remaining: f32 },
}

#[derive(Component, Debug, Clone)]
pub struct Burrower {
    pub spec: BurrowerSpec,
    pub zone: Region,
    pub burst: RadialBurst,
    pub position: Vec2,
    pub phase: BurrowerPhase,
}

impl Burrower {
    pub fn new(spec: &BurrowerSpec, zone: Region) -> Self {
        Self {
            spec: spec.clone(),
            zone,
            burst: RadialBurst::vent(spec.radius, spec.strength),
            position: Vec2::from_array(spec.start),
            phase: BurrowerPhase::Wait {
                remaining: spec.interval_secs,
            },
        }
    }

    /// Centre of the densest pile in the zone, if there are any leaves.
    pub fn find_pile(&self, store: &ParticleStore) -> Option<Vec2> {
        let layout = GridLayout::covering(&self.zone, self.spec.grid_cell);
        let grid = DensityGrid::build(layout, store.view());
        grid.densest_cell().map(|i| layout.index_to_world(i))
    }

    /// Advance the phase machine by `dt`.  Returns the blast centre on the
    /// frame the burrower surfaces.
    pub fn update(
        &mut self,
        dt: f32,
        store: &mut ParticleStore,
        ground_y: f32,
        rng: &mut impl Rng,
    ) -> Option<Vec3> {
        match self.phase {
            BurrowerPhase::Wait { remaining } => {
                let remaining = remaining - dt;
                self.phase = if remaining > 0.0 {
                    BurrowerPhase::Wait { remaining }
                } else if let Some(target) = self.find_pile(store) {
                    BurrowerPhase::Hunting { target }
                } else {
                    BurrowerPhase::Wait {
                        remaining: self.spec.interval_secs,
                    }
                };
                None
            }
            BurrowerPhase::Hunting { target } => {
                let to_target = target - self.position;
                let step = self.spec.speed * dt;
                if to_target.length() <= step.max(BURROWER_ARRIVE_DIST) {
                    self.position = target;
                    let center = Vec3::new(target.x, ground_y, target.y);
                    let hit = self.burst.apply(store, center, rng);
                    debug!("Burrower surfaced at ({:.1}, {:.1}), hit {hit} leaves", target.x, target.y);
                    self.phase = BurrowerPhase::Blasting {
                        remaining: self.spec.blast_secs,
                    };
                    Some(center)
                } else {
                    self.position += to_target.normalize() * step;
                    None
                }
            }
            BurrowerPhase::Blasting { remaining } => {
                let remaining = remaining - dt;
                self.phase = if remaining > 0.0 {
                    BurrowerPhase::Blasting { remaining }
                } else {
                    BurrowerPhase::Descent {
                        remaining: self.spec.descent_secs,
                    }
                };
                None
            }
            BurrowerPhase::Descent { remaining } => {
                let remaining = remaining - dt;
                self.phase = if remaining > 0.0 {
                    BurrowerPhase::Descent { remaining }
                } else {
                    BurrowerPhase::Wait {
                        remaining: self.spec.interval_secs,
                    }
                };
                None
            }
        }
    }
}
