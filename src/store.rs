//! Fixed-capacity leaf particle store.
//!
//! ## Layout
//!
//! Particle data is kept as parallel arrays (structure-of-arrays) indexed by
//! slot: position, velocity, orientation (Euler XYZ, cosmetic), an explicit
//! [`ParticleState`], and the instance transform a renderer uploads.  Slots are
//! allocated once in [`ParticleStore::new`] and never reallocated; removal and
//! respawn only rewrite a slot.
//!
//! ## Mutation surface
//!
//! Everything outside the simulation step changes particles through three
//! calls:
//!
//! | Call            | Effect                                                   |
//! |-----------------|----------------------------------------------------------|
//! | `apply_impulse` | add a velocity delta; a non-zero delta wakes a sleeper   |
//! | `collect`       | mark the slot `Removed` and park it out of sight         |
//! | `respawn`       | reset a slot and mark it `Active`                        |
//!
//! Indices are only meaningful for the current frame: a containment respawn
//! reuses a slot for what is, visually, a different leaf.  An index at or past
//! [`ParticleStore::count`] is a programming error and panics.

use bevy::prelude::*;
use rand::Rng;

use crate::constants::{INITIAL_DROP_MAX_Y, INITIAL_DROP_MIN_Y, REMOVED_PARK_Y};
use crate::stage::Region;

/// Per-slot lifecycle tag.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticleState {
    /// Integrated every step.
    Active,
    /// Resting on the ground; skipped by the integrator until disturbed.
    Asleep,
    /// Collected or unused.  Never touched by forces until respawned.
    #[default]
    Removed,
}

impl ParticleState {
    #[inline]
    pub fn is_live(self) -> bool {
        self != ParticleState::Removed
    }
}

/// Owner of every leaf's simulation state.
#[derive(Resource, Debug, Clone)]
pub struct ParticleStore {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    orientations: Vec<Vec3>,
    states: Vec<ParticleState>,
    transforms: Vec<Mat4>,
    transforms_dirty: bool,
}

/// Simultaneous mutable access to every buffer, for the integrator.
pub(crate) struct ParticleBuffersMut<'a> {
    pub positions: &'a mut [Vec3],
    pub velocities: &'a mut [Vec3],
    pub orientations: &'a mut [Vec3],
    pub states: &'a mut [ParticleState],
    pub transforms: &'a mut [Mat4],
}

impl ParticleStore {
    /// Allocate `capacity` slots, all `Removed`.
    pub fn new(capacity: u32) -> Self {
        let n = capacity as usize;
        let parked = Vec3::new(0.0, REMOVED_PARK_Y, 0.0);
        Self {
            positions: vec![parked; n],
            velocities: vec![Vec3::ZERO; n],
            orientations: vec![Vec3::ZERO; n],
            states: vec![ParticleState::Removed; n],
            transforms: vec![hidden_transform(); n],
            transforms_dirty: true,
        }
    }

    /// Number of slots (live or not).
    #[inline]
    pub fn count(&self) -> u32 {
        self.positions.len() as u32
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    #[inline]
    pub fn orientations(&self) -> &[Vec3] {
        &self.orientations
    }

    #[inline]
    pub fn states(&self) -> &[ParticleState] {
        &self.states
    }

    #[inline]
    pub fn position(&self, index: u32) -> Vec3 {
        self.positions[index as usize]
    }

    #[inline]
    pub fn velocity(&self, index: u32) -> Vec3 {
        self.velocities[index as usize]
    }

    #[inline]
    pub fn state(&self, index: u32) -> ParticleState {
        self.states[index as usize]
    }

    /// Read-only view for spatial queries.
    pub fn view(&self) -> ParticleView<'_> {
        ParticleView {
            positions: &self.positions,
            velocities: &self.velocities,
            states: &self.states,
        }
    }

    /// Number of slots that are not `Removed`.
    pub fn live_count(&self) -> u32 {
        self.states.iter().filter(|s| s.is_live()).count() as u32
    }

    /// Add `delta` to the velocity of particle `index`.
    ///
    /// A removed particle ignores impulses.  A non-zero impulse wakes a
    /// sleeping one; the effect shows up at the next integration step.
    pub fn apply_impulse(&mut self, index: u32, delta: Vec3) {
        debug_assert!(
            index < self.count(),
            "apply_impulse: index {index} out of range (count {})",
            self.count()
        );
        let i = index as usize;
        match self.states[i] {
            ParticleState::Removed => {}
            ParticleState::Asleep => {
                if delta != Vec3::ZERO {
                    self.velocities[i] += delta;
                    self.states[i] = ParticleState::Active;
                }
            }
            ParticleState::Active => self.velocities[i] += delta,
        }
    }

    /// Remove particle `index` from the simulation.
    ///
    /// Returns `false` when it was already removed, so callers can count
    /// actual collections.
    pub fn collect(&mut self, index: u32) -> bool {
        debug_assert!(index < self.count(), "collect: index {index} out of range");
        let i = index as usize;
        if self.states[i] == ParticleState::Removed {
            return false;
        }
        self.park(i);
        true
    }

    /// Reset slot `index` and mark it `Active`.
    pub fn respawn(&mut self, index: u32, position: Vec3, velocity: Vec3, orientation: Vec3) {
        debug_assert!(index < self.count(), "respawn: index {index} out of range");
        let i = index as usize;
        self.positions[i] = position;
        self.velocities[i] = velocity;
        self.orientations[i] = orientation;
        self.states[i] = ParticleState::Active;
        self.transforms[i] = instance_transform(position, orientation);
        self.transforms_dirty = true;
    }

    /// Rebuild the population for a stage: the first `count` slots (clamped to
    /// capacity) drop in from above random points of `region`, and every
    /// other slot is removed.
    ///
    /// Returns the number of particles placed.
    pub fn scatter(&mut self, region: &Region, count: u32, rng: &mut impl Rng) -> u32 {
        let placed = count.min(self.count());
        for index in 0..placed {
            let p = region.random_point(rng);
            let y = rng.gen_range(INITIAL_DROP_MIN_Y..INITIAL_DROP_MAX_Y);
            let orientation = random_orientation(rng);
            self.respawn(index, Vec3::new(p.x, y, p.y), Vec3::ZERO, orientation);
        }
        for i in placed as usize..self.positions.len() {
            self.park(i);
        }
        placed
    }

    /// Per-slot instance transforms (position + orientation; zero scale for
    /// removed slots).
    #[inline]
    pub fn instance_transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Returns whether any transform changed since the last call, clearing
    /// the flag.  Renderers use this to skip unchanged uploads.
    pub fn take_transforms_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.transforms_dirty, false)
    }

    pub(crate) fn mark_transforms_dirty(&mut self) {
        self.transforms_dirty = true;
    }

    pub(crate) fn buffers_mut(&mut self) -> ParticleBuffersMut<'_> {
        ParticleBuffersMut {
            positions: &mut self.positions,
            velocities: &mut self.velocities,
            orientations: &mut self.orientations,
            states: &mut self.states,
            transforms: &mut self.transforms,
        }
    }

    fn park(&mut self, i: usize) {
        self.positions[i] = Vec3::new(self.positions[i].x, REMOVED_PARK_Y, self.positions[i].z);
        self.velocities[i] = Vec3::ZERO;
        self.states[i] = ParticleState::Removed;
        self.transforms[i] = hidden_transform();
        self.transforms_dirty = true;
    }
}

// ── Read-only view ────────────────────────────────────────────────────────────

/// Borrowed read surface over a [`ParticleStore`].
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<'a> {
    positions: &'a [Vec3],
    velocities: &'a [Vec3],
    states: &'a [ParticleState],
}

impl<'a> ParticleView<'a> {
    #[inline]
    pub fn count(&self) -> u32 {
        self.positions.len() as u32
    }

    #[inline]
    pub fn positions(&self) -> &'a [Vec3] {
        self.positions
    }

    #[inline]
    pub fn velocities(&self) -> &'a [Vec3] {
        self.velocities
    }

    #[inline]
    pub fn states(&self) -> &'a [ParticleState] {
        self.states
    }

    /// `(index, position)` of every particle that is not removed.
    pub fn live(&self) -> impl Iterator<Item = (u32, Vec3)> + 'a {
        let states = self.states;
        self.positions
            .iter()
            .enumerate()
            .filter(move |(i, _)| states[*i].is_live())
            .map(|(i, p)| (i as u32, *p))
    }
}

// ── Transforms ────────────────────────────────────────────────────────────────

/// Instance matrix for a leaf at `position` with Euler XYZ `orientation`.
#[inline]
pub fn instance_transform(position: Vec3, orientation: Vec3) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::XYZ, orientation.x, orientation.y, orientation.z);
    Mat4::from_rotation_translation(rotation, position)
}

#[inline]
fn hidden_transform() -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::ZERO,
        Quat::IDENTITY,
        Vec3::new(0.0, REMOVED_PARK_Y, 0.0),
    )
}

/// Random leaf orientation: any spin, small initial tilt.
pub fn random_orientation(rng: &mut impl Rng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-0.3..0.3),
        rng.gen_range(0.0..std::f32::consts::TAU),
        rng.gen_range(-0.3..0.3),
    )
}
