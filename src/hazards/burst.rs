//! Radial burst kernel shared by vents, burrowers, lightning, and the sniper.
//!
//! For a leaf at horizontal distance `d < radius` from the centre:
//!
//! ```text
//! ratio = 1 - d / radius
//! up    = lift * ratio^lift_exponent
//! out   = push * ratio^push_exponent      (skipped when d ≈ 0)
//! ```
//!
//! With `lift_exponent < push_exponent` the push fades first toward the rim,
//! which reads as a hemispherical pop rather than a flat shove.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use crate::constants::*;
use crate::error::{validate_non_negative, validate_positive, SimResult};
use crate::store::ParticleStore;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadialBurst {
    pub radius: f32,
    /// Upward impulse at the centre.
    pub lift: f32,
    /// Outward impulse scale.
    pub push: f32,
    pub lift_exponent: f32,
    pub push_exponent: f32,
    /// Peak-to-peak random horizontal jitter.
    pub jitter: f32,
    /// Leaves above this height are not affected.
    pub max_height: f32,
}

impl Default for RadialBurst {
    fn default() -> Self {
        Self::vent(VENT_RADIUS, VENT_STRENGTH)
    }
}

impl RadialBurst {
    /// Ground-hugging pop used by vents and burrowers.
    pub fn vent(radius: f32, strength: f32) -> Self {
        Self {
            radius,
            lift: strength,
            push: strength,
            lift_exponent: BURST_LIFT_EXPONENT,
            push_exponent: BURST_PUSH_EXPONENT,
            jitter: BURST_JITTER,
            max_height: GROUNDED_MAX_HEIGHT,
        }
    }

    /// Linear-falloff blast leaning upward (lightning, sniper shots).  Like
    /// every burst it only catches leaves on or near the ground.
    pub fn scatter(radius: f32, force: f32) -> Self {
        Self {
            radius,
            lift: force * 0.8,
            push: force * 0.6,
            lift_exponent: 1.0,
            push_exponent: 1.0,
            jitter: BURST_JITTER,
            max_height: GROUNDED_MAX_HEIGHT,
        }
    }

    pub fn validate(&self, name: &'static str) -> SimResult<()> {
        validate_positive(name, self.radius)?;
        validate_non_negative(name, self.lift)?;
        validate_non_negative(name, self.push)?;
        validate_positive(name, self.lift_exponent)?;
        validate_positive(name, self.push_exponent)?;
        validate_non_negative(name, self.jitter)?;
        Ok(())
    }

    /// Deterministic impulse for a leaf at horizontal `offset` from the
    /// centre, or `None` outside the radius.
    pub fn impulse(&self, offset: Vec2) -> Option<Vec3> {
        let dist = offset.length();
        if dist >= self.radius {
            return None;
        }
        let ratio = 1.0 - dist / self.radius;
        let up = self.lift * ratio.powf(self.lift_exponent);
        let out = if dist > 1.0e-4 {
            offset / dist * (self.push * ratio.powf(self.push_exponent))
        } else {
            Vec2::ZERO
        };
        Some(Vec3::new(out.x, up, out.y))
    }

    /// Apply the burst at `center` to every live leaf in range.
    ///
    /// Returns the number of leaves hit.
    pub fn apply(&self, store: &mut ParticleStore, center: Vec3, rng: &mut impl Rng) -> u32 {
        let mut hit = 0;
        for i in 0..store.count() {
            if !store.state(i).is_live() {
                continue;
            }
            let p = store.position(i);
            if p.y > self.max_height {
                continue;
            }
            let Some(mut impulse) = self.impulse(Vec2::new(p.x - center.x, p.z - center.z))
            else {
                continue;
            };
            if self.jitter > 0.0 {
                impulse.x += (rng.gen::<f32>() - 0.5) * self.jitter;
                impulse.z += (rng.gen::<f32>() - 0.5) * self.jitter;
            }
            store.apply_impulse(i, impulse);
            hit += 1;
        }
        hit
    }
}
