//! Leaf blower: a horizontal cone of push in front of the operator.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use super::{InteractionSummary, UpgradeLevel};
use crate::constants::*;
use crate::error::{
    validate_half_angle_deg, validate_non_negative, validate_positive, SimResult,
};
use crate::store::ParticleStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlowerParams {
    pub tick_secs: f32,
    pub base_range: f32,
    pub range_per_level: f32,
    pub base_strength: f32,
    pub strength_per_level: f32,
    /// Nozzle offset ahead of the eye (horizontal).
    pub distance: f32,
    pub cone_half_angle_deg: f32,
    pub falloff_exponent: f32,
}

impl Default for BlowerParams {
    fn default() -> Self {
        Self {
            tick_secs: BLOWER_TICK_SECS,
            base_range: BLOWER_BASE_RANGE,
            range_per_level: BLOWER_RANGE_PER_LEVEL,
            base_strength: BLOWER_BASE_STRENGTH,
            strength_per_level: BLOWER_STRENGTH_PER_LEVEL,
            distance: BLOWER_DISTANCE,
            cone_half_angle_deg: BLOWER_CONE_HALF_ANGLE_DEG,
            falloff_exponent: BLOWER_FALLOFF_EXPONENT,
        }
    }
}

impl BlowerParams {
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("tools.blower.tick_secs", self.tick_secs)?;
        validate_positive("tools.blower.base_range", self.base_range)?;
        validate_non_negative("tools.blower.range_per_level", self.range_per_level)?;
        validate_non_negative("tools.blower.base_strength", self.base_strength)?;
        validate_non_negative("tools.blower.strength_per_level", self.strength_per_level)?;
        validate_non_negative("tools.blower.distance", self.distance)?;
        validate_half_angle_deg("tools.blower.cone_half_angle_deg", self.cone_half_angle_deg)?;
        validate_positive("tools.blower.falloff_exponent", self.falloff_exponent)?;
        Ok(())
    }

    #[inline]
    pub fn range(&self, level: UpgradeLevel) -> f32 {
        level.scale(self.base_range, self.range_per_level)
    }

    #[inline]
    pub fn strength(&self, level: UpgradeLevel) -> f32 {
        level.scale(self.base_strength, self.strength_per_level)
    }
}

/// Push every live leaf inside the cone ahead of the nozzle.
///
/// The nozzle sits `distance` ahead of `eye` along the horizontal part of
/// `forward`.  Magnitude falls off as `(1 - d/range)^falloff_exponent`, with a
/// little random sideways jitter and lift so the cloud spreads.
pub fn blow(
    store: &mut ParticleStore,
    eye: Vec3,
    forward: Vec3,
    level: UpgradeLevel,
    params: &BlowerParams,
    rng: &mut impl Rng,
) -> InteractionSummary {
    let heading = Vec2::new(forward.x, forward.z).normalize_or_zero();
    if heading == Vec2::ZERO {
        return InteractionSummary::default();
    }
    let nozzle = Vec2::new(eye.x, eye.z) + heading * params.distance;
    let range = params.range(level);
    let strength = params.strength(level);
    let cos_half = params.cone_half_angle_deg.to_radians().cos();

    let mut affected = 0;
    for i in 0..store.count() {
        if !store.state(i).is_live() {
            continue;
        }
        let p = store.position(i);
        let offset = Vec2::new(p.x, p.z) - nozzle;
        let dist = offset.length();
        if dist >= range {
            continue;
        }
        // A leaf right at the nozzle has no direction and is always blown.
        if dist > 1.0e-4 && heading.dot(offset / dist) < cos_half {
            continue;
        }

        let falloff = (1.0 - dist / range).powf(params.falloff_exponent);
        let push = strength * falloff * 0.5;
        let jitter = push * 0.5;
        store.apply_impulse(
            i,
            Vec3::new(
                heading.x * push + (rng.gen::<f32>() - 0.5) * jitter,
                0.1 + rng.gen::<f32>() * 0.2,
                heading.y * push + (rng.gen::<f32>() - 0.5) * jitter,
            ),
        );
        affected += 1;
    }

    InteractionSummary {
        affected,
        collected: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn only_leaves_inside_the_cone_are_pushed() {
        let mut store = ParticleStore::new(3);
        // Nozzle ends up at (0, 0, -3) looking down -z.
        store.respawn(0, Vec3::new(0.0, 0.02, -5.0), Vec3::ZERO, Vec3::ZERO);
        store.respawn(1, Vec3::new(3.0, 0.02, -3.5), Vec3::ZERO, Vec3::ZERO);
        store.respawn(2, Vec3::new(0.0, 0.02, -1.0), Vec3::ZERO, Vec3::ZERO);
        let mut rng = StdRng::seed_from_u64(11);

        let summary = blow(
            &mut store,
            Vec3::new(0.0, 1.7, 0.0),
            Vec3::new(0.0, -0.3, -1.0),
            UpgradeLevel::BASE,
            &BlowerParams::default(),
            &mut rng,
        );

        assert_eq!(summary.affected, 1);
        assert!(store.velocity(0).z < 0.0);
        assert!(store.velocity(0).y >= 0.1);
        assert_eq!(store.velocity(1), Vec3::ZERO, "outside the 45° half-cone");
        assert_eq!(store.velocity(2), Vec3::ZERO, "behind the nozzle");
    }

    #[test]
    fn looking_straight_down_blows_nothing() {
        let mut store = ParticleStore::new(1);
        store.respawn(0, Vec3::new(0.0, 0.02, 0.0), Vec3::ZERO, Vec3::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        let summary = blow(
            &mut store,
            Vec3::new(0.0, 1.7, 0.0),
            Vec3::NEG_Y,
            UpgradeLevel::BASE,
            &BlowerParams::default(),
            &mut rng,
        );
        assert_eq!(summary.affected, 0);
    }
}
