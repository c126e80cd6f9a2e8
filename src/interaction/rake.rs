//! Rake: scrape grounded leaves toward the operator.

use bevy::prelude::*;
use serde::Deserialize;

use super::{InteractionSummary, UpgradeLevel};
use crate::constants::*;
use crate::error::{validate_non_negative, validate_positive, SimResult};
use crate::store::ParticleStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RakeParams {
    pub tick_secs: f32,
    pub base_range: f32,
    pub range_per_level: f32,
    pub base_strength: f32,
    pub strength_per_level: f32,
    /// Vertical hop given to every scraped leaf.
    pub lift: f32,
    /// Leaves above this height are not touched.
    pub max_height: f32,
}

impl Default for RakeParams {
    fn default() -> Self {
        Self {
            tick_secs: RAKE_TICK_SECS,
            base_range: RAKE_BASE_RANGE,
            range_per_level: RAKE_RANGE_PER_LEVEL,
            base_strength: RAKE_BASE_STRENGTH,
            strength_per_level: RAKE_STRENGTH_PER_LEVEL,
            lift: RAKE_LIFT,
            max_height: GROUNDED_MAX_HEIGHT,
        }
    }
}

impl RakeParams {
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("tools.rake.tick_secs", self.tick_secs)?;
        validate_positive("tools.rake.base_range", self.base_range)?;
        validate_non_negative("tools.rake.range_per_level", self.range_per_level)?;
        validate_non_negative("tools.rake.base_strength", self.base_strength)?;
        validate_non_negative("tools.rake.strength_per_level", self.strength_per_level)?;
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

/// Pull every grounded leaf within range of `aim` toward the operator, whose
/// view points along `forward`.  Falloff is linear in horizontal distance.
pub fn scrape(
    store: &mut ParticleStore,
    aim: Vec3,
    forward: Vec3,
    level: UpgradeLevel,
    params: &RakeParams,
) -> InteractionSummary {
    let toward_operator = -Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let range = params.range(level);
    let strength = params.strength(level);
    let range_sq = range * range;

    let mut affected = 0;
    for i in 0..store.count() {
        if !store.state(i).is_live() {
            continue;
        }
        let p = store.position(i);
        if p.y > params.max_height {
            continue;
        }
        let dist_sq = (p.x - aim.x).powi(2) + (p.z - aim.z).powi(2);
        if dist_sq >= range_sq {
            continue;
        }
        let falloff = 1.0 - dist_sq.sqrt() / range;
        let push = strength * falloff * 0.5;
        store.apply_impulse(
            i,
            Vec3::new(toward_operator.x * push, params.lift, toward_operator.z * push),
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

    #[test]
    fn range_and_strength_follow_tiers() {
        let params = RakeParams::default();
        let top = UpgradeLevel::MAX;
        assert_eq!(params.range(UpgradeLevel::BASE), RAKE_BASE_RANGE);
        assert_eq!(params.range(top), RAKE_BASE_RANGE + 3.0 * RAKE_RANGE_PER_LEVEL);
        assert_eq!(params.strength(top), RAKE_BASE_STRENGTH + 3.0 * RAKE_STRENGTH_PER_LEVEL);
    }

    #[test]
    fn pulls_grounded_leaves_toward_operator_only() {
        let mut store = ParticleStore::new(3);
        store.respawn(0, Vec3::new(0.0, 0.02, -4.0), Vec3::ZERO, Vec3::ZERO);
        store.respawn(1, Vec3::new(0.0, 3.0, -4.0), Vec3::ZERO, Vec3::ZERO);
        store.respawn(2, Vec3::new(0.0, 0.02, -20.0), Vec3::ZERO, Vec3::ZERO);

        let summary = scrape(
            &mut store,
            Vec3::new(0.0, 0.0, -4.5),
            Vec3::NEG_Z,
            UpgradeLevel::BASE,
            &RakeParams::default(),
        );

        assert_eq!(summary.affected, 1);
        let v = store.velocity(0);
        assert!(v.z > 0.0, "pulled back toward +z operator side");
        assert_eq!(v.y, RAKE_LIFT);
        assert_eq!(store.velocity(1), Vec3::ZERO, "airborne leaves are skipped");
        assert_eq!(store.velocity(2), Vec3::ZERO, "out of range");
    }

    #[test]
    fn falloff_is_monotonic() {
        let mut store = ParticleStore::new(3);
        for (i, d) in [0.5f32, 1.5, 2.5].iter().enumerate() {
            store.respawn(i as u32, Vec3::new(*d, 0.02, 0.0), Vec3::ZERO, Vec3::ZERO);
        }
        scrape(&mut store, Vec3::ZERO, Vec3::X, UpgradeLevel::BASE, &RakeParams::default());
        let speeds: Vec<f32> = (0..3).map(|i| store.velocity(i).x.abs()).collect();
        assert!(speeds[0] >= speeds[1] && speeds[1] >= speeds[2]);
    }
}
