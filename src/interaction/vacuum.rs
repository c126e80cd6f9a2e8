//! Vacuum: pull nearby leaves in and collect the ones that arrive.

use bevy::prelude::*;
use serde::Deserialize;

use super::InteractionSummary;
use crate::constants::*;
use crate::error::{validate_non_negative, validate_positive, SimError, SimResult};
use crate::store::ParticleStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VacuumParams {
    pub tick_secs: f32,
    pub range: f32,
    pub collect_radius: f32,
    pub strength: f32,
    pub lift: f32,
}

impl Default for VacuumParams {
    fn default() -> Self {
        Self {
            tick_secs: VACUUM_TICK_SECS,
            range: VACUUM_RANGE,
            collect_radius: VACUUM_COLLECT_RADIUS,
            strength: VACUUM_STRENGTH,
            lift: VACUUM_LIFT,
        }
    }
}

impl VacuumParams {
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("tools.vacuum.tick_secs", self.tick_secs)?;
        validate_positive("tools.vacuum.range", self.range)?;
        validate_non_negative("tools.vacuum.collect_radius", self.collect_radius)?;
        validate_non_negative("tools.vacuum.strength", self.strength)?;
        if self.collect_radius > self.range {
            return Err(SimError::UnsafeConstant {
                name: "tools.vacuum.collect_radius",
                value: self.collect_radius,
                safe_range: "[0.0, tools.vacuum.range]",
            });
        }
        Ok(())
    }
}

/// Collect leaves within `collect_radius` of `operator` and pull the rest of
/// those within `range` toward it.
pub fn suck(store: &mut ParticleStore, operator: Vec3, params: &VacuumParams) -> InteractionSummary {
    let range_sq = params.range * params.range;
    let collect_sq = params.collect_radius * params.collect_radius;

    let mut summary = InteractionSummary::default();
    for i in 0..store.count() {
        if !store.state(i).is_live() {
            continue;
        }
        let to_operator = operator - store.position(i);
        let dist_sq = to_operator.length_squared();
        if dist_sq >= range_sq {
            continue;
        }
        if dist_sq < collect_sq {
            if store.collect(i) {
                summary.collected += 1;
                summary.affected += 1;
            }
            continue;
        }
        let dist = dist_sq.sqrt();
        let pull = params.strength * (1.0 - dist / params.range) * 0.2;
        let dir = to_operator / dist;
        store.apply_impulse(i, dir * pull + Vec3::Y * params.lift);
        summary.affected += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ParticleState;

    #[test]
    fn collects_close_and_pulls_far() {
        let mut store = ParticleStore::new(3);
        let operator = Vec3::new(0.0, 1.0, 0.0);
        store.respawn(0, Vec3::new(0.5, 0.8, 0.0), Vec3::ZERO, Vec3::ZERO);
        store.respawn(1, Vec3::new(3.0, 1.0, 0.0), Vec3::ZERO, Vec3::ZERO);
        store.respawn(2, Vec3::new(10.0, 1.0, 0.0), Vec3::ZERO, Vec3::ZERO);

        let summary = suck(&mut store, operator, &VacuumParams::default());

        assert_eq!(summary.collected, 1);
        assert_eq!(summary.affected, 2);
        assert_eq!(store.state(0), ParticleState::Removed);
        let v = store.velocity(1);
        assert!(v.x < 0.0, "pulled toward the operator");
        assert!((v.y - VACUUM_LIFT).abs() < 1e-6);
        assert_eq!(store.velocity(2), Vec3::ZERO);
    }

    #[test]
    fn collect_radius_beyond_range_is_rejected() {
        let params = VacuumParams {
            collect_radius: 5.0,
            ..VacuumParams::default()
        };
        assert!(params.validate().is_err());
    }
}
