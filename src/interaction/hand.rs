//! Hand pickup: grab the leaf under the cursor plus a handful around it.

use bevy::prelude::*;
use serde::Deserialize;

use super::{InteractionSummary, UpgradeLevel};
use crate::constants::*;
use crate::error::{validate_positive, SimError, SimResult};
use crate::store::ParticleStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HandParams {
    pub tick_secs: f32,
    /// Leaves further than this from the eye are never scanned.
    pub scan_radius: f32,
    /// Maximum eye distance of the first picked leaf.
    pub reach: f32,
    /// Maximum distance from the view ray.
    pub ray_tolerance: f32,
    pub pickup_radius: f32,
    pub wide_pickup_radius: f32,
    /// Pick amounts at or above this use `wide_pickup_radius`.
    pub wide_pickup_threshold: u32,
    /// Leaves per grab, indexed by upgrade tier.
    pub pick_amounts: [u32; 4],
}

impl Default for HandParams {
    fn default() -> Self {
        Self {
            tick_secs: HAND_TICK_SECS,
            scan_radius: HAND_SCAN_RADIUS,
            reach: HAND_REACH,
            ray_tolerance: HAND_RAY_TOLERANCE,
            pickup_radius: HAND_PICKUP_RADIUS,
            wide_pickup_radius: HAND_WIDE_PICKUP_RADIUS,
            wide_pickup_threshold: HAND_WIDE_PICKUP_THRESHOLD,
            pick_amounts: HAND_PICK_AMOUNTS,
        }
    }
}

impl HandParams {
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("tools.hand.tick_secs", self.tick_secs)?;
        validate_positive("tools.hand.reach", self.reach)?;
        validate_positive("tools.hand.ray_tolerance", self.ray_tolerance)?;
        validate_positive("tools.hand.pickup_radius", self.pickup_radius)?;
        validate_positive("tools.hand.wide_pickup_radius", self.wide_pickup_radius)?;
        if let Some(&zero) = self.pick_amounts.iter().find(|&&a| a == 0) {
            return Err(SimError::UnsafeConstant {
                name: "tools.hand.pick_amounts",
                value: zero as f32,
                safe_range: "[1, ∞) for every tier",
            });
        }
        Ok(())
    }

    /// Leaves collected per grab at `level`.
    #[inline]
    pub fn pick_amount(&self, level: UpgradeLevel) -> u32 {
        self.pick_amounts[level.index()]
    }
}

/// Index of the live leaf nearest the eye that lies within `ray_tolerance` of
/// the view ray and within reach.
pub fn leaf_under_cursor(
    store: &ParticleStore,
    eye: Vec3,
    forward: Vec3,
    params: &HandParams,
) -> Option<u32> {
    let dir = forward.normalize_or_zero();
    if dir == Vec3::ZERO {
        return None;
    }
    let max_dist = params.reach.min(params.scan_radius);

    let mut best: Option<(u32, f32)> = None;
    for (i, p) in store.view().live() {
        let to_leaf = p - eye;
        let dist = to_leaf.length();
        if dist >= max_dist {
            continue;
        }
        // Closest point on the ray; behind the eye clamps to the eye itself.
        let along = to_leaf.dot(dir).max(0.0);
        let off_ray = (to_leaf - dir * along).length();
        if off_ray >= params.ray_tolerance {
            continue;
        }
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.map(|(i, _)| i)
}

/// Collect the leaf under the cursor and up to `pick_amount - 1` more around it.
pub fn pick(
    store: &mut ParticleStore,
    eye: Vec3,
    forward: Vec3,
    level: UpgradeLevel,
    params: &HandParams,
) -> InteractionSummary {
    let Some(first) = leaf_under_cursor(store, eye, forward, params) else {
        return InteractionSummary::default();
    };

    let amount = params.pick_amount(level);
    let radius = if amount >= params.wide_pickup_threshold {
        params.wide_pickup_radius
    } else {
        params.pickup_radius
    };
    let center = store.position(first);

    let mut targets = vec![first];
    if amount > 1 {
        targets.extend(
            store
                .view()
                .live()
                .filter(|&(i, p)| i != first && p.distance(center) < radius)
                .map(|(i, _)| i)
                .take(amount as usize - 1),
        );
    }

    let collected = targets.into_iter().filter(|&i| store.collect(i)).count() as u32;
    InteractionSummary {
        affected: collected,
        collected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(points: &[Vec3]) -> ParticleStore {
        let mut store = ParticleStore::new(points.len() as u32 + 2);
        for (i, p) in points.iter().enumerate() {
            store.respawn(i as u32, *p, Vec3::ZERO, Vec3::ZERO);
        }
        store
    }

    #[test]
    fn picks_nearest_leaf_on_the_ray() {
        let store = store_with(&[
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, -1.0),
        ]);
        let hit = leaf_under_cursor(&store, Vec3::ZERO, Vec3::NEG_Z, &HandParams::default());
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn nothing_within_reach_collects_nothing() {
        let mut store = store_with(&[Vec3::new(0.0, 0.0, -8.0)]);
        let summary = pick(
            &mut store,
            Vec3::ZERO,
            Vec3::NEG_Z,
            UpgradeLevel::MAX,
            &HandParams::default(),
        );
        assert_eq!(summary, InteractionSummary::default());
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn upgraded_hand_gathers_neighbours_up_to_amount() {
        let mut points = vec![Vec3::new(0.0, 0.0, -2.0)];
        for k in 0..6 {
            points.push(Vec3::new(0.1 * k as f32, 0.0, -2.2));
        }
        let mut store = store_with(&points);
        let level = UpgradeLevel::new(2).expect("tier 2");

        let summary = pick(&mut store, Vec3::ZERO, Vec3::NEG_Z, level, &HandParams::default());
        assert_eq!(summary.collected, 3);
        assert_eq!(store.live_count(), 4);
        assert_eq!(store.state(0), crate::store::ParticleState::Removed);
    }
}
