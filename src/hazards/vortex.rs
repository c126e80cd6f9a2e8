//! Roaming vortex: a funnel that circles the stage and lifts leaves into orbit.

use bevy::prelude::*;
use serde::Deserialize;

use crate::constants::*;
use crate::store::ParticleStore;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VortexSpec {
    /// Radius of the circular path around the stage centre.
    pub path_radius: f32,
    /// Angular speed along the path (rad/s).
    pub angular_speed: f32,
    /// Radius of influence around the funnel.
    pub radius: f32,
    /// Per-second impulse toward the funnel axis.
    pub suction: f32,
    /// Per-second tangential impulse.
    pub orbit: f32,
    /// Per-second upward impulse.
    pub lift: f32,
}

impl Default for VortexSpec {
    fn default() -> Self {
        Self {
            path_radius: VORTEX_PATH_RADIUS,
            angular_speed: VORTEX_ANGULAR_SPEED,
            radius: VORTEX_RADIUS,
            suction: VORTEX_SUCTION,
            orbit: VORTEX_ORBIT,
            lift: VORTEX_LIFT,
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct Vortex {
    pub spec: VortexSpec,
    /// Centre of the circular path.
    pub path_center: Vec2,
    angle: f32,
}

impl Vortex {
    pub fn new(spec: &VortexSpec, path_center: Vec2) -> Self {
        Self {
            spec: spec.clone(),
            path_center,
            angle: 0.0,
        }
    }

    /// Funnel position `(x, z)`.
    pub fn position(&self) -> Vec2 {
        self.path_center + Vec2::from_angle(self.angle) * self.spec.path_radius
    }

    pub fn advance(&mut self, dt: f32) {
        self.angle = (self.angle + self.spec.angular_speed * dt) % std::f32::consts::TAU;
    }

    /// Apply one frame of suction, orbit, and lift.  Returns leaves affected.
    pub fn apply(&self, store: &mut ParticleStore, dt: f32) -> u32 {
        let center = self.position();
        let radius = self.spec.radius;
        let mut affected = 0;
        for i in 0..store.count() {
            if !store.state(i).is_live() {
                continue;
            }
            let p = store.position(i);
            let offset = Vec2::new(p.x, p.z) - center;
            let dist = offset.length();
            if dist >= radius {
                continue;
            }
            let falloff = 1.0 - dist / radius;
            let horizontal = if dist > 1.0e-4 {
                let inward = -offset / dist;
                let tangent = inward.perp();
                (inward * self.spec.suction + tangent * self.spec.orbit) * falloff * dt
            } else {
                Vec2::ZERO
            };
            let up = self.spec.lift * falloff * dt;
            store.apply_impulse(i, Vec3::new(horizontal.x, up, horizontal.y));
            affected += 1;
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circles_the_path_centre() {
        let mut vortex = Vortex::new(&VortexSpec::default(), Vec2::new(120.0, 0.0));
        assert_eq!(vortex.position(), Vec2::new(130.0, 0.0));
        vortex.advance(std::f32::consts::PI / VORTEX_ANGULAR_SPEED);
        let p = vortex.position();
        assert!((p - Vec2::new(110.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn pulls_in_spins_and_lifts() {
        let vortex = Vortex::new(&VortexSpec::default(), Vec2::ZERO);
        // Funnel at (10, 0); leaf 2 m toward +x from it.
        let mut store = ParticleStore::new(2);
        store.respawn(0, Vec3::new(12.0, 0.02, 0.0), Vec3::ZERO, Vec3::ZERO);
        store.respawn(1, Vec3::new(30.0, 0.02, 0.0), Vec3::ZERO, Vec3::ZERO);

        assert_eq!(vortex.apply(&mut store, 0.1), 1);
        let v = store.velocity(0);
        assert!(v.x < 0.0, "suction toward the axis");
        assert!(v.z.abs() > 0.0, "tangential spin");
        assert!(v.y > 0.0, "lift");
        assert_eq!(store.velocity(1), Vec3::ZERO);
    }
}
