//! Stage-wide ambient wind.
//!
//! Gusts arrive on a randomized timer.  While a gust blows the wind vector
//! eases toward it; afterwards it decays exponentially and snaps to exactly
//! zero once calm, so sleeping leaves are left alone between gusts.

use bevy::prelude::*;
use rand::Rng;

use crate::config::{LeafConfig, WindParams};

/// Current horizontal wind acceleration `(x, z)` and the gust scheduler.
#[derive(Resource, Debug, Clone)]
pub struct Wind {
    current: Vec2,
    gust: Vec2,
    gust_remaining: f32,
    until_next_gust: f32,
}

impl Default for Wind {
    fn default() -> Self {
        let params = WindParams::default();
        Self {
            current: Vec2::ZERO,
            gust: Vec2::ZERO,
            gust_remaining: 0.0,
            until_next_gust: params.interval_min_secs,
        }
    }
}

impl Wind {
    /// A calm wind whose first gust is scheduled from `params`.
    pub fn new(params: &WindParams, rng: &mut impl Rng) -> Self {
        Self {
            until_next_gust: sample(rng, params.interval_min_secs, params.interval_max_secs),
            ..Self::default()
        }
    }

    /// Horizontal acceleration `(x, z)` in m/s².
    #[inline]
    pub fn vector(&self) -> Vec2 {
        self.current
    }

    /// `true` whenever the wind exerts any force.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.current != Vec2::ZERO
    }

    #[inline]
    pub fn is_gusting(&self) -> bool {
        self.gust_remaining > 0.0
    }

    /// Advance the scheduler by `dt` seconds.
    pub fn tick(&mut self, dt: f32, params: &WindParams, rng: &mut impl Rng) {
        if !params.enabled {
            self.current = Vec2::ZERO;
            self.gust = Vec2::ZERO;
            self.gust_remaining = 0.0;
            return;
        }

        if self.gust_remaining > 0.0 {
            let blend = 1.0 - (-params.ramp_rate * dt).exp();
            self.current = self.current.lerp(self.gust, blend);
            self.gust_remaining -= dt;
            if self.gust_remaining <= 0.0 {
                self.gust = Vec2::ZERO;
                self.gust_remaining = 0.0;
                self.until_next_gust =
                    sample(rng, params.interval_min_secs, params.interval_max_secs);
            }
            return;
        }

        self.current *= (-params.decay_rate * dt).exp();
        if self.current.length() < params.calm_epsilon {
            self.current = Vec2::ZERO;
        }

        self.until_next_gust -= dt;
        if self.until_next_gust <= 0.0 {
            let heading = rng.gen_range(0.0..std::f32::consts::TAU);
            let strength = sample(rng, params.strength_min, params.strength_max);
            self.gust = Vec2::from_angle(heading) * strength;
            self.gust_remaining = sample(rng, params.gust_min_secs, params.gust_max_secs);
            debug!(
                "Wind gust: {:.2} m/s² at {:.0}° for {:.1}s",
                strength,
                heading.to_degrees(),
                self.gust_remaining
            );
        }
    }
}

#[inline]
fn sample(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Advance the wind once per frame, before the simulation step.
pub fn wind_system(time: Res<Time>, config: Res<LeafConfig>, mut wind: ResMut<Wind>) {
    let dt = time.delta_secs().min(config.sim.max_step_dt);
    wind.tick(dt, &config.wind, &mut rand::thread_rng());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> WindParams {
        WindParams {
            interval_min_secs: 1.0,
            interval_max_secs: 1.0,
            gust_min_secs: 2.0,
            gust_max_secs: 2.0,
            strength_min: 1.0,
            strength_max: 1.0,
            decay_rate: 20.0,
            ..WindParams::default()
        }
    }

    #[test]
    fn calm_until_first_gust() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = params();
        let mut wind = Wind::new(&p, &mut rng);
        for _ in 0..50 {
            wind.tick(0.01, &p, &mut rng);
        }
        assert!(!wind.is_active());
    }

    #[test]
    fn gust_ramps_up_then_decays_to_exact_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = params();
        let mut wind = Wind::new(&p, &mut rng);
        let dt = 0.05;

        // 1 s wait + 2 s gust.
        let mut peak = 0.0f32;
        for _ in 0..60 {
            wind.tick(dt, &p, &mut rng);
            peak = peak.max(wind.vector().length());
        }
        assert!(peak > 0.9, "gust should approach its strength, peak {peak}");
        assert!(peak <= 1.0 + 1e-4);

        // Decay well below the calm threshold before the next gust arrives.
        let mut calm = false;
        for _ in 0..200 {
            wind.tick(dt, &p, &mut rng);
            if !wind.is_gusting() && wind.vector() == Vec2::ZERO {
                calm = true;
                break;
            }
        }
        assert!(calm, "wind must snap to exactly zero after decaying");
    }

    #[test]
    fn disabled_wind_never_blows() {
        let mut rng = StdRng::seed_from_u64(9);
        let p = WindParams {
            enabled: false,
            ..params()
        };
        let mut wind = Wind::new(&p, &mut rng);
        for _ in 0..200 {
            wind.tick(0.05, &p, &mut rng);
        }
        assert!(!wind.is_active());
    }
}
