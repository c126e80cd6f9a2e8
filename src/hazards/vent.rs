//! Air vents: a fixed burst on a repeating timer.

use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;

use super::burst::RadialBurst;
use crate::constants::{VENT_INTERVAL_SECS, VENT_RADIUS, VENT_STRENGTH};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VentSpec {
    /// World position of the vent mouth.
    pub position: [f32; 3],
    pub radius: f32,
    pub strength: f32,
    pub interval_secs: f32,
}

impl Default for VentSpec {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            radius: VENT_RADIUS,
            strength: VENT_STRENGTH,
            interval_secs: VENT_INTERVAL_SECS,
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct AirVent {
    pub center: Vec3,
    pub burst: RadialBurst,
    pub timer: Timer,
}

impl AirVent {
    pub fn from_spec(spec: &VentSpec) -> Self {
        Self {
            center: Vec3::from_array(spec.position),
            burst: RadialBurst::vent(spec.radius, spec.strength),
            timer: Timer::from_seconds(spec.interval_secs.max(0.01), TimerMode::Repeating),
        }
    }

    /// Advance the timer; `true` when the vent fires this frame.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.timer.tick(delta);
        self.timer.just_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let mut vent = AirVent::from_spec(&VentSpec {
            interval_secs: 1.0,
            ..VentSpec::default()
        });
        let step = Duration::from_millis(250);
        let fired = (0..8).filter(|_| vent.tick(step)).count();
        assert_eq!(fired, 2);
    }
}
