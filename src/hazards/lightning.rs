//! Lightning storms: volleys of strikes at random points of the stage.
//!
//! Each cycle fires `strikes` bursts `spacing_secs` apart, starting
//! `first_delay_secs` after the storm spawns and repeating every `cycle_secs`.

use bevy::prelude::*;
use serde::Deserialize;

use super::burst::RadialBurst;
use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightningSpec {
    pub radius: f32,
    pub force: f32,
    pub cycle_secs: f32,
    pub first_delay_secs: f32,
    pub strikes: u32,
    pub spacing_secs: f32,
}

impl Default for LightningSpec {
    fn default() -> Self {
        Self {
            radius: LIGHTNING_RADIUS,
            force: LIGHTNING_FORCE,
            cycle_secs: LIGHTNING_CYCLE_SECS,
            first_delay_secs: LIGHTNING_FIRST_DELAY_SECS,
            strikes: LIGHTNING_STRIKES_PER_BURST,
            spacing_secs: LIGHTNING_STRIKE_SPACING_SECS,
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct LightningStorm {
    pub spec: LightningSpec,
    pub burst: RadialBurst,
    elapsed: f32,
    /// Start time of the current volley.
    volley_start: f32,
    fired_in_volley: u32,
}

impl LightningStorm {
    pub fn from_spec(spec: &LightningSpec) -> Self {
        Self {
            spec: spec.clone(),
            burst: RadialBurst::scatter(spec.radius, spec.force),
            elapsed: 0.0,
            volley_start: spec.first_delay_secs,
            fired_in_volley: 0,
        }
    }

    /// Advance by `dt` seconds and return how many strikes fell due.
    pub fn tick(&mut self, dt: f32) -> u32 {
        self.elapsed += dt;
        let cycle = self.spec.cycle_secs.max(self.spec.spacing_secs * self.spec.strikes as f32);
        let mut due = 0;
        loop {
            if self.fired_in_volley < self.spec.strikes {
                let at = self.volley_start + self.fired_in_volley as f32 * self.spec.spacing_secs;
                if self.elapsed < at {
                    break;
                }
                self.fired_in_volley += 1;
                due += 1;
            } else if cycle > 0.0 && self.elapsed >= self.volley_start + cycle {
                self.volley_start += cycle;
                self.fired_in_volley = 0;
            } else {
                break;
            }
        }
        due
    }
}
