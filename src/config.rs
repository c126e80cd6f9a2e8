//! Runtime configuration loaded from `assets/leaf_drift.toml`.
//!
//! [`LeafConfig`] is a Bevy [`Resource`] grouping every tunable value by
//! concern: `sim`, `wind`, `tools`, `hazards`, `targeting`.  At startup,
//! [`load_leaf_config`] reads the file and overwrites the defaults with any
//! values present.  Every section is `#[serde(default)]`, so a minimal TOML
//! can override just the keys you care about:
//!
//! ```toml
//! [sim]
//! ground_friction = 0.7
//!
//! [tools.blower]
//! cone_half_angle_deg = 30.0
//! ```
//!
//! The same file may carry a `[[stages]]` array; when present it replaces the
//! built-in [`StageRegistry`].
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by every `Default` impl here.

use std::path::Path;

use bevy::prelude::*;
use serde::Deserialize;

use crate::constants::*;
use crate::error::{
    validate_non_negative, validate_positive, validate_unit_interval, SimError, SimResult,
};
use crate::hazards::HazardParams;
use crate::interaction::ToolParams;
use crate::stage::{StageLayout, StageRegistry};
use crate::targeting::TargetingParams;

// ── Sections ──────────────────────────────────────────────────────────────────

/// Integration, sleep, containment, and obstacle settings for the step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub gravity: f32,
    pub ground_y: f32,
    pub max_step_dt: f32,
    pub sleep_speed_sq: f32,
    pub sleep_height_epsilon: f32,
    pub ground_friction: f32,
    pub air_drag: f32,
    pub tilt_damping: f32,
    pub tumble_rate: f32,
    pub rest_snap_speed: f32,
    pub containment_margin: f32,
    pub containment_period_secs: f32,
    pub obstacle_period_secs: f32,
    pub sky_drop_min_y: f32,
    pub sky_drop_max_y: f32,
    pub respawn_fall_speed: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            ground_y: GROUND_Y,
            max_step_dt: MAX_STEP_DT,
            sleep_speed_sq: SLEEP_SPEED_SQ,
            sleep_height_epsilon: SLEEP_HEIGHT_EPSILON,
            ground_friction: GROUND_FRICTION,
            air_drag: AIR_DRAG,
            tilt_damping: TILT_DAMPING,
            tumble_rate: TUMBLE_RATE,
            rest_snap_speed: REST_SNAP_SPEED,
            containment_margin: CONTAINMENT_MARGIN,
            containment_period_secs: CONTAINMENT_PERIOD_SECS,
            obstacle_period_secs: OBSTACLE_PERIOD_SECS,
            sky_drop_min_y: SKY_DROP_MIN_Y,
            sky_drop_max_y: SKY_DROP_MAX_Y,
            respawn_fall_speed: RESPAWN_FALL_SPEED,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("sim.max_step_dt", self.max_step_dt)?;
        validate_non_negative("sim.sleep_speed_sq", self.sleep_speed_sq)?;
        validate_non_negative("sim.sleep_height_epsilon", self.sleep_height_epsilon)?;
        validate_unit_interval("sim.ground_friction", self.ground_friction)?;
        validate_unit_interval("sim.air_drag", self.air_drag)?;
        validate_unit_interval("sim.tilt_damping", self.tilt_damping)?;
        validate_non_negative("sim.containment_margin", self.containment_margin)?;
        validate_non_negative("sim.respawn_fall_speed", self.respawn_fall_speed)?;
        if self.sky_drop_max_y <= self.sky_drop_min_y || self.sky_drop_min_y <= self.ground_y {
            return Err(SimError::UnsafeConstant {
                name: "sim.sky_drop_max_y",
                value: self.sky_drop_max_y,
                safe_range: "(sim.sky_drop_min_y, ∞) with sky_drop_min_y above ground_y",
            });
        }
        Ok(())
    }
}

/// Gust scheduler settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindParams {
    pub enabled: bool,
    pub interval_min_secs: f32,
    pub interval_max_secs: f32,
    pub gust_min_secs: f32,
    pub gust_max_secs: f32,
    pub strength_min: f32,
    pub strength_max: f32,
    pub ramp_rate: f32,
    pub decay_rate: f32,
    pub calm_epsilon: f32,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_min_secs: WIND_INTERVAL_MIN_SECS,
            interval_max_secs: WIND_INTERVAL_MAX_SECS,
            gust_min_secs: WIND_GUST_MIN_SECS,
            gust_max_secs: WIND_GUST_MAX_SECS,
            strength_min: WIND_STRENGTH_MIN,
            strength_max: WIND_STRENGTH_MAX,
            ramp_rate: WIND_RAMP_RATE,
            decay_rate: WIND_DECAY_RATE,
            calm_epsilon: WIND_CALM_EPSILON,
        }
    }
}

impl WindParams {
    pub fn validate(&self) -> SimResult<()> {
        validate_positive("wind.interval_min_secs", self.interval_min_secs)?;
        validate_positive("wind.gust_min_secs", self.gust_min_secs)?;
        validate_non_negative("wind.strength_min", self.strength_min)?;
        validate_positive("wind.ramp_rate", self.ramp_rate)?;
        validate_positive("wind.decay_rate", self.decay_rate)?;
        validate_positive("wind.calm_epsilon", self.calm_epsilon)?;
        let ranges = [
            ("wind.interval_max_secs", self.interval_min_secs, self.interval_max_secs),
            ("wind.gust_max_secs", self.gust_min_secs, self.gust_max_secs),
            ("wind.strength_max", self.strength_min, self.strength_max),
        ];
        for (name, min, max) in ranges {
            if max < min {
                return Err(SimError::UnsafeConstant {
                    name,
                    value: max,
                    safe_range: "not below the matching minimum",
                });
            }
        }
        Ok(())
    }
}

// ── Root resource ─────────────────────────────────────────────────────────────

/// Runtime-tunable simulation, tool, hazard, and targeting configuration.
#[derive(Resource, Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LeafConfig {
    pub sim: SimParams,
    pub wind: WindParams,
    pub tools: ToolParams,
    pub hazards: HazardParams,
    pub targeting: TargetingParams,
}

impl LeafConfig {
    /// Reject values that would make the simulation diverge or divide by zero.
    pub fn validate(&self) -> SimResult<()> {
        self.sim.validate()?;
        self.wind.validate()?;
        self.tools.validate()?;
        self.hazards.validate()?;
        self.targeting.validate()?;
        Ok(())
    }
}

/// Stage list as it appears in the config file.
#[derive(Debug, Default, Deserialize)]
struct StagesFile {
    #[serde(default)]
    stages: Vec<StageLayout>,
}

/// A validated config file.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LeafConfig,
    /// `None` when the file has no `[[stages]]` entries.
    pub stages: Option<StageRegistry>,
}

/// Parse and validate config text.  `origin` names the source in errors.
pub fn parse_config(origin: &str, text: &str) -> SimResult<LoadedConfig> {
    let parse_err = |e: toml::de::Error| SimError::ConfigParse {
        path: origin.to_owned(),
        message: e.to_string(),
    };
    let config: LeafConfig = toml::from_str(text).map_err(parse_err)?;
    let file: StagesFile = toml::from_str(text).map_err(parse_err)?;
    config.validate()?;

    let stages = if file.stages.is_empty() {
        None
    } else {
        Some(StageRegistry::new(file.stages)?)
    };
    Ok(LoadedConfig { config, stages })
}

/// Read and parse `path`.  A missing file is `Ok(None)`.
pub fn load_from_path(path: &Path) -> SimResult<Option<LoadedConfig>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SimError::ConfigRead {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };
    parse_config(&path.display().to_string(), &text).map(Some)
}

/// Startup system: load `assets/leaf_drift.toml` over the default
/// [`LeafConfig`] and [`StageRegistry`].
///
/// A missing file keeps the compiled defaults.  A read, parse, or validation
/// error is logged and also keeps the defaults; a half-applied file is never
/// used.
pub fn load_leaf_config(mut config: ResMut<LeafConfig>, mut registry: ResMut<StageRegistry>) {
    let path = Path::new(CONFIG_PATH);
    match load_from_path(path) {
        Ok(Some(loaded)) => {
            *config = loaded.config;
            if let Some(stages) = loaded.stages {
                info!("Loaded {} stages from {}", stages.len(), path.display());
                *registry = stages;
            }
            info!("Loaded leaf config from {}", path.display());
        }
        Ok(None) => {
            info!("No {} found; using compiled defaults", path.display());
        }
        Err(e) => {
            warn!("{e}; using compiled defaults");
        }
    }
}
