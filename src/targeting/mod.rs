//! Targeting oracle: where should an AI agent strike?
//!
//! ## Sub-module layout
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`model`] | [`ScoringModel`] trait, [`MlpModel`], memoized [`ModelHandle`] load |
//! | [`heuristic`] | Distance band + cone fallback when no model is available |
//! | [`sniper`] | [`Sniper`] hazard that fires at the oracle's pick |
//!
//! A prediction takes a [`TargetingQuery`] (density grid, agent position and
//! facing on the ground plane) and always yields a cell.  The model is tried
//! first; if it never loaded, or inference fails, the heuristic answers and
//! [`Prediction::used_model`] is `false`.

pub mod heuristic;
pub mod model;
pub mod sniper;

pub use model::{MlpModel, ModelHandle, ModelState, ScoringModel};
pub use sniper::Sniper;

use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
use rand::Rng;
use serde::Deserialize;

use crate::config::LeafConfig;
use crate::constants::*;
use crate::density::{DensityGrid, DensitySampler, GridLayout};
use crate::error::{
    validate_half_angle_deg, validate_non_negative, validate_positive, ModelError, SimError,
    SimResult,
};
use crate::store::ParticleStore;

// ── Config ────────────────────────────────────────────────────────────────────

/// The `[targeting]` config section: sniper field, heuristic weights, model
/// location, and sniper cadence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TargetingParams {
    /// World `(x, z)` of the grid's min corner.
    pub grid_origin: [f32; 2],
    pub grid_cols: usize,
    pub grid_rows: usize,
    pub grid_cell_size: f32,
    pub refresh_secs: f32,
    pub min_dist: f32,
    pub max_dist: f32,
    pub cone_half_angle_deg: f32,
    pub ideal_dist: f32,
    pub dist_tolerance: f32,
    pub density_weight: f32,
    pub relaxed_min_dist_scale: f32,
    pub relaxed_max_dist_scale: f32,
    pub relaxed_cone_half_angle_deg: f32,
    pub model_path: String,
    pub cooldown_secs: f32,
    pub initial_delay_secs: f32,
}

impl Default for TargetingParams {
    fn default() -> Self {
        Self {
            grid_origin: [GRID_ORIGIN_X, GRID_ORIGIN_Z],
            grid_cols: GRID_COLS,
            grid_rows: GRID_ROWS,
            grid_cell_size: GRID_CELL_SIZE,
            refresh_secs: DENSITY_REFRESH_SECS,
            min_dist: TARGET_MIN_DIST,
            max_dist: TARGET_MAX_DIST,
            cone_half_angle_deg: TARGET_CONE_HALF_ANGLE_DEG,
            ideal_dist: TARGET_IDEAL_DIST,
            dist_tolerance: TARGET_DIST_TOLERANCE,
            density_weight: TARGET_DENSITY_WEIGHT,
            relaxed_min_dist_scale: RELAXED_MIN_DIST_SCALE,
            relaxed_max_dist_scale: RELAXED_MAX_DIST_SCALE,
            relaxed_cone_half_angle_deg: RELAXED_CONE_HALF_ANGLE_DEG,
            model_path: MODEL_PATH.to_owned(),
            cooldown_secs: SNIPER_COOLDOWN_SECS,
            initial_delay_secs: SNIPER_INITIAL_DELAY_SECS,
        }
    }
}

impl TargetingParams {
    pub fn validate(&self) -> SimResult<()> {
        if self.grid_cols == 0 || self.grid_rows == 0 {
            return Err(SimError::UnsafeConstant {
                name: "targeting.grid_cols/grid_rows",
                value: (self.grid_cols * self.grid_rows) as f32,
                safe_range: "at least one cell",
            });
        }
        validate_positive("targeting.grid_cell_size", self.grid_cell_size)?;
        validate_positive("targeting.refresh_secs", self.refresh_secs)?;
        validate_non_negative("targeting.min_dist", self.min_dist)?;
        if self.max_dist <= self.min_dist {
            return Err(SimError::UnsafeConstant {
                name: "targeting.max_dist",
                value: self.max_dist,
                safe_range: "(min_dist, ∞)",
            });
        }
        validate_half_angle_deg("targeting.cone_half_angle_deg", self.cone_half_angle_deg)?;
        validate_positive("targeting.dist_tolerance", self.dist_tolerance)?;
        validate_non_negative("targeting.density_weight", self.density_weight)?;
        validate_non_negative("targeting.relaxed_min_dist_scale", self.relaxed_min_dist_scale)?;
        validate_positive("targeting.relaxed_max_dist_scale", self.relaxed_max_dist_scale)?;
        validate_half_angle_deg(
            "targeting.relaxed_cone_half_angle_deg",
            self.relaxed_cone_half_angle_deg,
        )?;
        validate_positive("targeting.cooldown_secs", self.cooldown_secs)?;
        validate_non_negative("targeting.initial_delay_secs", self.initial_delay_secs)?;
        Ok(())
    }

    /// The sniper's density grid.
    pub fn grid_layout(&self) -> GridLayout {
        GridLayout::new(
            Vec2::from_array(self.grid_origin),
            self.grid_cols,
            self.grid_rows,
            self.grid_cell_size,
        )
    }
}

// ── Oracle ────────────────────────────────────────────────────────────────────

/// One targeting request.  `agent_pos` and `agent_dir` are ground-plane
/// `(x, z)`; the direction need not be normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetingQuery {
    pub grid: DensityGrid,
    pub agent_pos: Vec2,
    pub agent_dir: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub cell_index: usize,
    /// Cell centre `(x, z)`.
    pub world_pos: Vec2,
    pub used_model: bool,
}

/// Model handle plus heuristic settings.  Cheap to clone into a task.
#[derive(Resource, Debug, Clone)]
pub struct TargetingOracle {
    model: ModelHandle,
    params: TargetingParams,
}

impl TargetingOracle {
    pub fn new(model: ModelHandle, params: TargetingParams) -> Self {
        Self { model, params }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn params(&self) -> &TargetingParams {
        &self.params
    }

    /// Pick a cell.  Waits for an in-flight model load; never fails.
    pub async fn predict<R: Rng>(&self, query: &TargetingQuery, rng: &mut R) -> Prediction {
        if let Some(model) = self.model.resolve().await {
            match score_with_model(model.as_ref(), query) {
                Ok(prediction) => return prediction,
                Err(e) => debug!("Model inference failed, using heuristic: {e}"),
            }
        }
        let cell_index =
            heuristic::choose_cell(&query.grid, query.agent_pos, query.agent_dir, &self.params, rng);
        Prediction {
            cell_index,
            world_pos: query.grid.layout.index_to_world(cell_index),
            used_model: false,
        }
    }
}

/// Run the model and take the arg-max cell (first index on ties).
pub fn score_with_model(
    model: &dyn ScoringModel,
    query: &TargetingQuery,
) -> Result<Prediction, ModelError> {
    let layout = &query.grid.layout;
    if model.output_len() != layout.len() {
        return Err(ModelError::Shape {
            tensor: "output",
            expected: layout.len(),
            got: model.output_len(),
        });
    }
    let input = heuristic::build_model_input(&query.grid, query.agent_pos, query.agent_dir);
    let scores = model.score(&input)?;
    if scores.len() != layout.len() {
        return Err(ModelError::Shape {
            tensor: "scores",
            expected: layout.len(),
            got: scores.len(),
        });
    }

    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    Ok(Prediction {
        cell_index: best,
        world_pos: layout.index_to_world(best),
        used_model: true,
    })
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct TargetingPlugin;

impl Plugin for TargetingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Startup,
            init_targeting.after(crate::config::load_leaf_config),
        )
        .add_systems(Update, density_sample_system.in_set(crate::LeafSet::Sample))
        .add_systems(
            Update,
            (sniper::sniper_aim_system, sniper::sniper_fire_system)
                .chain()
                .in_set(crate::LeafSet::Target),
        );
    }
}

/// Startup: build the density sampler and oracle from the loaded config and
/// start the model load in the background.  A pre-inserted oracle is kept.
pub fn init_targeting(
    mut commands: Commands,
    config: Res<LeafConfig>,
    oracle: Option<Res<TargetingOracle>>,
) {
    let params = &config.targeting;
    commands.insert_resource(DensitySampler::new(params.grid_layout(), params.refresh_secs));

    let model = match oracle {
        Some(oracle) => oracle.model().clone(),
        None => {
            let model = ModelHandle::from_path(&params.model_path);
            commands.insert_resource(TargetingOracle::new(model.clone(), params.clone()));
            model
        }
    };
    AsyncComputeTaskPool::get()
        .spawn(async move {
            model.resolve().await;
        })
        .detach();
}

pub fn density_sample_system(
    time: Res<Time>,
    store: Res<ParticleStore>,
    sampler: Option<ResMut<DensitySampler>>,
) {
    let Some(mut sampler) = sampler else {
        return;
    };
    sampler.timer.tick(time.delta());
    if sampler.timer.just_finished() {
        let layout = sampler.grid.layout;
        sampler.grid = DensityGrid::build(layout, store.view());
    }
}
