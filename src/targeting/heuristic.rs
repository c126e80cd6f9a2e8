//! Closed-form target selection used whenever the scoring model is missing.
//!
//! A cell is *valid* when its centre lies in a distance band around the agent
//! and within a cone around the agent's facing.  Valid cells are scored by how
//! well they intercept the agent's path, plus a small bonus for leaf density.
//! When nothing is valid the band and cone are widened and a valid cell is
//! picked at random; failing that, any cell.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use super::TargetingParams;
use crate::density::{DensityGrid, GridLayout};

/// Distance band and cone a target cell must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    pub min_dist: f32,
    pub max_dist: f32,
    pub cone_half_angle_deg: f32,
}

impl Constraints {
    pub fn strict(params: &TargetingParams) -> Self {
        Self {
            min_dist: params.min_dist,
            max_dist: params.max_dist,
            cone_half_angle_deg: params.cone_half_angle_deg,
        }
    }

    pub fn relaxed(params: &TargetingParams) -> Self {
        Self {
            min_dist: params.min_dist * params.relaxed_min_dist_scale,
            max_dist: params.max_dist * params.relaxed_max_dist_scale,
            cone_half_angle_deg: params.relaxed_cone_half_angle_deg,
        }
    }

    /// `Some((distance, alignment))` when `cell` is a valid target.  A zero
    /// facing skips the cone test and counts as perfectly aligned.
    pub fn check(&self, agent: Vec2, facing: Vec2, cell: Vec2) -> Option<(f32, f32)> {
        let offset = cell - agent;
        let dist = offset.length();
        if dist < self.min_dist || dist > self.max_dist || dist < 0.01 {
            return None;
        }
        let Some(facing) = facing.try_normalize() else {
            return Some((dist, 1.0));
        };
        let alignment = (offset / dist).dot(facing).clamp(-1.0, 1.0);
        (alignment.acos().to_degrees() <= self.cone_half_angle_deg).then_some((dist, alignment))
    }
}

/// How well striking at `dist` with the given alignment intercepts the agent.
pub fn intercept_score(dist: f32, alignment: f32, params: &TargetingParams) -> f32 {
    let distance_score = 1.0 - (dist - params.ideal_dist).abs() / params.dist_tolerance;
    (alignment * distance_score).max(0.0)
}

/// Indices of every cell passing `constraints`.
pub fn valid_cells(
    layout: &GridLayout,
    agent: Vec2,
    facing: Vec2,
    constraints: &Constraints,
) -> Vec<usize> {
    (0..layout.len())
        .filter(|&i| {
            constraints
                .check(agent, facing, layout.index_to_world(i))
                .is_some()
        })
        .collect()
}

/// Pick a target cell.  Always returns an index inside the grid.
pub fn choose_cell(
    grid: &DensityGrid,
    agent: Vec2,
    facing: Vec2,
    params: &TargetingParams,
    rng: &mut impl Rng,
) -> usize {
    let layout = &grid.layout;
    let strict = Constraints::strict(params);

    let mut best: Option<(usize, f32)> = None;
    for (i, &density) in grid.cells.iter().enumerate() {
        let Some((dist, alignment)) = strict.check(agent, facing, layout.index_to_world(i)) else {
            continue;
        };
        let score = intercept_score(dist, alignment, params) + density * params.density_weight;
        if best.is_none_or(|(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    if let Some((i, _)) = best {
        return i;
    }

    let relaxed = valid_cells(layout, agent, facing, &Constraints::relaxed(params));
    match relaxed.choose(rng) {
        Some(&i) => i,
        None => rng.gen_range(0..layout.len().max(1)),
    }
}

/// Model input: the grid cells, then the agent's normalized `(u, v)`, then its
/// facing.
pub fn build_model_input(grid: &DensityGrid, agent: Vec2, facing: Vec2) -> Vec<f32> {
    let uv = grid.layout.world_to_normalized(agent.x, agent.y);
    let facing = facing.normalize_or_zero();
    let mut input = Vec::with_capacity(grid.cells.len() + 4);
    input.extend_from_slice(&grid.cells);
    input.extend_from_slice(&[uv.x, uv.y, facing.x, facing.y]);
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> TargetingParams {
        TargetingParams::default()
    }

    #[test]
    fn band_and_cone_filter() {
        let c = Constraints::strict(&params());
        let agent = Vec2::new(110.0, 0.0);
        let east = Vec2::X;
        assert!(c.check(agent, east, Vec2::new(116.0, 0.0)).is_some());
        assert!(c.check(agent, east, Vec2::new(112.0, 0.0)).is_none(), "too close");
        assert!(c.check(agent, east, Vec2::new(120.0, 0.0)).is_none(), "too far");
        assert!(c.check(agent, east, Vec2::new(104.0, 0.0)).is_none(), "behind");
        // 60° off axis.
        let off = agent + Vec2::from_angle(60f32.to_radians()) * 6.0;
        assert!(c.check(agent, east, off).is_none());
    }

    #[test]
    fn zero_facing_accepts_any_bearing() {
        let c = Constraints::strict(&params());
        let hit = c.check(Vec2::ZERO, Vec2::ZERO, Vec2::new(-6.0, 0.0));
        assert_eq!(hit, Some((6.0, 1.0)));
    }

    #[test]
    fn intercept_peaks_at_ideal_distance() {
        let p = params();
        let at_ideal = intercept_score(p.ideal_dist, 1.0, &p);
        assert_eq!(at_ideal, 1.0);
        assert!(intercept_score(p.ideal_dist + 1.0, 1.0, &p) < at_ideal);
        assert_eq!(intercept_score(p.ideal_dist + 10.0, 1.0, &p), 0.0);
    }

    #[test]
    fn chooses_dense_cell_among_equals() {
        let p = params();
        let layout = p.grid_layout();
        let mut grid = DensityGrid::empty(layout);
        let agent = Vec2::new(110.0, 0.75);
        // Two cells at the same distance either side of the facing axis.
        let left = layout.world_to_cell(116.25, -0.75).unwrap();
        let right = layout.world_to_cell(116.25, 2.25).unwrap();
        grid.cells[layout.index(right.0, right.1)] = 1.0;

        let mut rng = StdRng::seed_from_u64(1);
        let chosen = choose_cell(&grid, agent, Vec2::X, &p, &mut rng);
        assert_eq!(chosen, layout.index(right.0, right.1));
        assert_ne!(chosen, layout.index(left.0, left.1));
    }

    #[test]
    fn falls_back_to_relaxed_search() {
        let p = params();
        let layout = p.grid_layout();
        let grid = DensityGrid::empty(layout);
        // Ten metres west of the grid: every cell is past the strict band but
        // the nearest column is inside the relaxed one.
        let agent = Vec2::new(95.0, 0.0);
        let facing = Vec2::X;
        assert!(valid_cells(&layout, agent, facing, &Constraints::strict(&p)).is_empty());

        let mut rng = StdRng::seed_from_u64(3);
        let chosen = choose_cell(&grid, agent, facing, &p, &mut rng);
        let relaxed = valid_cells(&layout, agent, facing, &Constraints::relaxed(&p));
        assert!(relaxed.contains(&chosen));
    }

    #[test]
    fn last_resort_is_any_cell() {
        let p = params();
        let grid = DensityGrid::empty(p.grid_layout());
        let mut rng = StdRng::seed_from_u64(4);
        // Far away from the grid: nothing is valid even relaxed.
        let chosen = choose_cell(&grid, Vec2::new(-500.0, 0.0), Vec2::X, &p, &mut rng);
        assert!(chosen < grid.cells.len());
    }

    #[test]
    fn model_input_layout() {
        let p = params();
        let grid = DensityGrid::empty(p.grid_layout());
        let input = build_model_input(&grid, Vec2::new(120.0, 0.0), Vec2::new(0.0, -2.0));
        assert_eq!(input.len(), 324);
        assert_eq!(&input[320..], &[0.5, 0.5, 0.0, -1.0]);
    }
}
