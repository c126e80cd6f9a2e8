//! Leaf density rasterization.
//!
//! A [`GridLayout`] describes a fixed rectangle of square cells on the ground
//! plane, indexed row-major (`row * cols + col`, rows along +z).  A
//! [`DensityGrid`] counts the live leaves per cell and normalizes the counts by
//! their maximum.  It is rebuilt on a slow cadence by [`DensitySampler`],
//! since only AI strategy reads it.

use bevy::prelude::*;

use crate::stage::Region;
use crate::store::ParticleView;

// ── Layout ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    /// World `(x, z)` of the min corner of cell `(0, 0)`.
    pub origin: Vec2,
    pub cols: usize,
    pub rows: usize,
    pub cell_size: f32,
}

impl GridLayout {
    pub fn new(origin: Vec2, cols: usize, rows: usize, cell_size: f32) -> Self {
        Self {
            origin,
            cols,
            rows,
            cell_size,
        }
    }

    /// The smallest grid of `cell_size` cells anchored at the region's min
    /// corner that covers the whole region.
    pub fn covering(region: &Region, cell_size: f32) -> Self {
        let cols = (region.width() / cell_size).ceil().max(1.0) as usize;
        let rows = (region.depth() / cell_size).ceil().max(1.0) as usize;
        Self::new(Vec2::new(region.min_x, region.min_z), cols, rows, cell_size)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// World-space size `(x, z)` of the whole grid.
    #[inline]
    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.cols as f32, self.rows as f32) * self.cell_size
    }

    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn index_to_cell(&self, index: usize) -> (usize, usize) {
        (index % self.cols, index / self.cols)
    }

    /// World `(x, z)` of a cell's centre.
    #[inline]
    pub fn cell_to_world(&self, col: usize, row: usize) -> Vec2 {
        self.origin + (Vec2::new(col as f32, row as f32) + 0.5) * self.cell_size
    }

    #[inline]
    pub fn index_to_world(&self, index: usize) -> Vec2 {
        let (col, row) = self.index_to_cell(index);
        self.cell_to_world(col, row)
    }

    /// Cell containing world `(x, z)`, if inside the grid.
    pub fn world_to_cell(&self, x: f32, z: f32) -> Option<(usize, usize)> {
        let local = (Vec2::new(x, z) - self.origin) / self.cell_size;
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let (col, row) = (local.x.floor() as usize, local.y.floor() as usize);
        (col < self.cols && row < self.rows).then_some((col, row))
    }

    /// World `(x, z)` mapped to `[0, 1]²` over the grid extent (clamped).
    pub fn world_to_normalized(&self, x: f32, z: f32) -> Vec2 {
        ((Vec2::new(x, z) - self.origin) / self.extent()).clamp(Vec2::ZERO, Vec2::ONE)
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// Normalized leaf density per cell, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    pub layout: GridLayout,
    pub cells: Vec<f32>,
}

impl DensityGrid {
    /// An all-zero grid.
    pub fn empty(layout: GridLayout) -> Self {
        Self {
            layout,
            cells: vec![0.0; layout.len()],
        }
    }

    /// Count live particles per cell, then divide by the busiest cell.
    /// Removed particles and particles outside the grid are skipped; an empty
    /// grid stays all-zero.
    pub fn build(layout: GridLayout, particles: ParticleView<'_>) -> Self {
        let mut grid = Self::empty(layout);
        for (_, p) in particles.live() {
            if let Some((col, row)) = layout.world_to_cell(p.x, p.z) {
                grid.cells[layout.index(col, row)] += 1.0;
            }
        }
        let max = grid.max();
        if max > 0.0 {
            let inv = max.recip();
            grid.cells.iter_mut().for_each(|c| *c *= inv);
        }
        grid
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.cells[self.layout.index(col, row)]
    }

    pub fn max(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }

    /// Index of the densest cell, or `None` when the grid is empty of leaves.
    /// Ties go to the lowest index.
    pub fn densest_cell(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &d) in self.cells.iter().enumerate() {
            if d > 0.0 && best.is_none_or(|(_, b)| d > b) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

// ── Sampler ───────────────────────────────────────────────────────────────────

/// Latest density grid over the sniper's field, refreshed on a timer.
#[derive(Resource, Debug, Clone)]
pub struct DensitySampler {
    pub timer: Timer,
    pub grid: DensityGrid,
}

impl DensitySampler {
    pub fn new(layout: GridLayout, refresh_secs: f32) -> Self {
        Self {
            timer: Timer::from_seconds(refresh_secs, TimerMode::Repeating),
            grid: DensityGrid::empty(layout),
        }
    }
}
