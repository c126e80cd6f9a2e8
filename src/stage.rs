//! Stage geometry: active regions, static obstacles, and hazard placement.
//!
//! A stage is a rectangular play region on the ground plane plus the static
//! obstacles (buildings, trunks) the leaves must flow around and the hazards
//! that disturb them.  The [`StageRegistry`] holds every stage for the
//! session; entering one via [`EnterStage`] rebuilds the particle population
//! and hazard entities from scratch, since no stage state persists.
//!
//! Coordinates: `x`/`z` span the ground plane, `y` is up.  "Behind" a building
//! means toward `-z`.

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

use crate::config::LeafConfig;
use crate::constants::{DEFAULT_STAGE_LEAF_COUNT, RESPAWN_INSET};
use crate::error::{SimError, SimResult};
use crate::hazards::burrower::BurrowerSpec;
use crate::hazards::lightning::LightningSpec;
use crate::hazards::vent::VentSpec;
use crate::hazards::vortex::VortexSpec;
use crate::hazards::{spawn_stage_hazards, StageHazard};
use crate::store::ParticleStore;

// ── Region ────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Region {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Region {
    pub const fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn depth(&self) -> f32 {
        self.max_z - self.min_z
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_z + self.max_z) * 0.5,
        )
    }

    /// Inclusive containment test on `(x, z)`.
    #[inline]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Containment test against the region grown by `margin` on every side.
    #[inline]
    pub fn contains_with_margin(&self, x: f32, z: f32, margin: f32) -> bool {
        x >= self.min_x - margin
            && x <= self.max_x + margin
            && z >= self.min_z - margin
            && z <= self.max_z + margin
    }

    /// Uniform random `(x, z)` kept [`RESPAWN_INSET`] inside every edge, so the
    /// result is strictly inside the region even for very small regions.
    pub fn random_point_inset(&self, rng: &mut impl Rng) -> Vec2 {
        let inset_x = RESPAWN_INSET.min(self.width() * 0.25);
        let inset_z = RESPAWN_INSET.min(self.depth() * 0.25);
        Vec2::new(
            rng.gen_range((self.min_x + inset_x)..(self.max_x - inset_x)),
            rng.gen_range((self.min_z + inset_z)..(self.max_z - inset_z)),
        )
    }

    /// Uniform random `(x, z)` anywhere in the region.
    pub fn random_point(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            rng.gen_range(self.min_x..=self.max_x),
            rng.gen_range(self.min_z..=self.max_z),
        )
    }

    fn validate(&self, name: &str) -> SimResult<()> {
        if self.width() > 0.0 && self.depth() > 0.0 {
            Ok(())
        } else {
            Err(SimError::EmptyRegion {
                name: name.to_owned(),
            })
        }
    }
}

// ── Obstacles ─────────────────────────────────────────────────────────────────

/// A static exclusion footprint.  Particles below `height` are pushed out of it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Obstacle {
    /// Rectangular footprint, extended further behind (`-z`) than in front so
    /// leaves cannot pile up in the unreachable gap behind the wall.
    Building {
        center: [f32; 2],
        half_width: f32,
        front_depth: f32,
        back_depth: f32,
        height: f32,
    },
    /// Circular trunk footprint.
    Tree {
        center: [f32; 2],
        radius: f32,
        height: f32,
    },
}

impl Obstacle {
    /// Footprint for a house model placed at `(x, z)` with the given scale.
    pub fn house(position: [f32; 2], scale: f32) -> Self {
        Self::Building {
            center: position,
            half_width: 1.5 * scale,
            front_depth: 1.25 * scale,
            back_depth: 2.0 * scale,
            height: 2.5 * scale,
        }
    }

    /// Trunk footprint for a tree model placed at `(x, z)` with the given scale.
    pub fn tree(position: [f32; 2], scale: f32) -> Self {
        Self::Tree {
            center: position,
            radius: 0.4 * scale,
            height: 4.0 * scale,
        }
    }

    /// Push `pos` to the nearest footprint boundary if it is inside, zeroing
    /// the velocity component that points back into the obstacle.
    ///
    /// Returns `true` when the particle was moved.
    pub fn resolve(&self, pos: &mut Vec3, vel: &mut Vec3) -> bool {
        match *self {
            Obstacle::Building {
                center,
                half_width,
                front_depth,
                back_depth,
                height,
            } => {
                if pos.y >= height {
                    return false;
                }
                let min_x = center[0] - half_width;
                let max_x = center[0] + half_width;
                let min_z = center[1] - back_depth;
                let max_z = center[1] + front_depth;
                if pos.x <= min_x || pos.x >= max_x || pos.z <= min_z || pos.z >= max_z {
                    return false;
                }

                // Exit through whichever face is closest.
                let exits = [
                    (pos.x - min_x, 0),
                    (max_x - pos.x, 1),
                    (pos.z - min_z, 2),
                    (max_z - pos.z, 3),
                ];
                let (_, face) = exits
                    .iter()
                    .copied()
                    .fold((f32::INFINITY, 0), |best, e| if e.0 < best.0 { e } else { best });
                match face {
                    0 => {
                        pos.x = min_x;
                        vel.x = 0.0;
                    }
                    1 => {
                        pos.x = max_x;
                        vel.x = 0.0;
                    }
                    2 => {
                        pos.z = min_z;
                        vel.z = 0.0;
                    }
                    _ => {
                        pos.z = max_z;
                        vel.z = 0.0;
                    }
                }
                true
            }
            Obstacle::Tree {
                center,
                radius,
                height,
            } => {
                if pos.y >= height {
                    return false;
                }
                let offset = Vec2::new(pos.x - center[0], pos.z - center[1]);
                let dist_sq = offset.length_squared();
                if dist_sq >= radius * radius {
                    return false;
                }
                // A particle dead-centre has no direction; eject along +x.
                let dir = if dist_sq < 1.0e-8 {
                    Vec2::X
                } else {
                    offset / dist_sq.sqrt()
                };
                pos.x = center[0] + dir.x * radius;
                pos.z = center[1] + dir.y * radius;

                let radial = vel.x * dir.x + vel.z * dir.y;
                if radial < 0.0 {
                    vel.x -= dir.x * radial;
                    vel.z -= dir.y * radial;
                }
                true
            }
        }
    }
}

// ── Hazards ───────────────────────────────────────────────────────────────────

/// Hazard placement for a stage.  Tuning lives in the per-kind spec structs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HazardSpec {
    Vent(VentSpec),
    Lightning(LightningSpec),
    Vortex(VortexSpec),
    Burrower(BurrowerSpec),
    /// Density-targeting sniper, tuned by [`crate::config::LeafConfig::targeting`].
    Sniper,
}

// ── Stage layout & registry ───────────────────────────────────────────────────

/// Everything the simulation needs to know about one stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageLayout {
    pub name: String,
    pub region: Region,
    #[serde(default = "default_leaf_count")]
    pub leaf_count: u32,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub hazards: Vec<HazardSpec>,
}

fn default_leaf_count() -> u32 {
    DEFAULT_STAGE_LEAF_COUNT
}

impl StageLayout {
    pub fn validate(&self) -> SimResult<()> {
        self.region.validate(&self.name)
    }
}

/// 1-based stage number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub u8);

/// Read-only registry of every stage in the session.
#[derive(Resource, Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<StageLayout>,
}

impl StageRegistry {
    /// Build a registry, rejecting stages with empty regions.
    pub fn new(stages: Vec<StageLayout>) -> SimResult<Self> {
        for stage in &stages {
            stage.validate()?;
        }
        Ok(Self { stages })
    }

    pub fn get(&self, id: StageId) -> Option<&StageLayout> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.stages.get(i))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageRegistry {
    /// Five 30 m × 24 m zones laid out along +x.
    fn default() -> Self {
        let backyard_trees = [
            Obstacle::tree([8.0, -8.0], 1.2),
            Obstacle::tree([10.0, 5.0], 1.0),
            Obstacle::tree([-8.0, -5.0], 1.1),
            Obstacle::tree([-10.0, 10.0], 0.9),
        ];

        let mut backyard_obstacles = vec![Obstacle::house([-15.0, -10.0], 4.0)];
        backyard_obstacles.extend(backyard_trees);

        let stages = vec![
            StageLayout {
                name: "The Backyard".into(),
                region: Region::new(-15.0, 15.0, -12.0, 12.0),
                leaf_count: DEFAULT_STAGE_LEAF_COUNT,
                obstacles: backyard_obstacles,
                hazards: Vec::new(),
            },
            StageLayout {
                name: "Autumn Expansion".into(),
                region: Region::new(15.0, 45.0, -12.0, 12.0),
                leaf_count: DEFAULT_STAGE_LEAF_COUNT,
                obstacles: vec![
                    Obstacle::tree([25.0, -5.0], 1.5),
                    Obstacle::tree([35.0, 8.0], 1.4),
                    Obstacle::tree([44.0, -10.0], 1.2),
                ],
                hazards: vec![
                    HazardSpec::Vent(VentSpec {
                        position: [40.0, 0.0, 0.0],
                        radius: 4.0,
                        strength: 20.0,
                        ..VentSpec::default()
                    }),
                    HazardSpec::Burrower(BurrowerSpec {
                        start: [30.0, 0.0],
                        ..BurrowerSpec::default()
                    }),
                ],
            },
            StageLayout {
                name: "Garden Path".into(),
                region: Region::new(45.0, 75.0, -12.0, 12.0),
                leaf_count: DEFAULT_STAGE_LEAF_COUNT,
                obstacles: vec![
                    Obstacle::tree([55.0, 5.0], 1.3),
                    Obstacle::tree([66.0, -6.0], 1.1),
                ],
                hazards: vec![
                    HazardSpec::Vent(VentSpec {
                        position: [60.0, 0.0, 6.0],
                        ..VentSpec::default()
                    }),
                    HazardSpec::Burrower(BurrowerSpec {
                        start: [50.0, -4.0],
                        ..BurrowerSpec::default()
                    }),
                    HazardSpec::Burrower(BurrowerSpec {
                        start: [70.0, 4.0],
                        ..BurrowerSpec::default()
                    }),
                ],
            },
            StageLayout {
                name: "Windy Lot".into(),
                region: Region::new(75.0, 105.0, -12.0, 12.0),
                leaf_count: DEFAULT_STAGE_LEAF_COUNT,
                obstacles: vec![Obstacle::tree([90.0, 0.0], 1.6)],
                hazards: vec![HazardSpec::Vortex(VortexSpec::default())],
            },
            StageLayout {
                name: "Storm Field".into(),
                region: Region::new(105.0, 135.0, -12.0, 12.0),
                leaf_count: DEFAULT_STAGE_LEAF_COUNT,
                obstacles: Vec::new(),
                hazards: vec![
                    HazardSpec::Lightning(LightningSpec::default()),
                    HazardSpec::Vortex(VortexSpec::default()),
                    HazardSpec::Sniper,
                ],
            },
        ];

        Self { stages }
    }
}

/// The stage currently being simulated.  Absent until the first [`EnterStage`].
#[derive(Resource, Debug, Clone)]
pub struct ActiveStage {
    pub id: StageId,
    pub layout: StageLayout,
}

/// Request to (re)enter a stage.  Sent by the external progression system.
#[derive(Message, Debug, Clone, Copy)]
pub struct EnterStage(pub StageId);

// ── Systems ───────────────────────────────────────────────────────────────────

/// Rebuild the particle population and hazards for the most recent
/// [`EnterStage`] request of this frame.
pub fn enter_stage_system(
    mut commands: Commands,
    mut requests: MessageReader<EnterStage>,
    registry: Res<StageRegistry>,
    config: Res<LeafConfig>,
    mut store: ResMut<ParticleStore>,
    hazards: Query<Entity, With<StageHazard>>,
) {
    let Some(EnterStage(id)) = requests.read().last().copied() else {
        return;
    };
    let Some(layout) = registry.get(id) else {
        warn!("EnterStage({}) ignored: no such stage", id.0);
        return;
    };

    for entity in hazards.iter() {
        commands.entity(entity).despawn();
    }

    let mut rng = rand::thread_rng();
    let placed = store.scatter(&layout.region, layout.leaf_count, &mut rng);
    spawn_stage_hazards(&mut commands, layout, &config);
    commands.insert_resource(ActiveStage {
        id,
        layout: layout.clone(),
    });

    info!(
        "Entered stage {} '{}': {} leaves, {} obstacles, {} hazards",
        id.0,
        layout.name,
        placed,
        layout.obstacles.len(),
        layout.hazards.len()
    );
}
