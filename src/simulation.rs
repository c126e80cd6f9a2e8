//! Per-frame leaf integration.
//!
//! ## Step order (per live particle)
//!
//! 1. **Sleep check**: a slow particle resting on the ground with no wind
//!    blowing is put to sleep and skipped.  Asleep particles stay asleep until
//!    an impulse or the wind wakes them.  A resting leaf outside the stage is
//!    still respawned when its containment turn comes up.
//! 2. **Gravity** while above ground.
//! 3. **Wind** added to horizontal velocity.
//! 4. **Integrate** position.
//! 5. **Obstacles** (staggered): push out of building and trunk footprints.
//! 6. **Containment** (staggered): outside the stage region plus margin means
//!    respawn from the sky at a random point inside the region.
//! 7. **Ground contact**: clamp, friction, tilt damping, rest snapping; or
//!    air drag and tumble while airborne.
//! 8. Write back the state and the instance transform.
//!
//! The core is [`step`], a plain function over a [`ParticleStore`] so the
//! behaviour is testable without an `App`; [`simulation_step_system`] wires it
//! into Bevy.

use bevy::prelude::*;
use rand::Rng;

use crate::config::{LeafConfig, SimParams};
use crate::constants::LEAF_CAPACITY;
use crate::stage::{ActiveStage, Obstacle, Region};
use crate::stagger::StaggeredSweep;
use crate::store::{instance_transform, random_orientation, ParticleState, ParticleStore};
use crate::wind::Wind;

// ── Resources ─────────────────────────────────────────────────────────────────

/// Rotating cursors for the two staggered checks.
#[derive(Resource, Debug, Clone)]
pub struct SweepSchedule {
    pub containment: StaggeredSweep,
    pub obstacles: StaggeredSweep,
}

impl SweepSchedule {
    pub fn from_params(params: &SimParams) -> Self {
        Self {
            containment: StaggeredSweep::new(params.containment_period_secs),
            obstacles: StaggeredSweep::new(params.obstacle_period_secs),
        }
    }

    /// Re-read the periods after a config reload.
    pub fn sync(&mut self, params: &SimParams) {
        self.containment.set_period(params.containment_period_secs);
        self.obstacles.set_period(params.obstacle_period_secs);
    }
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self::from_params(&SimParams::default())
    }
}

/// Instrumentation counters.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    /// Particles that passed the sleep check and were integrated last step.
    pub processed_last_step: u32,
    /// Particles asleep after the last step.
    pub asleep: u32,
    /// Containment respawns during the last step.
    pub respawned_last_step: u32,
    /// Sum of `processed_last_step` over the session.
    pub total_processed: u64,
    /// Steps run.
    pub frames: u64,
}

impl SimulationStats {
    pub fn record(&mut self, report: &StepReport) {
        self.processed_last_step = report.processed;
        self.asleep = report.asleep;
        self.respawned_last_step = report.respawned;
        self.total_processed += report.processed as u64;
        self.frames += 1;
    }
}

// ── Step ──────────────────────────────────────────────────────────────────────

/// Stage inputs to one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub params: &'a SimParams,
    /// Containment region.  `None` disables containment.
    pub region: Option<&'a Region>,
    pub obstacles: &'a [Obstacle],
    /// Horizontal wind acceleration `(x, z)`; zero when calm.
    pub wind: Vec2,
}

/// What one step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub processed: u32,
    pub asleep: u32,
    pub respawned: u32,
}

/// Advance every live particle by `min(frame_dt, max_step_dt)`.
pub fn step(
    store: &mut ParticleStore,
    sweeps: &mut SweepSchedule,
    ctx: &StepContext,
    frame_dt: f32,
    rng: &mut impl Rng,
) -> StepReport {
    let p = ctx.params;
    let dt = frame_dt.clamp(0.0, p.max_step_dt);
    let count = store.count();
    let containment = sweeps.containment.advance(count, dt);
    let obstacle_window = sweeps.obstacles.advance(count, dt);

    let wind_active = ctx.wind != Vec2::ZERO;
    let rest_height = p.ground_y + p.sleep_height_epsilon;
    let mut report = StepReport::default();

    let buf = store.buffers_mut();
    for i in 0..count as usize {
        let state = buf.states[i];
        if state == ParticleState::Removed {
            continue;
        }

        let mut pos = buf.positions[i];
        let mut vel = buf.velocities[i];

        let check_bounds = containment.contains(i as u32);

        // 1. Sleep
        if !wind_active && vel.length_squared() < p.sleep_speed_sq && pos.y <= rest_height {
            // A leaf that came to rest outside the stage is still reclaimed
            // when its containment turn comes up.
            if let Some(region) = ctx.region.filter(|_| check_bounds) {
                if !region.contains_with_margin(pos.x, pos.z, p.containment_margin) {
                    let (pos, vel, rot) = sky_drop(region, p, rng);
                    buf.positions[i] = pos;
                    buf.velocities[i] = vel;
                    buf.orientations[i] = rot;
                    buf.states[i] = ParticleState::Active;
                    buf.transforms[i] = instance_transform(pos, rot);
                    report.respawned += 1;
                    continue;
                }
            }
            if state == ParticleState::Active {
                buf.velocities[i] = Vec3::ZERO;
                buf.states[i] = ParticleState::Asleep;
            }
            report.asleep += 1;
            continue;
        }
        buf.states[i] = ParticleState::Active;
        report.processed += 1;

        // 2. Gravity
        if pos.y > p.ground_y {
            vel.y += p.gravity * dt;
        }

        // 3. Wind
        if wind_active {
            vel.x += ctx.wind.x * dt;
            vel.z += ctx.wind.y * dt;
        }

        // 4. Integrate
        pos += vel * dt;

        let mut rot = buf.orientations[i];

        // 5. Obstacles
        if obstacle_window.contains(i as u32) {
            for obstacle in ctx.obstacles {
                obstacle.resolve(&mut pos, &mut vel);
            }
        }

        // 6. Containment, after obstacles: a footprint straddling the stage
        // edge can push a leaf out.
        if let Some(region) = ctx.region.filter(|_| check_bounds) {
            if !region.contains_with_margin(pos.x, pos.z, p.containment_margin) {
                (pos, vel, rot) = sky_drop(region, p, rng);
                report.respawned += 1;
            }
        }

        // 7. Ground contact / air
        if pos.y <= p.ground_y {
            pos.y = p.ground_y;
            vel.y = 0.0;
            vel.x *= p.ground_friction;
            vel.z *= p.ground_friction;
            rot.x *= p.tilt_damping;
            rot.z *= p.tilt_damping;
            if vel.x.abs() < p.rest_snap_speed {
                vel.x = 0.0;
            }
            if vel.z.abs() < p.rest_snap_speed {
                vel.z = 0.0;
            }
        } else {
            vel.x *= p.air_drag;
            vel.z *= p.air_drag;
            let tumble = p.tumble_rate * dt;
            rot.x += vel.z * tumble;
            rot.z -= vel.x * tumble;
            rot.y += Vec2::new(vel.x, vel.z).length() * tumble * 0.5;
        }

        // 8. Write back
        buf.positions[i] = pos;
        buf.velocities[i] = vel;
        buf.orientations[i] = rot;
        buf.transforms[i] = instance_transform(pos, rot);
    }

    if report.processed > 0 || report.respawned > 0 {
        store.mark_transforms_dirty();
    }
    report
}

/// Position, velocity, and orientation of a leaf dropped back in from the sky
/// at a random point strictly inside `region`.
fn sky_drop(region: &Region, p: &SimParams, rng: &mut impl Rng) -> (Vec3, Vec3, Vec3) {
    let xz = region.random_point_inset(rng);
    let y = if p.sky_drop_max_y > p.sky_drop_min_y {
        rng.gen_range(p.sky_drop_min_y..p.sky_drop_max_y)
    } else {
        p.sky_drop_min_y
    };
    (
        Vec3::new(xz.x, y, xz.y),
        Vec3::new(0.0, -p.respawn_fall_speed, 0.0),
        random_orientation(rng),
    )
}

// ── Plugin ────────────────────────────────────────────────────────────────────

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<ParticleStore>() {
            app.insert_resource(ParticleStore::new(LEAF_CAPACITY));
        }
        app.init_resource::<SweepSchedule>()
            .init_resource::<SimulationStats>()
            .init_resource::<Wind>()
            .add_systems(
                Update,
                (
                    crate::wind::wind_system.in_set(crate::LeafSet::Wind),
                    simulation_step_system.in_set(crate::LeafSet::Simulate),
                ),
            );
    }
}

/// Run one [`step`] against the active stage.
pub fn simulation_step_system(
    time: Res<Time>,
    config: Res<LeafConfig>,
    stage: Option<Res<ActiveStage>>,
    wind: Res<Wind>,
    mut store: ResMut<ParticleStore>,
    mut sweeps: ResMut<SweepSchedule>,
    mut stats: ResMut<SimulationStats>,
) {
    if config.is_changed() {
        sweeps.sync(&config.sim);
    }
    let layout = stage.as_ref().map(|s| &s.layout);
    let ctx = StepContext {
        params: &config.sim,
        region: layout.map(|l| &l.region),
        obstacles: layout.map(|l| l.obstacles.as_slice()).unwrap_or_default(),
        wind: wind.vector(),
    };
    let report = step(
        &mut store,
        &mut sweeps,
        &ctx,
        time.delta_secs(),
        &mut rand::thread_rng(),
    );
    stats.record(&report);
}
