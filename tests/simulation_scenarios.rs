//! Whole-step properties of the leaf simulation, run without an `App`.
//!
//! Covered:
//! 1. Resting leaves stay bit-identical while asleep.
//! 2. Removed leaves ignore impulses, wind, and steps.
//! 3. An impulse shows up in the next step's velocity exactly once.
//! 4. Containment holds after every check, including for resting leaves.
//! 5. Radial falloff never grows with distance.
//! 6. Scenarios: a settled field costs nothing, a vent pops a pile, and a
//!    leaf just outside the stage is pulled back in.

use approx::assert_relative_eq;
use bevy::math::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use leaf_drift::config::SimParams;
use leaf_drift::hazards::RadialBurst;
use leaf_drift::simulation::{step, SimulationStats, StepContext, SweepSchedule};
use leaf_drift::stage::Region;
use leaf_drift::store::{ParticleState, ParticleStore};

const DT: f32 = 1.0 / 60.0;
const REGION: Region = Region::new(0.0, 30.0, -12.0, 12.0);

// ── Helpers ───────────────────────────────────────────────────────────────────

fn context<'a>(params: &'a SimParams, region: Option<&'a Region>) -> StepContext<'a> {
    StepContext {
        params,
        region,
        obstacles: &[],
        wind: Vec2::ZERO,
    }
}

/// `n` leaves resting on the ground at random points of `REGION`.
fn settled_field(n: u32, params: &SimParams, rng: &mut StdRng) -> ParticleStore {
    let mut store = ParticleStore::new(n);
    for i in 0..n {
        let p = REGION.random_point(rng);
        store.respawn(i, Vec3::new(p.x, params.ground_y, p.y), Vec3::ZERO, Vec3::ZERO);
    }
    store
}

fn bits(store: &ParticleStore) -> Vec<[u32; 3]> {
    store
        .positions()
        .iter()
        .map(|p| p.to_array().map(f32::to_bits))
        .collect()
}

// ── Invariants ────────────────────────────────────────────────────────────────

#[test]
fn asleep_leaves_do_not_drift() {
    let params = SimParams::default();
    let mut rng = StdRng::seed_from_u64(11);
    let mut store = settled_field(200, &params, &mut rng);
    let mut sweeps = SweepSchedule::from_params(&params);
    let ctx = context(&params, Some(&REGION));

    step(&mut store, &mut sweeps, &ctx, DT, &mut rng);
    let before = bits(&store);
    for _ in 0..120 {
        step(&mut store, &mut sweeps, &ctx, DT, &mut rng);
    }
    assert_eq!(bits(&store), before);
    assert!(store.states().iter().all(|&s| s == ParticleState::Asleep));
}

#[test]
fn removed_leaves_are_untouched_until_respawn() {
    let params = SimParams::default();
    let mut store = ParticleStore::new(2);
    store.respawn(0, Vec3::new(5.0, 3.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    store.respawn(1, Vec3::new(6.0, 3.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    assert!(store.collect(1));
    let parked = (store.position(1), store.velocity(1));

    let mut sweeps = SweepSchedule::from_params(&params);
    let mut rng = StdRng::seed_from_u64(2);
    let windy = StepContext {
        wind: Vec2::new(1.5, -0.5),
        ..context(&params, Some(&REGION))
    };
    for _ in 0..30 {
        store.apply_impulse(1, Vec3::new(4.0, 9.0, 4.0));
        step(&mut store, &mut sweeps, &windy, DT, &mut rng);
        assert_eq!((store.position(1), store.velocity(1)), parked);
        assert_eq!(store.state(1), ParticleState::Removed);
    }
    assert!(!store.collect(1), "already removed");

    store.respawn(1, Vec3::new(6.0, 3.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    assert_eq!(store.state(1), ParticleState::Active);
}

#[test]
fn impulse_adds_exactly_once() {
    let params = SimParams::default();
    let mut store = ParticleStore::new(2);
    // Two identical airborne leaves; only the first is kicked.
    store.respawn(0, Vec3::new(5.0, 6.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    store.respawn(1, Vec3::new(8.0, 6.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    let kick = Vec3::new(0.0, 3.5, 0.0);
    store.apply_impulse(0, kick);

    let mut sweeps = SweepSchedule::from_params(&params);
    let mut rng = StdRng::seed_from_u64(3);
    step(&mut store, &mut sweeps, &context(&params, None), DT, &mut rng);

    let diff = store.velocity(0) - store.velocity(1);
    assert_relative_eq!(diff.y, kick.y, epsilon = 1e-5);
    assert_eq!(diff.x, 0.0);
    assert_eq!(diff.z, 0.0);

    // No lingering effect on the following step.
    step(&mut store, &mut sweeps, &context(&params, None), DT, &mut rng);
    let diff = store.velocity(0) - store.velocity(1);
    assert_relative_eq!(diff.y, kick.y, epsilon = 1e-5);
}

#[test]
fn zero_impulse_does_not_wake_a_sleeper() {
    let params = SimParams::default();
    let mut rng = StdRng::seed_from_u64(4);
    let mut store = settled_field(1, &params, &mut rng);
    let mut sweeps = SweepSchedule::from_params(&params);
    step(&mut store, &mut sweeps, &context(&params, None), DT, &mut rng);
    assert_eq!(store.state(0), ParticleState::Asleep);

    store.apply_impulse(0, Vec3::ZERO);
    assert_eq!(store.state(0), ParticleState::Asleep);
    store.apply_impulse(0, Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(store.state(0), ParticleState::Active);
}

#[test]
fn containment_holds_after_every_check() {
    let params = SimParams {
        containment_period_secs: 0.0,
        ..SimParams::default()
    };
    let mut rng = StdRng::seed_from_u64(5);
    let mut store = ParticleStore::new(300);
    for i in 0..300 {
        let pos = Vec3::new(
            rng.gen_range(-20.0..50.0),
            rng.gen_range(0.5..4.0),
            rng.gen_range(-30.0..30.0),
        );
        let vel = Vec3::new(rng.gen_range(-6.0..6.0), 0.0, rng.gen_range(-6.0..6.0));
        store.respawn(i, pos, vel, Vec3::ZERO);
    }
    let mut sweeps = SweepSchedule::from_params(&params);
    let ctx = context(&params, Some(&REGION));

    for _ in 0..90 {
        step(&mut store, &mut sweeps, &ctx, DT, &mut rng);
        for (i, p) in store.positions().iter().enumerate() {
            assert!(
                REGION.contains_with_margin(p.x, p.z, params.containment_margin),
                "leaf {i} escaped to {p:?}"
            );
        }
    }
}

#[test]
fn radial_falloff_is_monotonic() {
    for burst in [RadialBurst::vent(5.0, 20.0), RadialBurst::scatter(2.2, 25.0)] {
        let mut previous = f32::INFINITY;
        for k in 1..100 {
            let d = burst.radius * k as f32 / 100.0;
            let magnitude = burst
                .impulse(Vec2::new(d, 0.0))
                .map_or(0.0, |j| j.length());
            assert!(
                magnitude <= previous + 1e-5,
                "impulse grew from {previous} to {magnitude} at d = {d}"
            );
            previous = magnitude;
        }
        assert!(burst.impulse(Vec2::new(burst.radius, 0.0)).is_none());
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

/// 10,000 leaves at rest for five simulated seconds: after the first settle
/// step no leaf is integrated.
#[test]
fn scenario_settled_field_costs_nothing() {
    let params = SimParams::default();
    let mut rng = StdRng::seed_from_u64(6);
    let mut store = settled_field(10_000, &params, &mut rng);
    let mut sweeps = SweepSchedule::from_params(&params);
    let ctx = context(&params, Some(&REGION));
    let mut stats = SimulationStats::default();

    for _ in 0..300 {
        let report = step(&mut store, &mut sweeps, &ctx, DT, &mut rng);
        stats.record(&report);
    }
    assert_eq!(stats.total_processed, 0);
    assert_eq!(stats.asleep, 10_000);
    assert_eq!(stats.frames, 300);
}

/// A vent of strength 20 and radius 5 under a pile of 50 leaves spread over
/// radius 3: every leaf lifts, and the one dead centre gets the full lift.
#[test]
fn scenario_vent_pops_every_leaf_in_the_pile() {
    let params = SimParams::default();
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = ParticleStore::new(50);
    store.respawn(0, Vec3::new(0.0, params.ground_y, 0.0), Vec3::ZERO, Vec3::ZERO);
    for i in 1..50 {
        let r = 3.0 * rng.gen::<f32>().sqrt();
        let p = Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU)) * r;
        store.respawn(i, Vec3::new(p.x, params.ground_y, p.y), Vec3::ZERO, Vec3::ZERO);
    }

    let burst = RadialBurst {
        jitter: 0.0,
        ..RadialBurst::vent(5.0, 20.0)
    };
    let hit = burst.apply(&mut store, Vec3::new(0.0, params.ground_y, 0.0), &mut rng);

    assert_eq!(hit, 50);
    assert!(store.velocities().iter().all(|v| v.y > 0.0));
    assert_eq!(store.velocity(0).y, 20.0);
}

/// A leaf 1 m past the stage edge is back inside on the frame its check runs.
#[test]
fn scenario_escaped_leaf_is_returned_when_checked() {
    let params = SimParams {
        containment_period_secs: 0.0,
        ..SimParams::default()
    };
    let mut store = ParticleStore::new(1);
    store.respawn(0, Vec3::new(REGION.max_x + 1.0, 2.0, 0.0), Vec3::ZERO, Vec3::ZERO);
    let mut sweeps = SweepSchedule::from_params(&params);
    let mut rng = StdRng::seed_from_u64(8);

    let report = step(&mut store, &mut sweeps, &context(&params, Some(&REGION)), DT, &mut rng);
    assert_eq!(report.respawned, 1);
    let x = store.position(0).x;
    assert!(x > REGION.min_x && x < REGION.max_x, "x = {x}");
}

/// Same, with the default staggered cadence and a leaf that has already come
/// to rest outside: it waits for its turn, then is returned.
#[test]
fn scenario_resting_escapee_is_returned_on_its_turn() {
    let params = SimParams::default();
    let mut rng = StdRng::seed_from_u64(9);
    let mut store = settled_field(300, &params, &mut rng);
    let outside = Vec3::new(REGION.max_x + 1.0, params.ground_y, 0.0);
    store.respawn(150, outside, Vec3::ZERO, Vec3::ZERO);
    let mut sweeps = SweepSchedule::from_params(&params);
    let ctx = context(&params, Some(&REGION));

    let frames_per_period = (params.containment_period_secs / DT).ceil() as usize;
    let mut returned_on = None;
    for frame in 0..frames_per_period + 2 {
        let report = step(&mut store, &mut sweeps, &ctx, DT, &mut rng);
        if report.respawned > 0 {
            returned_on = Some(frame);
            break;
        }
        assert_eq!(store.position(150), outside);
    }
    assert!(returned_on.is_some(), "leaf was never checked");
    let x = store.position(150).x;
    assert!(x > REGION.min_x && x < REGION.max_x, "x = {x}");
    assert_eq!(store.state(150), ParticleState::Active);
}
