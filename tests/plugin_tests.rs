//! Headless tests of the full plugin stack.
//!
//! These use [`MinimalPlugins`] with a fixed 60 Hz virtual clock, so no window
//! or renderer is created and frame times are deterministic.
//!
//! Covered scenarios:
//! 1. Entering a stage scatters its leaves and spawns its hazards.
//! 2. Re-entering replaces the previous stage's hazards.
//! 3. A held vacuum collects leaves and reports them.
//! 4. A sniper with no model still fires at a heuristic target.

use std::time::Duration;

use bevy::ecs::message::Messages;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use leaf_drift::constants::LEAF_CAPACITY;
use leaf_drift::error::ModelError;
use leaf_drift::hazards::StageHazard;
use leaf_drift::interaction::{LeavesCollected, ToolInput, ToolKind};
use leaf_drift::simulation::SimulationStats;
use leaf_drift::stage::{ActiveStage, EnterStage, StageId, StageRegistry};
use leaf_drift::store::ParticleStore;
use leaf_drift::targeting::{ModelHandle, Sniper, TargetingOracle, TargetingParams};
use leaf_drift::{LeafDriftPlugin, LeafSet};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )))
        .add_plugins(LeafDriftPlugin);
    app
}

fn enter(app: &mut App, id: u8) {
    app.world_mut()
        .resource_mut::<Messages<EnterStage>>()
        .write(EnterStage(StageId(id)));
    app.update();
}

fn hazard_count(app: &mut App) -> usize {
    let mut query = app.world_mut().query_filtered::<Entity, With<StageHazard>>();
    query.iter(app.world()).count()
}

#[derive(Resource, Default)]
struct CollectedTotal(u32);

fn tally_collected(mut reader: MessageReader<LeavesCollected>, mut total: ResMut<CollectedTotal>) {
    for message in reader.read() {
        total.0 += message.count;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn entering_a_stage_scatters_leaves_and_spawns_hazards() {
    let mut app = headless_app();
    enter(&mut app, 5);

    let layout = app
        .world()
        .resource::<StageRegistry>()
        .get(StageId(5))
        .expect("built-in stage 5")
        .clone();
    let active = app.world().resource::<ActiveStage>();
    assert_eq!(active.id, StageId(5));

    let store = app.world().resource::<ParticleStore>();
    assert_eq!(store.live_count(), layout.leaf_count.min(LEAF_CAPACITY));
    // Hazards may already have nudged a few leaves this frame.
    for (_, p) in store.view().live() {
        assert!(layout.region.contains_with_margin(p.x, p.z, 0.1));
    }
    assert_eq!(hazard_count(&mut app), layout.hazards.len());
}

#[test]
fn re_entering_replaces_hazards() {
    let mut app = headless_app();
    enter(&mut app, 5);
    enter(&mut app, 2);

    let expected = app
        .world()
        .resource::<StageRegistry>()
        .get(StageId(2))
        .expect("built-in stage 2")
        .hazards
        .len();
    assert_eq!(hazard_count(&mut app), expected);
    assert_eq!(app.world().resource::<ActiveStage>().id, StageId(2));
}

#[test]
fn unknown_stage_is_ignored() {
    let mut app = headless_app();
    enter(&mut app, 99);
    assert!(app.world().get_resource::<ActiveStage>().is_none());
    assert_eq!(app.world().resource::<ParticleStore>().live_count(), 0);
}

#[test]
fn simulation_runs_every_frame() {
    let mut app = headless_app();
    enter(&mut app, 1);
    for _ in 0..9 {
        app.update();
    }
    let stats = app.world().resource::<SimulationStats>();
    assert_eq!(stats.frames, 10);
    assert!(stats.processed_last_step > 0, "leaves are still falling");
}

#[test]
fn held_vacuum_collects_and_reports() {
    let mut store = ParticleStore::new(3);
    store.respawn(0, Vec3::new(0.2, 0.02, 0.0), Vec3::ZERO, Vec3::ZERO);
    store.respawn(1, Vec3::new(-0.1, 0.02, 0.3), Vec3::ZERO, Vec3::ZERO);
    store.respawn(2, Vec3::new(20.0, 0.02, 0.0), Vec3::ZERO, Vec3::ZERO);

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )))
        .insert_resource(store)
        .add_plugins(LeafDriftPlugin)
        .init_resource::<CollectedTotal>()
        .add_systems(Update, tally_collected.after(LeafSet::Interact));
    app.insert_resource(ToolInput {
        active: ToolKind::Vacuum,
        triggered: true,
        eye: Vec3::new(0.0, 0.5, 0.0),
        forward: Vec3::NEG_Z,
        ..ToolInput::default()
    });

    app.update();
    app.update();

    assert_eq!(app.world().resource::<ParticleStore>().live_count(), 1);
    assert_eq!(app.world().resource::<CollectedTotal>().0, 2);
}

#[test]
fn sniper_fires_without_a_model() {
    let params = TargetingParams {
        cooldown_secs: 0.1,
        initial_delay_secs: 0.0,
        ..TargetingParams::default()
    };
    let mut store = ParticleStore::new(40);
    for i in 0..40 {
        let x = 116.0 + (i % 8) as f32 * 0.5;
        let z = -1.0 + (i / 8) as f32 * 0.5;
        store.respawn(i, Vec3::new(x, 0.02, z), Vec3::ZERO, Vec3::ZERO);
    }

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )))
        .insert_resource(store)
        .insert_resource(TargetingOracle::new(
            ModelHandle::failed(ModelError::Parse {
                message: "no model in tests".into(),
            }),
            params.clone(),
        ))
        .add_plugins(LeafDriftPlugin);
    app.insert_resource(ToolInput {
        eye: Vec3::new(110.0, 1.6, 0.0),
        forward: Vec3::X,
        ..ToolInput::default()
    });
    let sniper = app.world_mut().spawn(Sniper::new(&params)).id();

    for _ in 0..300 {
        app.update();
        if app.world().get::<Sniper>(sniper).is_some_and(|s| s.shots > 0) {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let sniper = app.world().get::<Sniper>(sniper).expect("sniper entity");
    assert!(sniper.shots > 0, "sniper never fired");
    let shot = sniper.last_shot.expect("a resolved shot");
    assert!(!shot.used_model);
    let dist = (shot.world_pos - Vec2::new(110.0, 0.0)).length();
    assert!((params.min_dist..=params.max_dist).contains(&dist));
}
