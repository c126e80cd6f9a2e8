use std::env;
use std::str::FromStr;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use leaf_drift::simulation::SimulationStats;
use leaf_drift::stage::{EnterStage, StageId};
use leaf_drift::store::ParticleStore;
use leaf_drift::LeafDriftPlugin;

/// Headless run settings from the environment.
#[derive(Resource, Debug, Clone, Copy)]
struct RunSettings {
    stage: StageId,
    seconds: f32,
}

#[derive(Resource)]
struct StatsLogTimer(Timer);

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{key}={raw:?} is not valid; using the default");
            default
        }),
        Err(_) => default,
    }
}

/// Startup: read the run settings once logging is up.
fn read_run_settings(mut commands: Commands) {
    let settings = RunSettings {
        stage: StageId(env_or("LEAF_DRIFT_STAGE", 1u8)),
        seconds: env_or("LEAF_DRIFT_SECONDS", 10.0f32),
    };
    info!("Running stage {} for {} s", settings.stage.0, settings.seconds);
    commands.insert_resource(settings);
}

fn enter_initial_stage(settings: Res<RunSettings>, mut enter: MessageWriter<EnterStage>) {
    enter.write(EnterStage(settings.stage));
}

fn log_stats_system(
    time: Res<Time>,
    mut timer: ResMut<StatsLogTimer>,
    stats: Res<SimulationStats>,
    store: Res<ParticleStore>,
) {
    timer.0.tick(time.delta());
    if !timer.0.just_finished() {
        return;
    }
    info!(
        "t={:.1}s live={} asleep={} processed={} respawned={} total_processed={}",
        time.elapsed_secs(),
        store.live_count(),
        stats.asleep,
        stats.processed_last_step,
        stats.respawned_last_step,
        stats.total_processed,
    );
}

fn exit_after_system(
    time: Res<Time>,
    settings: Res<RunSettings>,
    stats: Res<SimulationStats>,
    mut exit: MessageWriter<AppExit>,
) {
    if time.elapsed_secs() >= settings.seconds {
        info!(
            "Finished after {} frames, {} particle updates",
            stats.frames, stats.total_processed
        );
        exit.write(AppExit::Success);
    }
}

fn main() {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .insert_resource(StatsLogTimer(Timer::from_seconds(1.0, TimerMode::Repeating)))
        .add_plugins(LeafDriftPlugin)
        .add_systems(
            Startup,
            (
                read_run_settings,
                enter_initial_stage.after(leaf_drift::config::load_leaf_config),
            )
                .chain(),
        )
        .add_systems(Update, (log_stats_system, exit_after_system))
        .run();
}
