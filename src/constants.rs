//! Centralised simulation, tool, hazard, and targeting constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place without source-diving across multiple modules.
//! [`crate::config::LeafConfig::default`] is built from these values, and
//! `assets/leaf_drift.toml` can override any subset at startup.
//!
//! ## Tuning guidance
//!
//! Each constant notes the observable consequence of changing it.  After
//! editing, run `cargo test` to confirm the simulation properties still hold.

// ── Files ─────────────────────────────────────────────────────────────────────

/// Runtime configuration file read by [`crate::config::load_leaf_config`].
pub const CONFIG_PATH: &str = "assets/leaf_drift.toml";

/// Scoring-model weights (JSON) loaded once per session by the targeting oracle.
pub const MODEL_PATH: &str = "assets/models/mole_sniper.json";

// ── Particle Population ───────────────────────────────────────────────────────

/// Particle pool capacity, allocated once per session.
pub const LEAF_CAPACITY: u32 = 10_000;

/// Leaves scattered over a stage that does not specify its own count.
pub const DEFAULT_STAGE_LEAF_COUNT: u32 = 8_000;

/// Height at which removed particles are parked so raw position readers never
/// draw them.  Liveness is tracked by [`crate::store::ParticleState`], not by
/// this value.
pub const REMOVED_PARK_Y: f32 = -1000.0;

/// Initial scatter drops leaves from this height band (m) so the opening frames
/// show them settling.
pub const INITIAL_DROP_MIN_Y: f32 = 5.0;
pub const INITIAL_DROP_MAX_Y: f32 = 25.0;

// ── Simulation: Integration ───────────────────────────────────────────────────

/// Gravitational acceleration (m/s²), applied only while airborne.
pub const GRAVITY: f32 = -9.8;

/// Height of the ground plane the leaves rest on.
pub const GROUND_Y: f32 = 0.02;

/// Upper bound on the integration step (s).  A lag spike longer than this makes
/// the simulation appear to slow down rather than diverge.
pub const MAX_STEP_DT: f32 = 0.05;

/// Squared speed below which a grounded particle is put to sleep (0.001²).
pub const SLEEP_SPEED_SQ: f32 = 1.0e-6;

/// Height tolerance above the ground still considered "resting".
pub const SLEEP_HEIGHT_EPSILON: f32 = 0.01;

/// Per-frame horizontal velocity multiplier on ground contact.
/// Lower values stop leaves faster; 0.8 stops a 5 m/s leaf in ~0.5 s.
pub const GROUND_FRICTION: f32 = 0.8;

/// Per-frame horizontal velocity multiplier while airborne.
pub const AIR_DRAG: f32 = 0.98;

/// Per-frame multiplier pulling tilt (x/z orientation) back toward flat on the ground.
pub const TILT_DAMPING: f32 = 0.9;

/// Tumble (radians per second) accumulated per unit of horizontal velocity in
/// the air.  6.0 matches 0.1 rad per frame at 60 Hz.
pub const TUMBLE_RATE: f32 = 6.0;

/// Horizontal speed below which a grounded particle's velocity snaps to zero.
pub const REST_SNAP_SPEED: f32 = 0.01;

// ── Simulation: Containment & Obstacles ───────────────────────────────────────

/// Distance a particle may stray outside the active region before it is respawned.
/// Keep it under a metre: a leaf one metre out must be pulled back.
pub const CONTAINMENT_MARGIN: f32 = 0.5;

/// Every live particle is checked against the stage region at least once per
/// this many seconds (≈300 frames at 60 Hz).
pub const CONTAINMENT_PERIOD_SECS: f32 = 5.0;

/// Every live particle is checked against the static obstacles at least once
/// per this many seconds (≈3 frames at 60 Hz).
pub const OBSTACLE_PERIOD_SECS: f32 = 0.05;

/// Respawned particles reappear this high above the ground.
pub const SKY_DROP_MIN_Y: f32 = 5.0;
pub const SKY_DROP_MAX_Y: f32 = 15.0;

/// Downward seed speed (m/s) given to respawned particles.
pub const RESPAWN_FALL_SPEED: f32 = 1.0;

/// Respawn points are kept at least this far inside the region edges.
pub const RESPAWN_INSET: f32 = 0.5;

// ── Wind ──────────────────────────────────────────────────────────────────────

/// Seconds between gusts (uniformly sampled).
pub const WIND_INTERVAL_MIN_SECS: f32 = 20.0;
pub const WIND_INTERVAL_MAX_SECS: f32 = 30.0;

/// Gust duration range (s).
pub const WIND_GUST_MIN_SECS: f32 = 4.0;
pub const WIND_GUST_MAX_SECS: f32 = 8.0;

/// Gust acceleration range (m/s²) applied to horizontal velocity.
pub const WIND_STRENGTH_MIN: f32 = 0.6;
pub const WIND_STRENGTH_MAX: f32 = 2.0;

/// Rate (1/s) at which the wind vector eases toward the current gust.
pub const WIND_RAMP_RATE: f32 = 1.5;

/// Exponential decay rate (1/s) once the gust has ended.
pub const WIND_DECAY_RATE: f32 = 0.8;

/// Wind magnitude below which the wind counts as calm and snaps to zero.
pub const WIND_CALM_EPSILON: f32 = 1.0e-3;

// ── Tools: Common ─────────────────────────────────────────────────────────────

/// Highest purchasable upgrade tier for every tool.
pub const UPGRADE_MAX_LEVEL: u8 = 4;

/// Ground aim point is clamped to this distance from the eye (m).
pub const TOOL_MAX_REACH: f32 = 6.0;

/// When the view ray never meets the ground, the aim point sits this far ahead.
pub const TOOL_FALLBACK_AHEAD: f32 = 4.0;

/// Leaves higher than this are treated as airborne by ground-only effects.
pub const GROUNDED_MAX_HEIGHT: f32 = 1.0;

// ── Tools: Hand ───────────────────────────────────────────────────────────────

/// Throttle between hand pickups while the trigger is held (s).
pub const HAND_TICK_SECS: f32 = 0.2;

/// Leaves further than this from the eye are never considered (m).
pub const HAND_SCAN_RADIUS: f32 = 5.0;

/// Maximum eye distance of the picked leaf (m).
pub const HAND_REACH: f32 = 4.5;

/// Maximum distance between a leaf and the view ray to count as "under the cursor".
pub const HAND_RAY_TOLERANCE: f32 = 0.8;

/// Gather radius around the first picked leaf.
pub const HAND_PICKUP_RADIUS: f32 = 1.0;

/// Gather radius once the pick amount reaches [`HAND_WIDE_PICKUP_THRESHOLD`].
pub const HAND_WIDE_PICKUP_RADIUS: f32 = 2.5;
pub const HAND_WIDE_PICKUP_THRESHOLD: u32 = 100;

/// Leaves picked per grab at upgrade levels 1..=4.
pub const HAND_PICK_AMOUNTS: [u32; 4] = [1, 3, 5, 10];

// ── Tools: Rake ───────────────────────────────────────────────────────────────

pub const RAKE_TICK_SECS: f32 = 0.2;
pub const RAKE_BASE_RANGE: f32 = 3.0;
pub const RAKE_RANGE_PER_LEVEL: f32 = 0.75;
pub const RAKE_BASE_STRENGTH: f32 = 15.0;
pub const RAKE_STRENGTH_PER_LEVEL: f32 = 5.0;

/// Small hop given to scraped leaves so they clear the ground friction.
pub const RAKE_LIFT: f32 = 0.2;

// ── Tools: Blower ─────────────────────────────────────────────────────────────

pub const BLOWER_TICK_SECS: f32 = 0.05;
pub const BLOWER_BASE_RANGE: f32 = 5.0;
pub const BLOWER_RANGE_PER_LEVEL: f32 = 1.25;
pub const BLOWER_BASE_STRENGTH: f32 = 5.0;
pub const BLOWER_STRENGTH_PER_LEVEL: f32 = 2.5;

/// Nozzle sits this far in front of the eye (m, horizontal).
pub const BLOWER_DISTANCE: f32 = 3.0;

/// Half-angle of the blower cone (degrees).  45° gives a 90° total cone.
pub const BLOWER_CONE_HALF_ANGLE_DEG: f32 = 45.0;

/// Higher values concentrate the push near the nozzle.
pub const BLOWER_FALLOFF_EXPONENT: f32 = 1.5;

// ── Tools: Vacuum ─────────────────────────────────────────────────────────────

pub const VACUUM_TICK_SECS: f32 = 0.05;
pub const VACUUM_RANGE: f32 = 4.0;
pub const VACUUM_COLLECT_RADIUS: f32 = 1.0;
pub const VACUUM_STRENGTH: f32 = 10.0;
pub const VACUUM_LIFT: f32 = 0.1;

// ── Hazards: Radial Bursts ────────────────────────────────────────────────────

/// Lift falls off as `ratio^0.32`, push as `ratio^0.51`: the push fades first
/// toward the rim, producing a hemispherical pop.
pub const BURST_LIFT_EXPONENT: f32 = 0.32;
pub const BURST_PUSH_EXPONENT: f32 = 0.51;

/// Peak-to-peak horizontal jitter added to each burst impulse.
pub const BURST_JITTER: f32 = 1.5;

pub const VENT_RADIUS: f32 = 3.0;
pub const VENT_STRENGTH: f32 = 15.0;
pub const VENT_INTERVAL_SECS: f32 = 5.0;

// ── Hazards: Lightning ────────────────────────────────────────────────────────

pub const LIGHTNING_RADIUS: f32 = 5.0;
pub const LIGHTNING_FORCE: f32 = 30.0;
pub const LIGHTNING_CYCLE_SECS: f32 = 10.0;
pub const LIGHTNING_FIRST_DELAY_SECS: f32 = 2.0;
pub const LIGHTNING_STRIKES_PER_BURST: u32 = 5;
pub const LIGHTNING_STRIKE_SPACING_SECS: f32 = 0.2;

// ── Hazards: Vortex ───────────────────────────────────────────────────────────

pub const VORTEX_PATH_RADIUS: f32 = 10.0;
pub const VORTEX_ANGULAR_SPEED: f32 = 0.3;
pub const VORTEX_RADIUS: f32 = 4.0;

/// Per-second impulse rates at the vortex core.  Lift must beat gravity for
/// leaves to rise into the funnel.
pub const VORTEX_SUCTION: f32 = 6.0;
pub const VORTEX_ORBIT: f32 = 9.0;
pub const VORTEX_LIFT: f32 = 14.0;

// ── Hazards: Burrower ─────────────────────────────────────────────────────────

pub const BURROWER_RADIUS: f32 = 4.0;
pub const BURROWER_STRENGTH: f32 = 20.0;
pub const BURROWER_INTERVAL_SECS: f32 = 3.0;

/// Underground travel speed (m/s).
pub const BURROWER_SPEED: f32 = 3.0;

/// Distance to the target at which the burrower surfaces.
pub const BURROWER_ARRIVE_DIST: f32 = 0.5;

pub const BURROWER_BLAST_SECS: f32 = 0.5;
pub const BURROWER_DESCENT_SECS: f32 = 1.5;

/// Cell size of the coarse grid the burrower searches for clusters.
pub const BURROWER_GRID_CELL: f32 = 3.0;

// ── Targeting: Density Grid ───────────────────────────────────────────────────

pub const GRID_COLS: usize = 20;
pub const GRID_ROWS: usize = 16;
pub const GRID_CELL_SIZE: f32 = 1.5;
pub const GRID_ORIGIN_X: f32 = 105.0;
pub const GRID_ORIGIN_Z: f32 = -12.0;

/// Density grid rebuild cadence (s).  ~3 Hz is plenty for strategy.
pub const DENSITY_REFRESH_SECS: f32 = 0.3;

// ── Targeting: Oracle ─────────────────────────────────────────────────────────

pub const TARGET_MIN_DIST: f32 = 4.0;
pub const TARGET_MAX_DIST: f32 = 9.0;
pub const TARGET_CONE_HALF_ANGLE_DEG: f32 = 55.0;
pub const TARGET_IDEAL_DIST: f32 = 6.5;
pub const TARGET_DIST_TOLERANCE: f32 = 2.5;
pub const TARGET_DENSITY_WEIGHT: f32 = 0.2;

/// The relaxed search used when no cell passes the strict constraints.
pub const RELAXED_MIN_DIST_SCALE: f32 = 0.5;
pub const RELAXED_MAX_DIST_SCALE: f32 = 1.5;
pub const RELAXED_CONE_HALF_ANGLE_DEG: f32 = 90.0;

/// Hidden width of the default scoring MLP.
pub const MODEL_HIDDEN_SIZE: usize = 128;

/// Half-width of the uniform range untrained MLP weights are drawn from.
pub const MODEL_INIT_SCALE: f32 = 0.17;

// ── Targeting: Sniper ─────────────────────────────────────────────────────────

pub const SNIPER_COOLDOWN_SECS: f32 = 10.0;
pub const SNIPER_INITIAL_DELAY_SECS: f32 = 2.0;
pub const SNIPER_SCATTER_RADIUS: f32 = 2.2;
pub const SNIPER_SCATTER_FORCE: f32 = 25.0;
