//! Writes an untrained sniper scoring model in the JSON layout the game loads.
//!
//! Usage: `cargo run --bin gen_sniper_model [OUTPUT] [SEED]`
//! (defaults: `assets/models/mole_sniper.json`, seed 42).
//!
//! The widths follow the default `[targeting]` grid: one input per cell plus
//! four pose values, one score per cell.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;

use leaf_drift::constants::{MODEL_HIDDEN_SIZE, MODEL_INIT_SCALE, MODEL_PATH};
use leaf_drift::targeting::{MlpModel, TargetingParams};

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let path = PathBuf::from(args.next().unwrap_or_else(|| MODEL_PATH.to_owned()));
    let seed = match args.next().map(|s| s.parse::<u64>()) {
        None => 42,
        Some(Ok(seed)) => seed,
        Some(Err(e)) => {
            eprintln!("seed must be an integer: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cells = TargetingParams::default().grid_layout().len();
    let shape = (cells + 4, MODEL_HIDDEN_SIZE, cells);
    let model = MlpModel::random(shape, MODEL_INIT_SCALE, &mut StdRng::seed_from_u64(seed));

    let json = match model.to_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("cannot create {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    }
    if let Err(e) = fs::write(&path, json) {
        eprintln!("cannot write {}: {e}", path.display());
        return ExitCode::FAILURE;
    }
    println!(
        "✓ Wrote {} → {} → {} model to {}",
        shape.0,
        shape.1,
        shape.2,
        path.display()
    );
    ExitCode::SUCCESS
}
