//! Learned scoring model and its memoized asynchronous load.
//!
//! The model maps a flattened density grid plus the agent's normalized
//! position and facing to one score per cell.  [`MlpModel`] is a two-layer
//! perceptron whose weights ship as JSON:
//!
//! ```json
//! {
//!   "input_size": 324, "hidden_size": 128, "output_size": 320,
//!   "w1": [[...128 floats...], ...324 rows],
//!   "b1": [...128 floats...],
//!   "w2": [[...320 floats...], ...128 rows],
//!   "b2": [...320 floats...]
//! }
//! ```
//!
//! [`ModelHandle`] wraps the load in a shared future: the first poll runs it,
//! every clone observes the same outcome, and a failure stays failed for the
//! rest of the session.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy::log::{info, warn};
use futures::future::{BoxFuture, FutureExt, Shared};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ── Trait ─────────────────────────────────────────────────────────────────────

/// Anything that can score every grid cell for a targeting query.
pub trait ScoringModel: Send + Sync {
    /// Width of the input vector.
    fn input_len(&self) -> usize;
    /// Number of scores produced (one per grid cell).
    fn output_len(&self) -> usize;
    /// Score one input vector.
    fn score(&self, input: &[f32]) -> Result<Vec<f32>, ModelError>;
}

// ── MLP ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct MlpFile {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    w1: Vec<Vec<f32>>,
    b1: Vec<f32>,
    w2: Vec<Vec<f32>>,
    b2: Vec<f32>,
}

/// Dense → ReLU → dense.  Weight matrices are stored row-major by input, so
/// `w1[i * hidden + j]` connects input `i` to hidden unit `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct MlpModel {
    input: usize,
    hidden: usize,
    output: usize,
    w1: Vec<f32>,
    b1: Vec<f32>,
    w2: Vec<f32>,
    b2: Vec<f32>,
}

fn check_len(tensor: &'static str, expected: usize, got: usize) -> Result<(), ModelError> {
    if expected == got {
        Ok(())
    } else {
        Err(ModelError::Shape {
            tensor,
            expected,
            got,
        })
    }
}

fn flatten(
    tensor: &'static str,
    rows: Vec<Vec<f32>>,
    n_rows: usize,
    n_cols: usize,
) -> Result<Vec<f32>, ModelError> {
    check_len(tensor, n_rows, rows.len())?;
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for row in rows {
        check_len(tensor, n_cols, row.len())?;
        flat.extend(row);
    }
    Ok(flat)
}

impl MlpModel {
    /// Build from flat row-major weights, checking every tensor's size.
    pub fn new(
        (input, hidden, output): (usize, usize, usize),
        w1: Vec<f32>,
        b1: Vec<f32>,
        w2: Vec<f32>,
        b2: Vec<f32>,
    ) -> Result<Self, ModelError> {
        check_len("w1", input * hidden, w1.len())?;
        check_len("b1", hidden, b1.len())?;
        check_len("w2", hidden * output, w2.len())?;
        check_len("b2", output, b2.len())?;
        Ok(Self {
            input,
            hidden,
            output,
            w1,
            b1,
            w2,
            b2,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let file: MlpFile = serde_json::from_str(text).map_err(|e| ModelError::Parse {
            message: e.to_string(),
        })?;
        let w1 = flatten("w1", file.w1, file.input_size, file.hidden_size)?;
        let w2 = flatten("w2", file.w2, file.hidden_size, file.output_size)?;
        Self::new(
            (file.input_size, file.hidden_size, file.output_size),
            w1,
            file.b1,
            w2,
            file.b2,
        )
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    pub fn hidden_len(&self) -> usize {
        self.hidden
    }

    /// Untrained weights drawn uniformly from `±scale`, zero biases.
    pub fn random(
        (input, hidden, output): (usize, usize, usize),
        scale: f32,
        rng: &mut impl Rng,
    ) -> Self {
        let mut draw = |n: usize| -> Vec<f32> {
            (0..n).map(|_| rng.gen_range(-scale..=scale)).collect()
        };
        let w1 = draw(input * hidden);
        let w2 = draw(hidden * output);
        Self {
            input,
            hidden,
            output,
            w1,
            b1: vec![0.0; hidden],
            w2,
            b2: vec![0.0; output],
        }
    }

    /// Serialize in the same JSON layout [`MlpModel::from_json`] reads.
    pub fn to_json(&self) -> Result<String, ModelError> {
        let file = MlpFile {
            input_size: self.input,
            hidden_size: self.hidden,
            output_size: self.output,
            w1: self.w1.chunks(self.hidden.max(1)).map(<[f32]>::to_vec).collect(),
            b1: self.b1.clone(),
            w2: self.w2.chunks(self.output.max(1)).map(<[f32]>::to_vec).collect(),
            b2: self.b2.clone(),
        };
        serde_json::to_string(&file).map_err(|e| ModelError::Parse {
            message: e.to_string(),
        })
    }
}

impl ScoringModel for MlpModel {
    fn input_len(&self) -> usize {
        self.input
    }

    fn output_len(&self) -> usize {
        self.output
    }

    fn score(&self, input: &[f32]) -> Result<Vec<f32>, ModelError> {
        check_input(self.input, input.len())?;

        let mut hidden = self.b1.clone();
        for (i, &x) in input.iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            let row = &self.w1[i * self.hidden..(i + 1) * self.hidden];
            for (h, &w) in hidden.iter_mut().zip(row) {
                *h += x * w;
            }
        }
        hidden.iter_mut().for_each(|h| *h = h.max(0.0));

        let mut out = self.b2.clone();
        for (j, &h) in hidden.iter().enumerate() {
            if h == 0.0 {
                continue;
            }
            let row = &self.w2[j * self.output..(j + 1) * self.output];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += h * w;
            }
        }

        if out.iter().all(|o| o.is_finite()) {
            Ok(out)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}

fn check_input(expected: usize, got: usize) -> Result<(), ModelError> {
    if expected == got {
        Ok(())
    } else {
        Err(ModelError::InputLength { expected, got })
    }
}

// ── Memoized load ─────────────────────────────────────────────────────────────

pub type LoadResult = Result<Arc<dyn ScoringModel>, ModelError>;

/// Observable state of a [`ModelHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Not finished yet (or not yet polled).
    Pending,
    Ready,
    /// The load failed; the heuristic is used for the rest of the session.
    Unavailable,
}

/// A cloneable handle to the one-shot model load.
#[derive(Clone)]
pub struct ModelHandle {
    load: Shared<BoxFuture<'static, LoadResult>>,
}

impl ModelHandle {
    /// Wrap an arbitrary load future.  The outcome is logged once, when the
    /// load completes.
    pub fn new<F>(load: F) -> Self
    where
        F: Future<Output = LoadResult> + Send + 'static,
    {
        let load = async move {
            let result = load.await;
            match &result {
                Ok(model) => info!(
                    "Scoring model ready ({} inputs, {} outputs)",
                    model.input_len(),
                    model.output_len()
                ),
                Err(e) => warn!("Scoring model unavailable, falling back to heuristic targeting: {e}"),
            }
            result
        };
        Self {
            load: load.boxed().shared(),
        }
    }

    /// Load an [`MlpModel`] from a JSON weights file.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(async move {
            let model = MlpModel::load(&path)?;
            Ok(Arc::new(model) as Arc<dyn ScoringModel>)
        })
    }

    /// A handle that is already resolved to `model`.
    pub fn ready(model: Arc<dyn ScoringModel>) -> Self {
        Self {
            load: futures::future::ready(Ok(model)).boxed().shared(),
        }
    }

    /// A handle that is already failed.
    pub fn failed(error: ModelError) -> Self {
        Self {
            load: futures::future::ready(Err(error)).boxed().shared(),
        }
    }

    /// Current state, without driving the load.
    pub fn state(&self) -> ModelState {
        match self.load.peek() {
            None => ModelState::Pending,
            Some(Ok(_)) => ModelState::Ready,
            Some(Err(_)) => ModelState::Unavailable,
        }
    }

    /// Wait for the load, starting it if nobody has yet.  `None` when it
    /// failed.
    pub async fn resolve(&self) -> Option<Arc<dyn ScoringModel>> {
        self.load.clone().await.ok()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 2 → 2 → 2 with identity-ish weights.
    fn tiny() -> MlpModel {
        MlpModel::new(
            (2, 2, 2),
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.0, -1.0],
            vec![1.0, 0.0, 0.0, 2.0],
            vec![0.5, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn forward_pass_applies_relu() {
        let out = tiny().score(&[3.0, 0.5]).unwrap();
        // hidden = relu([3, -0.5]) = [3, 0]; out = [3 + 0.5, 0]
        assert_eq!(out, vec![3.5, 0.0]);
    }

    #[test]
    fn wrong_input_width_is_rejected() {
        assert_eq!(
            tiny().score(&[1.0]),
            Err(ModelError::InputLength {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn json_shape_mismatch_is_rejected() {
        let json = r#"{"input_size":2,"hidden_size":2,"output_size":1,
            "w1":[[1,0],[0,1]],"b1":[0,0],"w2":[[1],[1],[1]],"b2":[0]}"#;
        assert!(matches!(
            MlpModel::from_json(json),
            Err(ModelError::Shape { tensor: "w2", .. })
        ));
    }

    #[test]
    fn json_round_trip_scores() {
        let json = r#"{"input_size":2,"hidden_size":2,"output_size":2,
            "w1":[[1,0],[0,1]],"b1":[0,-1],"w2":[[1,0],[0,2]],"b2":[0.5,0]}"#;
        let model = MlpModel::from_json(json).unwrap();
        assert_eq!(model, tiny());
    }

    #[test]
    fn random_model_survives_json() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let model = MlpModel::random((6, 4, 3), 0.17, &mut rng);
        let json = model.to_json().unwrap();
        assert_eq!(MlpModel::from_json(&json).unwrap(), model);
        assert_eq!(model.hidden_len(), 4);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MlpModel::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn load_runs_once_for_every_clone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ModelHandle::new(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(tiny()) as Arc<dyn ScoringModel>)
        });
        assert_eq!(handle.state(), ModelState::Pending);

        let other = handle.clone();
        let (a, b) = block_on(futures::future::join(handle.resolve(), other.resolve()));
        assert!(a.is_some() && b.is_some());
        assert!(block_on(handle.resolve()).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(other.state(), ModelState::Ready);
    }

    #[test]
    fn failure_is_permanent() {
        let handle = ModelHandle::from_path("does/not/exist.json");
        assert!(block_on(handle.resolve()).is_none());
        assert_eq!(handle.state(), ModelState::Unavailable);
        assert!(block_on(handle.resolve()).is_none());
    }

    #[test]
    fn waiters_block_until_the_load_resolves() {
        let (tx, rx) = futures::channel::oneshot::channel::<()>();
        let handle = ModelHandle::new(async move {
            let _ = rx.await;
            Ok(Arc::new(tiny()) as Arc<dyn ScoringModel>)
        });
        let waiter = handle.clone();
        let joined = futures::future::join(waiter.resolve(), async move {
            let _ = tx.send(());
        });
        let (model, ()) = block_on(joined);
        assert!(model.is_some());
        assert_eq!(handle.state(), ModelState::Ready);
    }
}
