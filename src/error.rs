//! Simulation-specific error types.
//!
//! Runtime failures (a bad config file, a missing scoring model) are caught at
//! their boundary, logged, and replaced by a working default.  Nothing here is
//! ever surfaced to the player.  Out-of-range particle indices are programming
//! errors and panic instead of producing one of these values.
//!
//! ## Usage
//!
//! ```rust
//! use leaf_drift::error::{validate_positive, SimResult};
//!
//! fn check(radius: f32) -> SimResult<()> {
//!     validate_positive("vent.radius", radius)?;
//!     Ok(())
//! }
//! # assert!(check(1.0).is_ok());
//! ```

use thiserror::Error;

/// Top-level error enum for configuration and stage setup.
#[derive(Debug, Error)]
pub enum SimError {
    /// The config file exists but could not be read.
    #[error("failed to read '{path}': {message}")]
    ConfigRead {
        /// File that was being read.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },

    /// The config file is not valid TOML for [`crate::config::LeafConfig`].
    #[error("failed to parse '{path}': {message}")]
    ConfigParse {
        /// File that was being parsed.
        path: String,
        /// Parser error text.
        message: String,
    },

    /// A tuning value is outside its safe operating range.
    #[error("constant '{name}' = {value} is outside safe range {safe_range}")]
    UnsafeConstant {
        /// Dotted config key (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },

    /// A tool upgrade tier outside `1..=max`.
    #[error("upgrade level {got} is outside 1..={max}")]
    UpgradeLevel {
        /// Requested tier.
        got: u8,
        /// Highest valid tier.
        max: u8,
    },

    /// A stage region with zero or negative extent.
    #[error("stage '{name}' has an empty region")]
    EmptyRegion {
        /// Stage display name.
        name: String,
    },
}

/// Failures while loading or running the scoring model.
///
/// `Clone` because the memoized load hands the same outcome to every waiter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// The weights file could not be read.
    #[error("failed to read model '{path}': {message}")]
    Io {
        /// Model path.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },

    /// The weights file is not valid JSON for an MLP.
    #[error("failed to parse model: {message}")]
    Parse {
        /// Parser error text.
        message: String,
    },

    /// A weight tensor does not match the declared layer sizes.
    #[error("model tensor '{tensor}' has {got} values, expected {expected}")]
    Shape {
        /// Tensor name (`w1`, `b1`, …).
        tensor: &'static str,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        got: usize,
    },

    /// Inference was called with an input of the wrong width.
    #[error("model input has {got} values, expected {expected}")]
    InputLength {
        /// Width the model was trained on.
        expected: usize,
        /// Width supplied by the caller.
        got: usize,
    },

    /// Inference produced NaN or infinite scores.
    #[error("model produced non-finite scores")]
    NonFinite,
}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` is finite and strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Returns an error unless `value` is finite and `>= 0`.
pub fn validate_non_negative(name: &'static str, value: f32) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, ∞)",
        })
    }
}

/// Returns an error unless `value` lies in `[0, 1]`.
///
/// Per-frame multipliers (friction, drag) outside this range either flip the
/// velocity sign or amplify it every frame.
pub fn validate_unit_interval(name: &'static str, value: f32) -> SimResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::UnsafeConstant {
            name,
            value,
            safe_range: "[0.0, 1.0]",
        })
    }
}

/// Returns an error unless `value` is an angle in `(0, 180]` degrees.
pub fn validate_half_angle_deg(name: &'static str, value: f32) -> SimResult<()> {
    if value > 0.0 && value <= 180.0 {
        Ok(())
    } else {
        Err(SimError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, 180.0]",
        })
    }
}
