// terrarium_core/src/error.rs

use crate::types::BodyId;
use thiserror::Error;

/// Errors raised when a sensor configuration is rejected at construction.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("`{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("`{field}` must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("noise probability must lie in [0, 1], got {0}")]
    BadProbability(f64),

    #[error("gaussian noise scale must be positive, got {0}")]
    BadNoiseScale(f64),

    #[error("semantic sensors do not support noise")]
    NoiseUnsupported,
}

/// Errors raised while updating a sensor. These are fatal for the current
/// step: sensor computation is deterministic and never partially retried.
#[derive(Debug, Error, PartialEq)]
pub enum SensorError {
    /// The input kind does not match the sensor modality, e.g. a polar
    /// raster handed to a ray-casting sensor. A configuration error, not a
    /// runtime condition to recover from.
    #[error("sensor `{name}` expects a {expected} input")]
    InputMismatch { name: String, expected: &'static str },

    #[error("anchor body {0:?} is not present in the scene")]
    MissingAnchor(BodyId),
}
