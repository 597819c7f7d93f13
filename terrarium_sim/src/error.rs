// terrarium_sim/src/error.rs

use std::path::PathBuf;

use terrarium_core::error::{ConfigError, SensorError};
use thiserror::Error;

/// Errors surfaced while assembling or stepping a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to load scenario '{path}': {source}")]
    Scenario {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sensor(#[from] SensorError),
}
