// terrarium_sim/src/prelude.rs

// Re-export the entire terrarium_core prelude so you can easily access
// pure types like `Sensor`, `RayPipeline`, `DetectionTarget`, etc.
pub use terrarium_core::prelude::*;

// Re-export common simulation-specific types for easy access.
pub use crate::config::{load_scenario, AgentConfig, ScenarioConfig, SensorSpec};
pub use crate::engine::{SimAgent, Simulation};
pub use crate::error::SimError;
pub use crate::polar::polar_view;
pub use crate::scene::PhysicsScene;
