// terrarium_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::scene::{SceneView, SegmentHit};
pub use crate::sensors::{
    Modality, Observation, ObservationShape, PolarSpec, PolarView, Sensor, SensorInput,
};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::raycast::{Detection, DetectionBucket, RayBucket, RayPipeline};
pub use crate::types::{
    AgentId, BodyId, CategoryFilter, CollisionCategory, DetectionTarget, EntityId, Pose2, ShapeId,
};

// --- Configuration and Errors ---
pub use crate::config::{ConeConfig, DepthConfig, RayConfig};
pub use crate::error::{ConfigError, SensorError};
pub use crate::noise::{NoiseConfig, NoiseModel};

// --- Concrete Sensor Implementations (Export common ones for convenience) ---
pub use crate::sensors::camera::{GreyCamera, RgbCamera};
pub use crate::sensors::depth::Depth;
pub use crate::sensors::lidar::{Lidar, Touch};
pub use crate::sensors::semantic::{SemanticCones, SemanticRay};
