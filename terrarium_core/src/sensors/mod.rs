// terrarium_core/src/sensors/mod.rs

//! The sensor contract and the concrete sensor suite.
//!
//! A sensor owns its configuration and its last observation. It is created
//! when an agent is assembled, updated once per simulation step against a
//! frozen scene, and destroyed with its agent. All sensors are updated
//! sequentially; none of them ever mutates scene state.

pub mod camera;
pub mod depth;
pub mod lidar;
pub mod semantic;

use std::fmt::Debug;

use dyn_clone::DynClone;
use image::RgbImage;

use crate::error::SensorError;
use crate::raycast::Detection;
use crate::scene::SceneView;

pub use depth::{PolarSpec, PolarView};

// =========================================================================
// == Observation Types ==
// =========================================================================

/// Sensor modality tag. An unrecognized pairing of modality and input is a
/// fatal configuration error, never silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Distance- and color-strip sensors computed from ray casts.
    Robotic,
    /// Sensors reporting detected entities with distances and angles.
    Semantic,
    /// Sensors computed from a rasterized view of the scene.
    Visual,
}

/// The output of one sensor update. Produced fresh every step; nothing is
/// retained across updates beyond this value.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// One scalar per ray (distances, grey levels, depth).
    Ranges(Vec<f64>),
    /// One color triple per ray. Channels are stored in (B, G, R) order;
    /// trained consumers depend on that layout staying fixed.
    Colors(Vec<[f64; 3]>),
    /// Resolved entity detections, one per surviving angular bucket.
    Detections(Vec<Detection>),
}

impl Default for Observation {
    fn default() -> Self {
        Observation::Ranges(Vec::new())
    }
}

impl Observation {
    pub fn as_ranges(&self) -> Option<&[f64]> {
        match self {
            Observation::Ranges(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_colors(&self) -> Option<&[[f64; 3]]> {
        match self {
            Observation::Colors(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_detections(&self) -> Option<&[Detection]> {
        match self {
            Observation::Detections(v) => Some(v),
            _ => None,
        }
    }
}

/// Declared output dimensionality. Semantic sensors have no fixed shape
/// (their detection count varies per step) and return `None` from
/// [`Sensor::shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationShape {
    /// `length` scalars.
    Flat(usize),
    /// `length` color triples, i.e. `(length, 3)`.
    Rgb(usize),
}

// =========================================================================
// == Sensor Input ==
// =========================================================================

/// What a sensor consumes during an update: the physics scene for
/// ray-casting sensors, a polar raster for visual depth sensors.
#[derive(Clone, Copy)]
pub enum SensorInput<'a> {
    Scene(&'a dyn SceneView),
    Polar(&'a PolarView),
}

impl<'a> SensorInput<'a> {
    /// Unwraps the scene input, failing fatally on a modality mismatch.
    pub fn scene(self, name: &str) -> Result<&'a dyn SceneView, SensorError> {
        match self {
            SensorInput::Scene(scene) => Ok(scene),
            SensorInput::Polar(_) => Err(SensorError::InputMismatch {
                name: name.to_owned(),
                expected: "scene",
            }),
        }
    }

    /// Unwraps the polar raster input, failing fatally otherwise.
    pub fn polar(self, name: &str) -> Result<&'a PolarView, SensorError> {
        match self {
            SensorInput::Polar(view) => Ok(view),
            SensorInput::Scene(_) => Err(SensorError::InputMismatch {
                name: name.to_owned(),
                expected: "polar raster",
            }),
        }
    }
}

// =========================================================================
// == The Sensor Trait ==
// =========================================================================

/// The contract every sensor implements.
///
/// Shared ray-cast machinery lives in [`crate::raycast`]; implementations
/// compose a pipeline with a projection function instead of overriding each
/// other down an inheritance chain.
pub trait Sensor: Debug + DynClone + Send + Sync {
    fn name(&self) -> &str;

    fn modality(&self) -> Modality;

    /// Declared output shape, `None` for semantic sensors whose detection
    /// count varies.
    fn shape(&self) -> Option<ObservationShape>;

    /// Recomputes the observation from the given input. Errors are fatal
    /// for the current step; there is no partial retry.
    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError>;

    /// The last computed observation.
    fn observation(&self) -> &Observation;

    /// Diagnostic visualization of the current observation. Never used for
    /// control.
    fn draw(&self, width: u32, height: u32) -> RgbImage;

    /// For visual sensors: the polar raster geometry this sensor needs the
    /// engine to prepare each step. `None` for scene-driven sensors.
    fn polar_spec(&self) -> Option<PolarSpec> {
        None
    }
}

dyn_clone::clone_trait_object!(Sensor);
