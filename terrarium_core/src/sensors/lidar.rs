// terrarium_core/src/sensors/lidar.rs

//! Distance sensors: lidar and its close-proximity variant, touch.

use image::RgbImage;

use crate::config::RayConfig;
use crate::draw;
use crate::error::{ConfigError, SensorError};
use crate::geometry::ray_angles;
use crate::noise::NoiseModel;
use crate::raycast::{nearest_by_alpha, RayPipeline};
use crate::scene::SceneView;
use crate::sensors::{Modality, Observation, ObservationShape, Sensor, SensorInput};
use crate::types::{BodyId, ShapeId};

/// Projects ray buckets into one distance per ray: the nearest candidate's
/// path fraction scaled by `range`, or `range` itself for empty rays.
/// Output index order is reversed to match the forward-facing display
/// convention.
fn distance_profile(
    pipeline: &RayPipeline,
    scene: &dyn SceneView,
) -> Result<Vec<f64>, SensorError> {
    let buckets = pipeline.cast(scene)?;
    let range = pipeline.range();

    let mut values: Vec<f64> = buckets
        .iter()
        .map(|bucket| match nearest_by_alpha(&bucket.hits) {
            Some(hit) => hit.alpha * range,
            None => range,
        })
        .collect();

    values.reverse();
    Ok(values)
}

// =========================================================================
// == Lidar ==
// =========================================================================

/// Measures the distance to the nearest obstacle along each ray.
#[derive(Debug, Clone)]
pub struct Lidar {
    name: String,
    config: RayConfig,
    pipeline: RayPipeline,
    noise: Option<NoiseModel>,
    observation: Observation,
}

impl Lidar {
    pub fn new(
        name: impl Into<String>,
        anchor: BodyId,
        invisible: Vec<ShapeId>,
        config: RayConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let noise = config
            .noise
            .map(|n| NoiseModel::new(n, config.seed))
            .transpose()?;

        let pipeline = RayPipeline::new(
            anchor,
            ray_angles(config.fov(), config.resolution),
            config.range,
            config.remove_occluded_effective(),
            invisible,
        );

        Ok(Self {
            name: name.into(),
            config,
            pipeline,
            noise,
            observation: Observation::default(),
        })
    }

    fn max_value(&self) -> f64 {
        self.config.range
    }
}

impl Sensor for Lidar {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        Modality::Robotic
    }

    fn shape(&self) -> Option<ObservationShape> {
        Some(ObservationShape::Flat(self.config.resolution))
    }

    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError> {
        let scene = input.scene(&self.name)?;
        let mut values = distance_profile(&self.pipeline, scene)?;

        let max = self.max_value();
        if let Some(noise) = &mut self.noise {
            noise.apply(&mut values, max);
        }
        if self.config.normalize {
            for value in &mut values {
                *value /= max;
            }
        }

        self.observation = Observation::Ranges(values);
        Ok(())
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn draw(&self, width: u32, height: u32) -> RgbImage {
        let values = self.observation.as_ranges().unwrap_or(&[]);
        let divisor = if self.config.normalize {
            1.0
        } else {
            self.max_value()
        };
        draw::value_strip(values, divisor, width, height)
    }
}

// =========================================================================
// == Touch ==
// =========================================================================

/// Artificial skin around a round anchor. `config.range` is the skin
/// thickness; readings grow as contact gets closer, peaking at full
/// contact with the anchor surface.
#[derive(Debug, Clone)]
pub struct Touch {
    name: String,
    config: RayConfig,
    anchor_radius: f64,
    pipeline: RayPipeline,
    noise: Option<NoiseModel>,
    observation: Observation,
}

impl Touch {
    pub fn new(
        name: impl Into<String>,
        anchor: BodyId,
        anchor_radius: f64,
        invisible: Vec<ShapeId>,
        config: RayConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if anchor_radius < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "anchor_radius",
                value: anchor_radius,
            });
        }

        let noise = config
            .noise
            .map(|n| NoiseModel::new(n, config.seed))
            .transpose()?;

        // Rays reach through the skin: anchor radius plus skin thickness.
        let pipeline = RayPipeline::new(
            anchor,
            ray_angles(config.fov(), config.resolution),
            anchor_radius + config.range,
            config.remove_occluded_effective(),
            invisible,
        );

        Ok(Self {
            name: name.into(),
            config,
            anchor_radius,
            pipeline,
            noise,
            observation: Observation::default(),
        })
    }

    /// The skin thickness, which is also the peak reading.
    fn max_value(&self) -> f64 {
        self.config.range
    }
}

impl Sensor for Touch {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        Modality::Robotic
    }

    fn shape(&self) -> Option<ObservationShape> {
        Some(ObservationShape::Flat(self.config.resolution))
    }

    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError> {
        let scene = input.scene(&self.name)?;
        let mut values = distance_profile(&self.pipeline, scene)?;

        let max = self.max_value();
        // Distance from the anchor surface, inverted: closer contact reads
        // higher, nothing within the skin reads zero.
        for value in &mut values {
            let to_surface = (*value - self.anchor_radius).max(0.0);
            *value = (max - to_surface).max(0.0);
        }

        if let Some(noise) = &mut self.noise {
            noise.apply(&mut values, max);
        }
        if self.config.normalize {
            for value in &mut values {
                *value /= max;
            }
        }

        self.observation = Observation::Ranges(values);
        Ok(())
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn draw(&self, width: u32, height: u32) -> RgbImage {
        let values = self.observation.as_ranges().unwrap_or(&[]);
        let divisor = if self.config.normalize {
            1.0
        } else {
            self.max_value()
        };
        draw::value_strip(values, divisor, width, height)
    }
}

// =========================================================================
// == Tests ==
// =========================================================================
