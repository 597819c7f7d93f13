// terrarium_core/src/sensors/semantic.rs

//! Semantic sensors report which entities were seen, not raw pixels: each
//! detection carries the target identity, its distance and its angular
//! bucket, so downstream consumers can query the entity's own attributes.

use image::RgbImage;

use crate::config::{ConeConfig, RayConfig};
use crate::draw;
use crate::error::{ConfigError, SensorError};
use crate::geometry::{cone_centers, nearest_angle_index, ray_angles};
use crate::raycast::{
    resolve_cone_occlusion, resolve_duplicates, Detection, DetectionBucket, RayPipeline,
};
use crate::sensors::{Modality, Observation, ObservationShape, Sensor, SensorInput};
use crate::types::{BodyId, ShapeId};

// =========================================================================
// == SemanticRay ==
// =========================================================================

/// One detection per surviving ray bucket.
#[derive(Debug, Clone)]
pub struct SemanticRay {
    name: String,
    config: RayConfig,
    pipeline: RayPipeline,
    observation: Observation,
}

impl SemanticRay {
    pub fn new(
        name: impl Into<String>,
        anchor: BodyId,
        invisible: Vec<ShapeId>,
        config: RayConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.noise.is_some() {
            return Err(ConfigError::NoiseUnsupported);
        }

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
            observation: Observation::Detections(Vec::new()),
        })
    }
}

impl Sensor for SemanticRay {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        Modality::Semantic
    }

    fn shape(&self) -> Option<ObservationShape> {
        // Detection counts vary per step; there is no fixed shape.
        None
    }

    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError> {
        let scene = input.scene(&self.name)?;

        let buckets = self.pipeline.cast(scene)?;
        let mut det_buckets = self.pipeline.detections(scene, &buckets);

        if !self.config.allow_duplicates {
            resolve_duplicates(&mut det_buckets);
        }

        let mut detections: Vec<Detection> = det_buckets
            .into_iter()
            .flat_map(|bucket| bucket.detections)
            .collect();

        if self.config.normalize {
            for det in &mut detections {
                det.distance /= self.config.range;
            }
        }

        self.observation = Observation::Detections(detections);
        Ok(())
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn draw(&self, size: u32, _height: u32) -> RgbImage {
        let detections = self.observation.as_detections().unwrap_or(&[]);
        let denormalize = if self.config.normalize {
            self.config.range
        } else {
            1.0
        };
        draw::detection_map(detections, self.config.range, denormalize, size)
    }
}

// =========================================================================
// == SemanticCones ==
// =========================================================================

/// Cone-aggregated semantic sensor: a fine internal ray stage is binned
/// into coarse angular cones, trading extra ray casts for smoother coverage
/// than casting one ray per cone directly.
#[derive(Debug, Clone)]
pub struct SemanticCones {
    name: String,
    config: ConeConfig,
    pipeline: RayPipeline,
    centers: Vec<f64>,
    observation: Observation,
}

impl SemanticCones {
    pub fn new(
        name: impl Into<String>,
        anchor: BodyId,
        invisible: Vec<ShapeId>,
        config: ConeConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let remove_occluded = config.remove_occluded || !config.allow_duplicates;
        let pipeline = RayPipeline::new(
            anchor,
            ray_angles(config.fov(), config.number_rays()),
            config.range,
            remove_occluded,
            invisible,
        );

        Ok(Self {
            name: name.into(),
            centers: cone_centers(config.fov(), config.number_cones),
            config,
            pipeline,
            observation: Observation::Detections(Vec::new()),
        })
    }

    pub fn number_rays(&self) -> usize {
        self.pipeline.angles().len()
    }
}

impl Sensor for SemanticCones {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        Modality::Semantic
    }

    fn shape(&self) -> Option<ObservationShape> {
        None
    }

    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError> {
        let scene = input.scene(&self.name)?;

        // Fine ray stage, with the sensor's own policies applied at ray
        // level first.
        let buckets = self.pipeline.cast(scene)?;
        let mut ray_buckets = self.pipeline.detections(scene, &buckets);
        if !self.config.allow_duplicates {
            resolve_duplicates(&mut ray_buckets);
        }

        // Bin every surviving detection into the angularly nearest cone.
        let mut cones: Vec<DetectionBucket> = self
            .centers
            .iter()
            .map(|&angle| DetectionBucket::empty(angle))
            .collect();
        for det in ray_buckets.into_iter().flat_map(|b| b.detections) {
            let idx = nearest_angle_index(&self.centers, det.angle);
            cones[idx].detections.push(det);
        }

        // Cone-level occlusion compares pooled world distances.
        if self.config.remove_occluded {
            for cone in &mut cones {
                resolve_cone_occlusion(&mut cone.detections);
            }
        }

        if !self.config.allow_duplicates {
            resolve_duplicates(&mut cones);
        }

        // Survivors take their cone center as the reported angle.
        let mut detections: Vec<Detection> = cones
            .iter()
            .flat_map(|cone| {
                cone.detections.iter().map(|det| Detection {
                    angle: cone.angle,
                    ..*det
                })
            })
            .collect();

        if self.config.normalize {
            for det in &mut detections {
                det.distance /= self.config.range;
            }
        }

        self.observation = Observation::Detections(detections);
        Ok(())
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn draw(&self, size: u32, _height: u32) -> RgbImage {
        let detections = self.observation.as_detections().unwrap_or(&[]);
        let denormalize = if self.config.normalize {
            self.config.range
        } else {
            1.0
        };
        draw::detection_map(detections, self.config.range, denormalize, size)
    }
}

// =========================================================================
// == Tests ==
// =========================================================================
