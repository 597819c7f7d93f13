// terrarium_core/src/sensors/camera.rs

//! Pseudo-cameras: a 1D strip of surface colors sampled at ray collision
//! points, in full color or folded to grey.

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

/// Grey channel weights, applied to the stored (B, G, R) channel order.
/// These are NOT conventional luma weights: relative to perceptual luma the
/// G and R coefficients are swapped. Downstream consumers were trained
/// against the exact values, so they must not be corrected.
const GREY_WEIGHTS: [f64; 3] = [0.114, 0.299, 0.587];

/// Samples one color per ray: nearest candidate hit, world collision point
/// transformed into the entity's local frame, then into its surface-texture
/// pixel coordinates. Empty rays and untextured targets yield black.
///
/// The returned row is reversed end-to-end and channels are stored (B, G, R);
/// downstream consumers rely on that layout.
fn color_row(pipeline: &RayPipeline, scene: &dyn SceneView) -> Result<Vec<[f64; 3]>, SensorError> {
    let buckets = pipeline.cast(scene)?;

    let mut pixels = vec![[0.0; 3]; buckets.len()];

    for (i, bucket) in buckets.iter().enumerate() {
        let Some(hit) = nearest_by_alpha(&bucket.hits) else {
            continue;
        };
        let Some(target) = scene.target_of(hit.shape) else {
            continue;
        };
        let (Some(pose), Some((tex_w, tex_h))) =
            (scene.target_pose(target), scene.texture_size(target))
        else {
            continue;
        };

        // World collision point into the entity's local frame.
        let rel = hit.point - pose.position;
        let (sin, cos) = pose.heading.sin_cos();
        let local_x = rel.x * cos + rel.y * sin;
        let local_y = -rel.x * sin + rel.y * cos;

        // Local frame into texture pixels, origin at the texture center.
        // Out-of-texture coordinates clamp to the border.
        let px = (local_x + (tex_w as f64 - 1.0) / 2.0)
            .round()
            .clamp(0.0, tex_w as f64 - 1.0) as u32;
        let py = (local_y + (tex_h as f64 - 1.0) / 2.0)
            .round()
            .clamp(0.0, tex_h as f64 - 1.0) as u32;

        if let Some([r, g, b]) = scene.texture_pixel(target, px, py) {
            pixels[i] = [b as f64, g as f64, r as f64];
        }
    }

    pixels.reverse();
    Ok(pixels)
}

// =========================================================================
// == RgbCamera ==
// =========================================================================

/// A 1D line of color pixels from the anchor's point of view.
#[derive(Debug, Clone)]
pub struct RgbCamera {
    name: String,
    config: RayConfig,
    pipeline: RayPipeline,
    noise: Option<NoiseModel>,
    observation: Observation,
}

impl RgbCamera {
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
}

impl Sensor for RgbCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        Modality::Robotic
    }

    fn shape(&self) -> Option<ObservationShape> {
        Some(ObservationShape::Rgb(self.config.resolution))
    }

    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError> {
        let scene = input.scene(&self.name)?;
        let mut pixels = color_row(&self.pipeline, scene)?;

        if let Some(noise) = &mut self.noise {
            noise.apply_rgb(&mut pixels, 255.0);
        }
        if self.config.normalize {
            for pixel in &mut pixels {
                for channel in pixel {
                    *channel /= 255.0;
                }
            }
        }

        self.observation = Observation::Colors(pixels);
        Ok(())
    }

    fn observation(&self) -> &Observation {
        &self.observation
    }

    fn draw(&self, width: u32, height: u32) -> RgbImage {
        let pixels = self.observation.as_colors().unwrap_or(&[]);
        let divisor = if self.config.normalize { 1.0 } else { 255.0 };
        draw::color_strip(pixels, divisor, width, height)
    }
}

// =========================================================================
// == GreyCamera ==
// =========================================================================

/// The RGB strip folded to a single grey level per ray.
#[derive(Debug, Clone)]
pub struct GreyCamera {
    name: String,
    config: RayConfig,
    pipeline: RayPipeline,
    noise: Option<NoiseModel>,
    observation: Observation,
}

impl GreyCamera {
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
}

impl Sensor for GreyCamera {
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
        let pixels = color_row(&self.pipeline, scene)?;

        let mut values: Vec<f64> = pixels
            .iter()
            .map(|pixel| {
                pixel
                    .iter()
                    .zip(GREY_WEIGHTS)
                    .map(|(channel, weight)| channel * weight)
                    .sum()
            })
            .collect();

        if let Some(noise) = &mut self.noise {
            noise.apply(&mut values, 255.0);
        }
        if self.config.normalize {
            for value in &mut values {
                *value /= 255.0;
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
        let divisor = if self.config.normalize { 1.0 } else { 255.0 };
        draw::value_strip(values, divisor, width, height)
    }
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SegmentHit;
    use crate::types::{CategoryFilter, DetectionTarget, EntityId, Pose2};
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    /// One circular entity dead ahead, uniformly painted.
    struct PaintedScene {
        color: [u8; 3],
        entity_pos: Point2<f64>,
        entity_heading: f64,
    }

    impl PaintedScene {
        fn red_circle() -> Self {
            Self {
                color: [200, 90, 30],
                entity_pos: Point2::new(50.0, 0.0),
                entity_heading: 0.0,
            }
        }
    }

    impl SceneView for PaintedScene {
        fn segment_query(
            &self,
            origin: Point2<f64>,
            end: Point2<f64>,
            _filter: CategoryFilter,
        ) -> Vec<SegmentHit> {
            // Only the forward ray hits; the entity surface is at x = 40.
            let dir = end - origin;
            if dir.x <= 0.0 || dir.y.abs() > 1e-9 {
                return Vec::new();
            }
            let alpha = 40.0 / dir.x;
            if alpha > 1.0 {
                return Vec::new();
            }
            vec![SegmentHit {
                shape: ShapeId(5),
                alpha,
                point: Point2::new(40.0, 0.0),
            }]
        }

        fn target_of(&self, _s: ShapeId) -> Option<DetectionTarget> {
            Some(DetectionTarget::Entity(EntityId(5)))
        }

        fn body_pose(&self, _b: BodyId) -> Option<Pose2> {
            Some(Pose2::new(0.0, 0.0, 0.0))
        }

        fn target_pose(&self, _t: DetectionTarget) -> Option<Pose2> {
            Some(Pose2 {
                position: self.entity_pos,
                heading: self.entity_heading,
            })
        }

        fn texture_size(&self, _t: DetectionTarget) -> Option<(u32, u32)> {
            Some((21, 21))
        }

        fn texture_pixel(&self, _t: DetectionTarget, x: u32, y: u32) -> Option<[u8; 3]> {
            if x < 21 && y < 21 {
                Some(self.color)
            } else {
                None
            }
        }
    }

    fn camera_config() -> RayConfig {
        RayConfig {
            fov_deg: 90.0,
            resolution: 3,
            range: 100.0,
            normalize: false,
            ..RayConfig::default()
        }
    }

    #[test]
    fn rgb_stores_channels_reversed() {
        let scene = PaintedScene::red_circle();
        let mut camera = RgbCamera::new("rgb", BodyId(0), vec![], camera_config()).unwrap();
        camera.update(SensorInput::Scene(&scene)).unwrap();

        let pixels = camera.observation().as_colors().unwrap();
        assert_eq!(pixels.len(), 3);
        // Ray order is reversed, but the center stays the center.
        assert_eq!(pixels[1], [30.0, 90.0, 200.0]);
        assert_eq!(pixels[0], [0.0, 0.0, 0.0]);
        assert_eq!(pixels[2], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn rgb_normalizes_to_unit_channels() {
        let scene = PaintedScene::red_circle();
        let config = RayConfig {
            normalize: true,
            ..camera_config()
        };
        let mut camera = RgbCamera::new("rgb", BodyId(0), vec![], config).unwrap();
        camera.update(SensorInput::Scene(&scene)).unwrap();

        let pixels = camera.observation().as_colors().unwrap();
        assert_relative_eq!(pixels[1][2], 200.0 / 255.0);
    }

    #[test]
    fn grey_uses_the_exact_legacy_weights() {
        let scene = PaintedScene::red_circle();
        let mut camera = GreyCamera::new("grey", BodyId(0), vec![], camera_config()).unwrap();
        camera.update(SensorInput::Scene(&scene)).unwrap();

        let values = camera.observation().as_ranges().unwrap();
        // Stored (B, G, R) = (30, 90, 200).
        let expected = 0.114 * 30.0 + 0.299 * 90.0 + 0.587 * 200.0;
        assert_relative_eq!(values[1], expected, epsilon = 1e-9);
        assert_relative_eq!(values[0], 0.0);
    }

    #[test]
    fn empty_rays_yield_zero_color() {
        struct EmptyScene;
        impl SceneView for EmptyScene {
            fn segment_query(
                &self,
                _o: Point2<f64>,
                _e: Point2<f64>,
                _f: CategoryFilter,
            ) -> Vec<SegmentHit> {
                Vec::new()
            }
            fn target_of(&self, _s: ShapeId) -> Option<DetectionTarget> {
                None
            }
            fn body_pose(&self, _b: BodyId) -> Option<Pose2> {
                Some(Pose2::new(0.0, 0.0, 0.0))
            }
            fn target_pose(&self, _t: DetectionTarget) -> Option<Pose2> {
                None
            }
            fn texture_size(&self, _t: DetectionTarget) -> Option<(u32, u32)> {
                None
            }
            fn texture_pixel(&self, _t: DetectionTarget, _x: u32, _y: u32) -> Option<[u8; 3]> {
                None
            }
        }

        let mut camera = RgbCamera::new("rgb", BodyId(0), vec![], camera_config()).unwrap();
        camera.update(SensorInput::Scene(&EmptyScene)).unwrap();
        let pixels = camera.observation().as_colors().unwrap();
        assert!(pixels.iter().all(|p| *p == [0.0, 0.0, 0.0]));
    }
}
