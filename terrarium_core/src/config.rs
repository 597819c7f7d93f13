// terrarium_core/src/config.rs

//! Immutable sensor configuration structs.
//!
//! Each sensor type takes an explicit config, validated once at
//! construction. There is no shared mutable default dictionary: serde
//! defaults play that role, and everything after `new()` is frozen.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::noise::NoiseConfig;

fn default_true() -> bool {
    true
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

// =========================================================================
// == Ray Sensors ==
// =========================================================================

/// Configuration shared by every ray-casting sensor (lidar, touch, cameras,
/// semantic rays).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayConfig {
    /// Field of view in degrees.
    pub fov_deg: f64,
    /// Number of rays, and the length of the observation vector.
    pub resolution: usize,
    /// Maximum sensing range in world units.
    pub range: f64,
    /// Keep only the nearest hit per ray.
    pub remove_occluded: bool,
    /// Allow one entity to appear in several angular buckets. Setting this
    /// to `false` also forces occlusion removal: duplicates can only be
    /// resolved on occlusion-filtered buckets.
    pub allow_duplicates: bool,
    /// Scale outputs to [0, 1] as a final pass.
    pub normalize: bool,
    pub noise: Option<NoiseConfig>,
    /// Seed for the noise RNG.
    pub seed: u64,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            fov_deg: 180.0,
            resolution: 64,
            range: 300.0,
            remove_occluded: false,
            allow_duplicates: true,
            normalize: true,
            noise: None,
            seed: 0,
        }
    }
}

impl RayConfig {
    /// Defaults used by the semantic ray sensor: full surround view with
    /// occlusion and duplicate resolution enabled.
    pub fn semantic() -> Self {
        Self {
            fov_deg: 360.0,
            resolution: 36,
            range: 200.0,
            remove_occluded: true,
            allow_duplicates: false,
            ..Self::default()
        }
    }

    pub fn fov(&self) -> f64 {
        self.fov_deg.to_radians()
    }

    /// Occlusion removal as actually applied, accounting for the coupling
    /// with duplicate resolution.
    pub fn remove_occluded_effective(&self) -> bool {
        self.remove_occluded || !self.allow_duplicates
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fov_deg", self.fov_deg)?;
        positive("range", self.range)?;
        if self.resolution == 0 {
            return Err(ConfigError::ZeroCount {
                field: "resolution",
            });
        }
        Ok(())
    }
}

// =========================================================================
// == Cone Sensors ==
// =========================================================================

/// Configuration for the lidar-cone sensor: a fine internal ray stage
/// aggregated into `number_cones` coarse angular buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConeConfig {
    pub fov_deg: f64,
    pub number_cones: usize,
    /// Minimum size (world units) of an object the fine ray stage must not
    /// miss at full range. Determines the internal ray count.
    pub min_object_size: f64,
    pub range: f64,
    pub remove_occluded: bool,
    pub allow_duplicates: bool,
    pub normalize: bool,
}

impl Default for ConeConfig {
    fn default() -> Self {
        Self {
            fov_deg: 360.0,
            number_cones: 12,
            min_object_size: 5.0,
            range: 200.0,
            remove_occluded: true,
            allow_duplicates: false,
            normalize: true,
        }
    }
}

impl ConeConfig {
    pub fn fov(&self) -> f64 {
        self.fov_deg.to_radians()
    }

    /// Fine ray count: one ray per `min_object_size` of arc at full range,
    /// plus one so the pattern covers both FOV edges.
    pub fn number_rays(&self) -> usize {
        (self.range * self.fov() / self.min_object_size) as usize + 1
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fov_deg", self.fov_deg)?;
        positive("range", self.range)?;
        positive("min_object_size", self.min_object_size)?;
        if self.number_cones == 0 {
            return Err(ConfigError::ZeroCount {
                field: "number_cones",
            });
        }
        Ok(())
    }
}

// =========================================================================
// == Depth Sensor ==
// =========================================================================

/// Configuration for the polar-raster depth sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub fov_deg: f64,
    /// Length of the output depth profile.
    pub resolution: usize,
    pub range: f64,
    pub normalize: bool,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            fov_deg: 180.0,
            resolution: 64,
            range: 200.0,
            normalize: true,
        }
    }
}

impl DepthConfig {
    pub fn fov(&self) -> f64 {
        self.fov_deg.to_radians()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fov_deg", self.fov_deg)?;
        positive("range", self.range)?;
        if self.resolution == 0 {
            return Err(ConfigError::ZeroCount {
                field: "resolution",
            });
        }
        Ok(())
    }
}

// =========================================================================
// == Tests ==
// =========================================================================
