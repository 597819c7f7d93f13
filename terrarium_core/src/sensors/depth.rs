// terrarium_core/src/sensors/depth.rs

//! Visual depth sensor fed by a polar occupancy raster.
//!
//! Unlike the ray-casting sensors, depth does not query the scene itself:
//! the engine prepares a [`PolarView`] (angles x radial bins, occupancy per
//! cell) matching the sensor's [`PolarSpec`], and the sensor scans each
//! angular column outward for the first occupied bin.

use image::RgbImage;

use crate::config::DepthConfig;
use crate::draw;
use crate::error::{ConfigError, SensorError};
use crate::sensors::{Modality, Observation, ObservationShape, Sensor, SensorInput};

// =========================================================================
// == Polar Raster ==
// =========================================================================

/// Geometry of the polar raster a visual sensor needs: the engine samples
/// `n_angles` columns across `fov`, each with `n_bins` radial cells out to
/// `range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarSpec {
    pub fov: f64,
    pub range: f64,
    pub n_angles: usize,
    pub n_bins: usize,
}

/// Occupancy raster in polar coordinates, column-major by angle. Cell
/// `(angle, bin)` holds a nonzero value when something occupies that patch
/// of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarView {
    n_angles: usize,
    n_bins: usize,
    data: Vec<f64>,
}

impl PolarView {
    pub fn zeros(n_angles: usize, n_bins: usize) -> Self {
        Self {
            n_angles,
            n_bins,
            data: vec![0.0; n_angles * n_bins],
        }
    }

    pub fn n_angles(&self) -> usize {
        self.n_angles
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn get(&self, angle: usize, bin: usize) -> f64 {
        self.data[angle * self.n_bins + bin]
    }

    pub fn set(&mut self, angle: usize, bin: usize, value: f64) {
        self.data[angle * self.n_bins + bin] = value;
    }

    /// True when no cell is occupied anywhere in the raster.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }
}

// =========================================================================
// == Depth ==
// =========================================================================

/// Per-angle distance to the nearest occupied cell, resampled to the
/// configured resolution.
#[derive(Debug, Clone)]
pub struct Depth {
    name: String,
    config: DepthConfig,
    observation: Observation,
}

impl Depth {
    pub fn new(name: impl Into<String>, config: DepthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            observation: Observation::Ranges(vec![0.0; config.resolution]),
            config,
        })
    }

    /// Proximity value for one angular column: bins scan outward from the
    /// sensor, and a hit at bin `s` of `n_bins` yields `(n_bins - s)` bin
    /// widths of closeness. A column with no hit bottoms out at one bin
    /// width rather than zero.
    fn column_value(view: &PolarView, angle: usize) -> f64 {
        let n_bins = view.n_bins();
        let s = (0..n_bins)
            .find(|&bin| view.get(angle, bin) != 0.0)
            .unwrap_or(n_bins - 1);
        (n_bins - s) as f64
    }
}

impl Sensor for Depth {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        Modality::Visual
    }

    fn shape(&self) -> Option<ObservationShape> {
        Some(ObservationShape::Flat(self.config.resolution))
    }

    fn update(&mut self, input: SensorInput<'_>) -> Result<(), SensorError> {
        let view = input.polar(&self.name)?;

        let mut values = vec![0.0; self.config.resolution];
        if !view.is_blank() && view.n_angles() > 0 && view.n_bins() > 0 {
            let bin_width = self.config.range / view.n_bins() as f64;
            for (i, value) in values.iter_mut().enumerate() {
                // Nearest-neighbor resample from raster columns.
                let col = (i * view.n_angles()) / self.config.resolution;
                *value = Self::column_value(view, col) * bin_width;
            }
        }

        if self.config.normalize {
            for v in &mut values {
                *v /= self.config.range;
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
        let max = if self.config.normalize {
            1.0
        } else {
            self.config.range
        };
        draw::value_strip(values, max, width, height)
    }

    fn polar_spec(&self) -> Option<PolarSpec> {
        Some(PolarSpec {
            fov: self.config.fov(),
            range: self.config.range,
            n_angles: self.config.resolution,
            n_bins: self.config.range.ceil().max(1.0) as usize,
        })
    }
}

// =========================================================================
// == Tests ==
// =========================================================================
