// terrarium_core/src/noise.rs

//! Additive sensor noise, applied to raw values before normalization.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Declarative noise parameters, part of a sensor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoiseConfig {
    /// Additive gaussian noise per element.
    Gaussian { mean: f64, scale: f64 },
    /// With probability `probability`, an element is pushed to the sensor
    /// minimum or maximum (half chance each).
    SaltPepper { probability: f64 },
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig::Gaussian {
            mean: 0.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
enum NoiseKind {
    Gaussian(Normal<f64>),
    SaltPepper { probability: f64 },
}

/// A validated noise model with its own seeded RNG, so repeated runs with
/// the same seed reproduce the same readings.
#[derive(Debug, Clone)]
pub struct NoiseModel {
    kind: NoiseKind,
    rng: SmallRng,
}

impl NoiseModel {
    pub fn new(config: NoiseConfig, seed: u64) -> Result<Self, ConfigError> {
        let kind = match config {
            NoiseConfig::Gaussian { mean, scale } => {
                // Normal::new only rejects non-finite parameters, so the
                // sign check has to happen here. NaN falls through and is
                // caught by Normal::new below.
                if scale <= 0.0 {
                    return Err(ConfigError::BadNoiseScale(scale));
                }
                let normal =
                    Normal::new(mean, scale).map_err(|_| ConfigError::BadNoiseScale(scale))?;
                NoiseKind::Gaussian(normal)
            }
            NoiseConfig::SaltPepper { probability } => {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ConfigError::BadProbability(probability));
                }
                NoiseKind::SaltPepper { probability }
            }
        };

        Ok(Self {
            kind,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Perturbs `values` in place and clamps them to `[0, max_value]`.
    pub fn apply(&mut self, values: &mut [f64], max_value: f64) {
        match &self.kind {
            NoiseKind::Gaussian(normal) => {
                for value in values.iter_mut() {
                    *value += normal.sample(&mut self.rng);
                }
            }
            NoiseKind::SaltPepper { probability } => {
                for value in values.iter_mut() {
                    if self.rng.gen::<f64>() < *probability {
                        if self.rng.gen_bool(0.5) {
                            *value += max_value;
                        } else {
                            *value -= max_value;
                        }
                    }
                }
            }
        }

        for value in values.iter_mut() {
            *value = value.clamp(0.0, max_value);
        }
    }

    /// Channel-wise variant for color observations.
    pub fn apply_rgb(&mut self, pixels: &mut [[f64; 3]], max_value: f64) {
        for pixel in pixels.iter_mut() {
            self.apply(pixel, max_value);
        }
    }
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_scale_is_rejected() {
        let err = NoiseModel::new(
            NoiseConfig::Gaussian {
                mean: 0.0,
                scale: -1.0,
            },
            0,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::BadNoiseScale(-1.0));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let err = NoiseModel::new(
            NoiseConfig::Gaussian {
                mean: 0.0,
                scale: 0.0,
            },
            0,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::BadNoiseScale(0.0));
    }

    #[test]
    fn invalid_probability_is_rejected() {
        let err = NoiseModel::new(NoiseConfig::SaltPepper { probability: 1.5 }, 0).unwrap_err();
        assert_eq!(err, ConfigError::BadProbability(1.5));
    }

    #[test]
    fn noisy_values_stay_clamped() {
        let mut model = NoiseModel::new(
            NoiseConfig::Gaussian {
                mean: 0.0,
                scale: 50.0,
            },
            42,
        )
        .unwrap();

        let mut values = vec![5.0; 256];
        model.apply(&mut values, 10.0);
        assert!(values.iter().all(|v| (0.0..=10.0).contains(v)));
    }

    #[test]
    fn salt_pepper_saturates_affected_elements() {
        let mut model = NoiseModel::new(NoiseConfig::SaltPepper { probability: 1.0 }, 7).unwrap();

        let mut values = vec![5.0; 64];
        model.apply(&mut values, 10.0);
        // Every element was pushed to one of the two rails.
        assert!(values.iter().all(|v| *v == 0.0 || *v == 10.0));
        assert!(values.iter().any(|v| *v == 0.0));
        assert!(values.iter().any(|v| *v == 10.0));
    }

    #[test]
    fn same_seed_reproduces_readings() {
        let config = NoiseConfig::Gaussian {
            mean: 0.0,
            scale: 1.0,
        };
        let mut a = NoiseModel::new(config, 123).unwrap();
        let mut b = NoiseModel::new(config, 123).unwrap();

        let mut va = vec![2.0; 32];
        let mut vb = vec![2.0; 32];
        a.apply(&mut va, 10.0);
        b.apply(&mut vb, 10.0);
        assert_eq!(va, vb);
    }
}
