// terrarium_sim/src/config.rs

//! Scenario loading and the sensor factory.
//!
//! A scenario TOML file describes the world layout and each agent's sensor
//! rig. This maps directly to the sections of the file:
//!
//! ```toml
//! [simulation]
//! seed = 7
//! steps = 120
//!
//! [[walls]]
//! start = [-200.0, -200.0]
//! end = [200.0, -200.0]
//!
//! [[agents]]
//! name = "scout"
//! position = [0.0, 0.0]
//!
//! [[agents.sensors]]
//! type = "lidar"
//! name = "scan"
//! resolution = 64
//! ```

use std::path::Path;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use log::info;
use serde::Deserialize;

use terrarium_core::config::{ConeConfig, DepthConfig, RayConfig};
use terrarium_core::prelude::{
    BodyId, Depth, GreyCamera, Lidar, RgbCamera, SemanticCones, SemanticRay, Sensor, ShapeId,
    Touch,
};
use terrarium_core::error::ConfigError;

use crate::error::SimError;

// =========================================================================
// == Scenario Structs ==
// =========================================================================

/// Root of the data parsed from a scenario TOML file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: Simulation,
    #[serde(default)]
    pub walls: Vec<WallConfig>,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Base seed; each agent's noisy sensors derive from it.
    pub seed: u64,
    /// Number of steps a headless run executes.
    pub steps: u64,
    /// Physics timestep in seconds.
    pub dt: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: 0,
            steps: 100,
            dt: 1.0 / 60.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WallConfig {
    pub start: [f64; 2],
    pub end: [f64; 2],
    #[serde(default = "default_wall_color")]
    pub color: [u8; 3],
}

fn default_wall_color() -> [u8; 3] {
    [120, 120, 120]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub position: [f64; 2],
    pub radius: f64,
    pub color: [u8; 3],
    /// Optional non-solid halo radius, detectable by rays.
    pub halo: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub name: String,
    pub position: [f64; 2],
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default = "default_agent_radius")]
    pub radius: f64,
    #[serde(default = "default_agent_color")]
    pub color: [u8; 3],
    #[serde(default)]
    pub sensors: Vec<SensorSpec>,
}

fn default_agent_radius() -> f64 {
    10.0
}

fn default_agent_color() -> [u8; 3] {
    [40, 40, 40]
}

/// One `[[agents.sensors]]` table, dispatched on its `type` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorSpec {
    Lidar {
        name: String,
        #[serde(flatten)]
        config: RayConfig,
    },
    Touch {
        name: String,
        #[serde(flatten)]
        config: RayConfig,
    },
    RgbCamera {
        name: String,
        #[serde(flatten)]
        config: RayConfig,
    },
    GreyCamera {
        name: String,
        #[serde(flatten)]
        config: RayConfig,
    },
    SemanticRay {
        name: String,
        #[serde(flatten)]
        config: SemanticRayTable,
    },
    SemanticCones {
        name: String,
        #[serde(flatten)]
        config: ConeConfig,
    },
    Depth {
        name: String,
        #[serde(flatten)]
        config: DepthConfig,
    },
}

/// Partial ray table for the semantic-ray sensor. Fields left out of the
/// TOML fall back to [`RayConfig::semantic`] (full surround, occlusion and
/// duplicate resolution on), not to the generic ray defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SemanticRayTable {
    fov_deg: Option<f64>,
    resolution: Option<usize>,
    range: Option<f64>,
    remove_occluded: Option<bool>,
    allow_duplicates: Option<bool>,
    normalize: Option<bool>,
    noise: Option<terrarium_core::noise::NoiseConfig>,
    seed: Option<u64>,
}

impl SemanticRayTable {
    pub fn resolve(&self) -> RayConfig {
        let base = RayConfig::semantic();
        RayConfig {
            fov_deg: self.fov_deg.unwrap_or(base.fov_deg),
            resolution: self.resolution.unwrap_or(base.resolution),
            range: self.range.unwrap_or(base.range),
            remove_occluded: self.remove_occluded.unwrap_or(base.remove_occluded),
            allow_duplicates: self.allow_duplicates.unwrap_or(base.allow_duplicates),
            normalize: self.normalize.unwrap_or(base.normalize),
            noise: self.noise.or(base.noise),
            seed: self.seed.unwrap_or(base.seed),
        }
    }
}

impl SensorSpec {
    pub fn name(&self) -> &str {
        match self {
            SensorSpec::Lidar { name, .. }
            | SensorSpec::Touch { name, .. }
            | SensorSpec::RgbCamera { name, .. }
            | SensorSpec::GreyCamera { name, .. }
            | SensorSpec::SemanticRay { name, .. }
            | SensorSpec::SemanticCones { name, .. }
            | SensorSpec::Depth { name, .. } => name,
        }
    }
}

// =========================================================================
// == Loading ==
// =========================================================================

pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    info!("loading scenario from {}", path.display());
    Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| SimError::Scenario {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

// =========================================================================
// == Sensor Factory ==
// =========================================================================

/// Builds one sensor from its spec, anchored to an agent body. `invisible`
/// lists the agent's own shapes, which its sensors must never detect.
///
/// `base_seed` comes from the scenario seed and the sensor's position in
/// the build order; it is folded into the sensor's own `seed` field so
/// sensors left at the default still draw distinct noise streams.
pub fn build_sensor(
    spec: &SensorSpec,
    anchor: BodyId,
    anchor_radius: f64,
    invisible: &[ShapeId],
    base_seed: u64,
) -> Result<Box<dyn Sensor>, ConfigError> {
    let invisible = invisible.to_vec();
    let seeded = |config: &RayConfig| RayConfig {
        seed: config.seed.wrapping_add(base_seed),
        ..*config
    };
    let sensor: Box<dyn Sensor> = match spec {
        SensorSpec::Lidar { name, config } => {
            Box::new(Lidar::new(name, anchor, invisible, seeded(config))?)
        }
        SensorSpec::Touch { name, config } => Box::new(Touch::new(
            name,
            anchor,
            anchor_radius,
            invisible,
            seeded(config),
        )?),
        SensorSpec::RgbCamera { name, config } => {
            Box::new(RgbCamera::new(name, anchor, invisible, seeded(config))?)
        }
        SensorSpec::GreyCamera { name, config } => {
            Box::new(GreyCamera::new(name, anchor, invisible, seeded(config))?)
        }
        SensorSpec::SemanticRay { name, config } => {
            Box::new(SemanticRay::new(name, anchor, invisible, config.resolve())?)
        }
        SensorSpec::SemanticCones { name, config } => {
            Box::new(SemanticCones::new(name, anchor, invisible, *config)?)
        }
        SensorSpec::Depth { name, config } => Box::new(Depth::new(name, *config)?),
    };
    Ok(sensor)
}

// =========================================================================
// == Tests ==
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Format;

    #[test]
    fn scenario_toml_round_trips_through_figment() {
        let toml = r#"
            [simulation]
            seed = 7
            steps = 50
            dt = 0.02

            [[walls]]
            start = [-100.0, 0.0]
            end = [100.0, 0.0]

            [[entities]]
            position = [30.0, 40.0]
            radius = 8.0
            color = [200, 90, 30]
            halo = 15.0

            [[agents]]
            name = "scout"
            position = [0.0, 0.0]
            heading_deg = 90.0

            [[agents.sensors]]
            type = "lidar"
            name = "scan"
            fov_deg = 180.0
            resolution = 32

            [[agents.sensors]]
            type = "semantic_cones"
            name = "cones"
            number_cones = 8
        "#;

        let config: ScenarioConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.walls.len(), 1);
        assert_eq!(config.entities[0].halo, Some(15.0));
        assert_eq!(config.agents[0].sensors.len(), 2);
        assert_eq!(config.agents[0].sensors[0].name(), "scan");
        match &config.agents[0].sensors[1] {
            SensorSpec::SemanticCones { config, .. } => assert_eq!(config.number_cones, 8),
            other => panic!("wrong spec: {other:?}"),
        }
    }

    #[test]
    fn sensor_tables_use_library_defaults_for_omitted_fields() {
        let toml = r#"
            [[agents]]
            name = "a"
            position = [0.0, 0.0]

            [[agents.sensors]]
            type = "depth"
            name = "d"
        "#;
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        match &config.agents[0].sensors[0] {
            SensorSpec::Depth { config, .. } => {
                assert_eq!(config.resolution, DepthConfig::default().resolution);
            }
            other => panic!("wrong spec: {other:?}"),
        }
    }

    #[test]
    fn noise_table_nests_under_a_sensor() {
        let toml = r#"
            [[agents]]
            name = "a"
            position = [0.0, 0.0]

            [[agents.sensors]]
            type = "lidar"
            name = "scan"

            [agents.sensors.noise]
            type = "gaussian"
            mean = 0.0
            scale = 2.0
        "#;
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        match &config.agents[0].sensors[0] {
            SensorSpec::Lidar { config, .. } => assert!(config.noise.is_some()),
            other => panic!("wrong spec: {other:?}"),
        }
    }

    #[test]
    fn factory_rejects_invalid_configs() {
        let spec = SensorSpec::Lidar {
            name: "bad".into(),
            config: RayConfig {
                resolution: 0,
                ..RayConfig::default()
            },
        };
        let err = build_sensor(&spec, BodyId(0), 10.0, &[], 0).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCount { .. }));
    }

    #[test]
    fn bare_semantic_ray_table_gets_semantic_defaults() {
        let toml = r#"
            [[agents]]
            name = "a"
            position = [0.0, 0.0]

            [[agents.sensors]]
            type = "semantic_ray"
            name = "sem"
        "#;
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap();
        match &config.agents[0].sensors[0] {
            SensorSpec::SemanticRay { config, .. } => {
                let resolved = config.resolve();
                assert_eq!(resolved, RayConfig::semantic());
                assert!(resolved.remove_occluded);
                assert!(!resolved.allow_duplicates);
            }
            other => panic!("wrong spec: {other:?}"),
        }
    }

    #[test]
    fn semantic_ray_table_keeps_explicit_overrides() {
        let table = SemanticRayTable {
            fov_deg: Some(90.0),
            allow_duplicates: Some(true),
            ..SemanticRayTable::default()
        };
        let resolved = table.resolve();
        assert_eq!(resolved.fov_deg, 90.0);
        assert!(resolved.allow_duplicates);
        assert_eq!(resolved.range, RayConfig::semantic().range);
    }
}
