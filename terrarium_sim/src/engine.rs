// terrarium_sim/src/engine.rs

//! The simulation loop: assemble a scene from a scenario, then step physics
//! and refresh every agent's sensors once per step.

use log::{debug, info};
use nalgebra::Point2;

use terrarium_core::prelude::{AgentId, BodyId, Pose2, Sensor, SensorInput, ShapeId};

use crate::config::{build_sensor, ScenarioConfig};
use crate::error::SimError;
use crate::polar::polar_view;
use crate::scene::PhysicsScene;

/// One agent in the running simulation: its identity, physics anchor and
/// sensor rig.
pub struct SimAgent {
    pub id: AgentId,
    pub name: String,
    pub body: BodyId,
    pub radius: f64,
    pub shape: ShapeId,
    pub sensors: Vec<Box<dyn Sensor>>,
}

pub struct Simulation {
    pub scene: PhysicsScene,
    pub agents: Vec<SimAgent>,
    steps_done: u64,
}

impl Simulation {
    /// Assembles the world and every agent's sensor rig from a loaded
    /// scenario.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, SimError> {
        let mut scene = PhysicsScene::new(config.simulation.dt);

        for wall in &config.walls {
            scene.add_wall(
                Point2::new(wall.start[0], wall.start[1]),
                Point2::new(wall.end[0], wall.end[1]),
                wall.color,
            );
        }

        for entity in &config.entities {
            let id = scene.add_circle_entity(
                Point2::new(entity.position[0], entity.position[1]),
                entity.radius,
                entity.color,
            );
            if let Some(halo) = entity.halo {
                scene.add_interaction_halo(id, halo);
            }
        }

        let mut agents = Vec::with_capacity(config.agents.len());
        // Each sensor gets a distinct base seed derived from the scenario
        // seed and its position in the build order; SmallRng decorrelates
        // consecutive u64 seeds.
        let mut sensor_count: u64 = 0;
        for agent_config in &config.agents {
            let pose = Pose2::new(
                agent_config.position[0],
                agent_config.position[1],
                agent_config.heading_deg.to_radians(),
            );
            let (id, body, shape) = scene.add_agent(pose, agent_config.radius, agent_config.color);

            let mut sensors = Vec::with_capacity(agent_config.sensors.len());
            for spec in &agent_config.sensors {
                let base_seed = config.simulation.seed.wrapping_add(sensor_count);
                sensor_count += 1;
                sensors.push(build_sensor(
                    spec,
                    body,
                    agent_config.radius,
                    &[shape],
                    base_seed,
                )?);
            }
            info!(
                "agent '{}' assembled with {} sensors",
                agent_config.name,
                sensors.len()
            );

            agents.push(SimAgent {
                id,
                name: agent_config.name.clone(),
                body,
                radius: agent_config.radius,
                shape,
                sensors,
            });
        }

        scene.refresh_queries();
        Ok(Self {
            scene,
            agents,
            steps_done: 0,
        })
    }

    /// Advances physics by one timestep, then updates every sensor against
    /// the frozen scene. Sensor updates never mutate the scene, so their
    /// order is irrelevant.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.scene.step();

        for agent in &mut self.agents {
            for sensor in &mut agent.sensors {
                match sensor.polar_spec() {
                    Some(spec) => {
                        let view = polar_view(&self.scene, agent.body, &spec)?;
                        sensor.update(SensorInput::Polar(&view))?;
                    }
                    None => sensor.update(SensorInput::Scene(&self.scene))?,
                }
            }
        }

        self.steps_done += 1;
        debug!("step {} complete", self.steps_done);
        Ok(())
    }

    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }
}
