// terrarium_sim/src/main.rs

use clap::Parser;
use log::info;

use terrarium_sim::cli::Cli;
use terrarium_sim::config::load_scenario;
use terrarium_sim::engine::Simulation;
use terrarium_sim::error::SimError;
use terrarium_sim::prelude::Observation;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), SimError> {
    let config = load_scenario(&cli.scenario)?;
    let steps = cli.steps.unwrap_or(config.simulation.steps);

    let mut sim = Simulation::from_config(&config)?;
    for _ in 0..steps {
        sim.step()?;
    }
    info!("ran {} steps", sim.steps_done());

    for agent in &sim.agents {
        for sensor in &agent.sensors {
            let summary = match sensor.observation() {
                Observation::Ranges(v) => format!("{} values", v.len()),
                Observation::Colors(v) => format!("{} pixels", v.len()),
                Observation::Detections(v) => format!("{} detections", v.len()),
            };
            info!("{}/{}: {}", agent.name, sensor.name(), summary);

            if let Some(dir) = &cli.draw_dir {
                std::fs::create_dir_all(dir).ok();
                let path = dir.join(format!("{}_{}.png", agent.name, sensor.name()));
                let img = sensor.draw(256, 32);
                if let Err(e) = img.save(&path) {
                    log::warn!("could not save {}: {e}", path.display());
                } else {
                    info!("wrote {}", path.display());
                }
            }
        }
    }
    Ok(())
}
