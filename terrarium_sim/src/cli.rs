// terrarium_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Terrarium: a 2D embodied-agent playground simulator.
///
/// This struct defines the command-line arguments that can be passed to any
/// binary application that uses the Terrarium simulation library.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/corridor.toml")]
    pub scenario: PathBuf,

    /// Override the step count from the scenario file.
    #[arg(long)]
    pub steps: Option<u64>,

    /// Directory to write diagnostic sensor renderings into (one PNG per
    /// sensor, from the final step).
    #[arg(long)]
    pub draw_dir: Option<PathBuf>,
}
