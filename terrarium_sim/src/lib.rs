// terrarium_sim/src/lib.rs

//! Simulation glue around `terrarium_core`: a rapier2d-backed scene, polar
//! raster sampling for visual sensors, scenario loading, and the step loop.

// This prelude is for convenience for other files WITHIN the terrarium_sim
// crate and for binaries built on it.
pub mod prelude;

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod polar;
pub mod scene;
