// terrarium_core/src/lib.rs

// This file defines the public modules of the library.
pub mod config;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod noise;
pub mod prelude;
pub mod raycast;
pub mod scene;
pub mod sensors;
pub mod types;
