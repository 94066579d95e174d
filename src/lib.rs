//! Shoalwave library - spectral ocean surface and boid flocking

pub mod error;
pub mod export;
pub mod flock;
pub mod grid;
pub mod ocean;
pub mod params;
pub mod scene;
