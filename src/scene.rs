//! Scene driver: advances the ocean and the flock in a fixed per-frame order.

use tracing::{error, info};

use crate::flock::FlockEngine;
use crate::ocean::{OceanSurface, WaterHeightQuery};
use crate::params::SceneConfig;

/// Owns the simulation subsystems; a subsystem that failed setup stays `None`
pub struct Scene {
    ocean: Option<OceanSurface>,
    flock: Option<FlockEngine>,
    time_s: f32,
    frame: usize,
}

impl Scene {
    /// Build every subsystem, disabling (and logging) any that fail to set up
    pub fn new(config: &SceneConfig) -> Self {
        let ocean = match OceanSurface::new(config.ocean.clone()) {
            Ok(ocean) => Some(ocean),
            Err(e) => {
                error!(error = %e, "ocean setup failed, ocean disabled");
                None
            }
        };
        let flock = match FlockEngine::new(&config.flock) {
            Ok(flock) => Some(flock),
            Err(e) => {
                error!(error = %e, "flock setup failed, flock disabled");
                None
            }
        };
        Self::from_parts(ocean, flock)
    }

    pub fn from_parts(ocean: Option<OceanSurface>, flock: Option<FlockEngine>) -> Self {
        info!(
            ocean = ocean.is_some(),
            flock = flock.is_some(),
            "scene ready"
        );
        Self {
            ocean,
            flock,
            time_s: 0.0,
            frame: 0,
        }
    }

    pub fn ocean(&self) -> Option<&OceanSurface> {
        self.ocean.as_ref()
    }

    pub fn ocean_mut(&mut self) -> Option<&mut OceanSurface> {
        self.ocean.as_mut()
    }

    pub fn flock(&self) -> Option<&FlockEngine> {
        self.flock.as_ref()
    }

    pub fn flock_mut(&mut self) -> Option<&mut FlockEngine> {
        self.flock.as_mut()
    }

    /// Simulation time (s)
    pub fn time_s(&self) -> f32 {
        self.time_s
    }

    /// Number of completed frames
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Advance one frame: ocean first, then the flock against the latest water heights
    pub fn step(&mut self, delta_time: f32) {
        self.time_s += delta_time;

        if let Some(ocean) = self.ocean.as_mut() {
            if let Err(e) = ocean.update(self.time_s, delta_time) {
                error!(error = %e, frame = self.frame, "ocean update failed, ocean disabled");
                self.ocean = None;
            }
        }

        if let Some(flock) = self.flock.as_mut() {
            let water = self.ocean.as_ref().map(|o| o as &dyn WaterHeightQuery);
            flock.step(delta_time, water);
        }

        self.frame += 1;
    }

    /// Block until the ocean's pending readbacks have landed
    pub fn flush_readbacks(&mut self) {
        if let Some(ocean) = self.ocean.as_mut() {
            ocean.flush_readbacks();
        }
    }
}
