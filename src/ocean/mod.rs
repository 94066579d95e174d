//! Spectral ocean surface.
//!
//! Per frame, for every cascade: evolve the spectrum to `t`, inverse FFT the
//! four derivative buffers, merge into displacement/derivative/turbulence
//! fields. Cascade 0's displacement is then copied back for height queries.

pub mod cascade;
pub mod evolve;
pub mod fft;
pub mod merge;
pub mod readback;
pub mod spectrum;
mod system;

use glam::Vec3;

pub use cascade::{Cascade, CascadeState};
pub use fft::{Fft, PingPong, TwiddleTable};
pub use merge::CascadeOutputs;
pub use readback::{DisplacementSnapshot, ReadbackCompletion, SnapshotReader};
pub use system::OceanSurface;

/// Anything that can answer "how high is the water here?"
pub trait WaterHeightQuery {
    /// World-space water height at the horizontal position of `point`
    fn water_height(&self, point: Vec3) -> f32;
}

impl WaterHeightQuery for SnapshotReader {
    fn water_height(&self, point: Vec3) -> f32 {
        SnapshotReader::water_height(self, point)
    }
}

impl WaterHeightQuery for DisplacementSnapshot {
    fn water_height(&self, point: Vec3) -> f32 {
        DisplacementSnapshot::water_height(self, point)
    }
}

/// Flat water at a fixed height
impl WaterHeightQuery for f32 {
    fn water_height(&self, _point: Vec3) -> f32 {
        *self
    }
}
