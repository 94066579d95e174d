//! High-level ocean surface: owns the cascades and drives them every frame.

use glam::Vec3;
use rustfft::num_complex::Complex32;
use tracing::{debug, info};

use super::cascade::{Cascade, CascadeState};
use super::fft::Fft;
use super::merge::CascadeOutputs;
use super::readback::{ReadbackQueue, SnapshotReader};
use super::spectrum::gaussian_noise;
use super::WaterHeightQuery;
use crate::error::OceanError;
use crate::grid::Grid;
use crate::params::{OceanConfig, WaveSettings};

/// Multi-cascade spectral ocean with an asynchronously refreshed height query
pub struct OceanSurface {
    config: OceanConfig,
    fft: Fft,
    noise: Grid<Complex32>,
    cascades: Vec<Cascade>,
    readback: ReadbackQueue,
    time_s: f32,
}

impl OceanSurface {
    /// Validate the configuration and allocate every cascade
    ///
    /// Cascades start `Uninitialized`; the first [`update`](Self::update)
    /// computes their initial spectra.
    pub fn new(config: OceanConfig) -> Result<Self, OceanError> {
        config.cascades.validate()?;
        config.waves.validate()?;

        let size = config.cascades.resolution;
        let fft = Fft::new(size)?;
        let noise = gaussian_noise(size, config.cascades.noise_seed);

        let cascades: Vec<Cascade> = config
            .cascades
            .length_scales
            .iter()
            .zip(config.cascades.cutoffs())
            .map(|(&length_scale, (low, high))| Cascade::new(size, length_scale, low, high))
            .collect();

        let readback = ReadbackQueue::new(config.cascades.length_scales[0])?;

        info!(
            resolution = size,
            cascades = cascades.len(),
            length_scales = ?config.cascades.length_scales,
            "ocean surface ready"
        );

        Ok(Self {
            config,
            fft,
            noise,
            cascades,
            readback,
            time_s: 0.0,
        })
    }

    pub fn config(&self) -> &OceanConfig {
        &self.config
    }

    /// Simulation time of the last update (s)
    pub fn time_s(&self) -> f32 {
        self.time_s
    }

    pub fn cascade_count(&self) -> usize {
        self.cascades.len()
    }

    pub fn cascade(&self, index: usize) -> Option<&Cascade> {
        self.cascades.get(index)
    }

    pub fn cascade_states(&self) -> Vec<CascadeState> {
        self.cascades.iter().map(Cascade::state).collect()
    }

    /// Output fields of cascade `index` for shading and export
    pub fn cascade_outputs(&self, index: usize) -> Result<&CascadeOutputs, OceanError> {
        self.cascades
            .get(index)
            .map(Cascade::outputs)
            .ok_or(OceanError::CascadeOutOfRange {
                index,
                count: self.cascades.len(),
            })
    }

    /// Recompute initial spectra for every cascade from the current settings
    pub fn calculate_initials(&mut self) -> Result<(), OceanError> {
        for cascade in &mut self.cascades {
            cascade.calculate_initials(&self.config.waves, &self.noise)?;
        }
        debug!(cascades = self.cascades.len(), "initial spectra computed");
        Ok(())
    }

    /// Replace the wave settings and rebuild the initial spectra
    pub fn set_wave_settings(&mut self, waves: WaveSettings) -> Result<(), OceanError> {
        waves.validate()?;
        self.config.waves = waves;
        self.calculate_initials()
    }

    /// Advance every cascade to `time_s` and request a readback of cascade 0
    ///
    /// Readbacks that completed since the previous frame are applied at the
    /// end of the call, so queries may lag the fields by one or more frames.
    pub fn update(&mut self, time_s: f32, delta_time: f32) -> Result<(), OceanError> {
        let needs_initials = self.config.cascades.always_recalculate_initials
            || self
                .cascades
                .iter()
                .any(|c| c.state() == CascadeState::Uninitialized);
        if needs_initials {
            self.calculate_initials()?;
        }

        let lambda = self.config.waves.lambda;
        let foam = self.config.cascades.foam;
        for cascade in &mut self.cascades {
            cascade.calculate_wave_data(&self.fft, time_s, delta_time, lambda, &foam)?;
        }
        self.time_s = time_s;

        if let Some(primary) = self.cascades.first() {
            self.readback
                .request(&primary.outputs().displacement, primary.length_scale());
        }
        let applied = self.readback.poll();
        if applied > 0 {
            debug!(
                applied,
                snapshot = self.readback.last_applied(),
                in_flight = self.readback.in_flight(),
                "readback applied"
            );
        }
        Ok(())
    }

    /// Block until all requested readbacks have been applied
    pub fn flush_readbacks(&mut self) {
        self.readback.flush();
    }

    /// Handle for querying heights from other threads
    pub fn reader(&self) -> SnapshotReader {
        self.readback.reader()
    }

    /// Displacement of cascade 0 at world `point` from the latest snapshot
    pub fn displacement_at(&self, point: Vec3) -> Vec3 {
        self.readback.reader().displacement_at(point)
    }

    /// Water height at world `point` from the latest snapshot
    pub fn water_height(&self, point: Vec3) -> f32 {
        self.readback.reader().water_height(point)
    }
}

impl WaterHeightQuery for OceanSurface {
    fn water_height(&self, point: Vec3) -> f32 {
        OceanSurface::water_height(self, point)
    }
}
