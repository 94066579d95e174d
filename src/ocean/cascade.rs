//! One length-scale band of the ocean: owns its spectrum, derivative and
//! output buffers and steps through `Uninitialized -> SpectrumReady -> Evolving`.

use rustfft::num_complex::Complex32;
use tracing::debug;

use crate::error::OceanError;
use crate::grid::Grid;
use crate::params::{FoamSettings, WaveSettings};

use super::evolve::{evolve, DerivativeFields};
use super::fft::Fft;
use super::merge::{inverse_transform, merge, CascadeOutputs};
use super::spectrum::{
    conjugated_spectrum, initial_spectrum, precompute_wave_data, SpectrumInputs, SpectrumTexel,
    WaveData,
};

/// Lifecycle of a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Uninitialized,
    SpectrumReady,
    Evolving,
}

/// Physics inputs the wave data table was built from
#[derive(Debug, Clone, Copy, PartialEq)]
struct WaveDataKey {
    gravity: f32,
    depth: f32,
}

pub struct Cascade {
    size: usize,
    length_scale: f32,
    cutoff_low: f32,
    cutoff_high: f32,
    state: CascadeState,
    wave_data: Grid<WaveData>,
    wave_data_key: Option<WaveDataKey>,
    spectrum: Grid<SpectrumTexel>,
    fields: DerivativeFields,
    scratch: Grid<Complex32>,
    outputs: CascadeOutputs,
}

impl Cascade {
    /// Allocate all buffers for a `size`×`size` cascade covering `[cutoff_low, cutoff_high]`
    pub fn new(size: usize, length_scale: f32, cutoff_low: f32, cutoff_high: f32) -> Self {
        Self {
            size,
            length_scale,
            cutoff_low,
            cutoff_high,
            state: CascadeState::Uninitialized,
            wave_data: Grid::new(size, WaveData::default()),
            wave_data_key: None,
            spectrum: Grid::new(size, SpectrumTexel::default()),
            fields: DerivativeFields::zeroed(size),
            scratch: Grid::new(size, Complex32::new(0.0, 0.0)),
            outputs: CascadeOutputs::new(size),
        }
    }

    pub fn state(&self) -> CascadeState {
        self.state
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn length_scale(&self) -> f32 {
        self.length_scale
    }

    /// Wavenumber band `(low, high)` in rad/m
    pub fn cutoffs(&self) -> (f32, f32) {
        (self.cutoff_low, self.cutoff_high)
    }

    pub fn wave_data(&self) -> &Grid<WaveData> {
        &self.wave_data
    }

    pub fn spectrum(&self) -> &Grid<SpectrumTexel> {
        &self.spectrum
    }

    pub fn outputs(&self) -> &CascadeOutputs {
        &self.outputs
    }

    /// Build the initial spectrum from `noise` and the current wave settings
    ///
    /// Re-runnable. The wave data table is only rebuilt when gravity or depth
    /// changed since the last call.
    pub fn calculate_initials(
        &mut self,
        waves: &WaveSettings,
        noise: &Grid<Complex32>,
    ) -> Result<(), OceanError> {
        if noise.size() != self.size {
            return Err(OceanError::SizeMismatch {
                expected: self.size,
                actual: noise.size(),
            });
        }

        let inputs = SpectrumInputs {
            length_scale: self.length_scale,
            cutoff_low: self.cutoff_low,
            cutoff_high: self.cutoff_high,
            gravity: waves.gravity,
            depth: waves.depth,
            components: waves.spectrum_settings(),
        };

        let key = WaveDataKey {
            gravity: waves.gravity,
            depth: waves.depth,
        };
        if self.wave_data_key != Some(key) {
            debug!(
                length_scale = self.length_scale,
                gravity = key.gravity,
                depth = key.depth,
                "rebuilding wave data"
            );
            self.wave_data = precompute_wave_data(self.size, &inputs);
            self.wave_data_key = Some(key);
        }

        let h0_k = initial_spectrum(noise, &inputs);
        self.spectrum = conjugated_spectrum(&h0_k);
        self.state = CascadeState::SpectrumReady;
        Ok(())
    }

    /// Evolve to `time`, inverse-transform and merge into the output fields
    pub fn calculate_wave_data(
        &mut self,
        fft: &Fft,
        time: f32,
        delta_time: f32,
        lambda: f32,
        foam: &FoamSettings,
    ) -> Result<(), OceanError> {
        if self.state == CascadeState::Uninitialized {
            return Err(OceanError::SpectrumNotReady);
        }
        if fft.size() != self.size {
            return Err(OceanError::SizeMismatch {
                expected: self.size,
                actual: fft.size(),
            });
        }

        evolve(&self.spectrum, &self.wave_data, time, &mut self.fields);
        inverse_transform(fft, &mut self.fields, &mut self.scratch)?;
        merge(&self.fields, lambda, delta_time, foam, &mut self.outputs);
        self.state = CascadeState::Evolving;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocean::spectrum::gaussian_noise;
    use crate::params::DisplaySpectrumSettings;

    fn calm_waves() -> WaveSettings {
        WaveSettings {
            local: DisplaySpectrumSettings::calm(),
            swell: DisplaySpectrumSettings::calm(),
            ..WaveSettings::default()
        }
    }

    #[test]
    fn test_state_transitions() {
        let size = 8;
        let fft = Fft::new(size).unwrap();
        let noise = gaussian_noise(size, 1);
        let mut cascade = Cascade::new(size, 50.0, 0.0001, 9999.0);
        assert_eq!(cascade.state(), CascadeState::Uninitialized);

        let foam = FoamSettings::default();
        assert!(matches!(
            cascade.calculate_wave_data(&fft, 0.0, 0.016, 0.8, &foam),
            Err(OceanError::SpectrumNotReady)
        ));

        cascade
            .calculate_initials(&WaveSettings::default(), &noise)
            .unwrap();
        assert_eq!(cascade.state(), CascadeState::SpectrumReady);

        cascade
            .calculate_wave_data(&fft, 1.0, 0.016, 0.8, &foam)
            .unwrap();
        assert_eq!(cascade.state(), CascadeState::Evolving);

        // Recalculating initials is allowed from the evolving state
        cascade
            .calculate_initials(&WaveSettings::default(), &noise)
            .unwrap();
        assert_eq!(cascade.state(), CascadeState::SpectrumReady);
    }

    #[test]
    fn test_noise_size_checked() {
        let mut cascade = Cascade::new(8, 50.0, 0.0001, 9999.0);
        let noise = gaussian_noise(4, 1);
        assert!(matches!(
            cascade.calculate_initials(&WaveSettings::default(), &noise),
            Err(OceanError::SizeMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_calm_sea_is_flat() {
        let size = 8;
        let fft = Fft::new(size).unwrap();
        let noise = gaussian_noise(size, 3);
        let mut cascade = Cascade::new(size, 20.0, 0.0001, 9999.0);
        cascade.calculate_initials(&calm_waves(), &noise).unwrap();
        for frame in 0..3 {
            cascade
                .calculate_wave_data(&fft, frame as f32, 0.1, 0.8, &FoamSettings::default())
                .unwrap();
            assert!(cascade
                .outputs()
                .displacement
                .as_slice()
                .iter()
                .all(|d| d.length() < 1e-6));
        }
    }

    #[test]
    fn test_wind_produces_real_displacement() {
        let size = 16;
        let fft = Fft::new(size).unwrap();
        let noise = gaussian_noise(size, 11);
        let mut cascade = Cascade::new(size, 100.0, 0.0001, 9999.0);
        cascade
            .calculate_initials(&WaveSettings::default(), &noise)
            .unwrap();
        cascade
            .calculate_wave_data(&fft, 2.5, 0.016, 0.8, &FoamSettings::default())
            .unwrap();

        let heights: Vec<f32> = cascade
            .outputs()
            .displacement
            .as_slice()
            .iter()
            .map(|d| d.y)
            .collect();
        assert!(heights.iter().all(|h| h.is_finite()));
        assert!(heights.iter().any(|h| h.abs() > 1e-4));
    }

    #[test]
    fn test_wave_data_rebuilt_only_on_physics_change() {
        let size = 8;
        let noise = gaussian_noise(size, 5);
        let mut cascade = Cascade::new(size, 30.0, 0.0001, 9999.0);
        let mut waves = WaveSettings::default();
        cascade.calculate_initials(&waves, &noise).unwrap();
        let before = cascade.wave_data().clone();

        waves.local.wind_speed *= 2.0;
        cascade.calculate_initials(&waves, &noise).unwrap();
        assert_eq!(&before, cascade.wave_data());

        waves.depth = 2.0;
        cascade.calculate_initials(&waves, &noise).unwrap();
        assert_ne!(&before, cascade.wave_data());
    }
}
