//! Wave spectrum and cascade parameters.
//!
//! User-facing values (wind speed, fetch, degrees) live in
//! [`DisplaySpectrumSettings`]; the shader-style values consumed by the
//! spectrum kernels are derived into [`SpectrumSettings`].

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::OceanError;

/// Lower bound of the first cascade band (rad/m)
pub const CUTOFF_MIN: f32 = 0.0001;

/// Upper bound of the last cascade band (rad/m)
///
/// 9999.9999 has no exact `f32`; this is the nearest representable value.
pub const CUTOFF_MAX: f32 = 10_000.0;

/// User-facing description of one spectrum component (local wind or swell)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySpectrumSettings {
    /// Energy multiplier, 0..1
    pub scale: f32,

    /// Wind speed at 10 m above the surface (m/s)
    pub wind_speed: f32,

    /// Direction the wind blows towards (degrees, 0 = +X)
    pub wind_direction_deg: f32,

    /// Distance over which the wind has blown (m)
    pub fetch: f32,

    /// Blend between cos² spreading (0) and frequency-dependent cos-2s spreading (1)
    pub spread_blend: f32,

    /// Directional narrowing for long waves, clamped to 0.01..1
    pub swell: f32,

    /// JONSWAP peak enhancement factor (gamma, typically 3.3)
    pub peak_enhancement: f32,

    /// Attenuation length for short waves (m)
    pub short_waves_fade: f32,
}

impl Default for DisplaySpectrumSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            wind_speed: 10.0,
            wind_direction_deg: 30.0,
            fetch: 100_000.0,
            spread_blend: 0.9,
            swell: 0.2,
            peak_enhancement: 3.3,
            short_waves_fade: 0.01,
        }
    }
}

impl DisplaySpectrumSettings {
    /// Default long-period swell arriving from a different heading
    pub fn default_swell() -> Self {
        Self {
            scale: 0.5,
            wind_speed: 7.0,
            wind_direction_deg: 80.0,
            fetch: 300_000.0,
            spread_blend: 1.0,
            swell: 1.0,
            peak_enhancement: 3.3,
            short_waves_fade: 0.01,
        }
    }

    /// Calm component that contributes no energy
    pub fn calm() -> Self {
        Self {
            scale: 0.0,
            wind_speed: 0.0,
            ..Self::default()
        }
    }
}

/// Derived spectrum parameters consumed by the initial spectrum kernel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectrumSettings {
    pub scale: f32,
    /// Wind heading (radians)
    pub angle: f32,
    pub spread_blend: f32,
    pub swell: f32,
    /// JONSWAP energy scale (derived from fetch and wind speed)
    pub alpha: f32,
    /// JONSWAP peak angular frequency (rad/s)
    pub peak_omega: f32,
    pub gamma: f32,
    pub short_waves_fade: f32,
}

impl SpectrumSettings {
    /// Derive spectrum parameters from user-facing values
    ///
    /// Degenerate inputs (no wind, no fetch) produce a component with zero
    /// energy instead of NaN/inf parameters.
    pub fn derive(display: &DisplaySpectrumSettings, gravity: f32) -> Self {
        let alpha = jonswap_alpha(gravity, display.fetch, display.wind_speed);
        let peak_omega = jonswap_peak_frequency(gravity, display.fetch, display.wind_speed);
        let degenerate = !(alpha.is_finite() && peak_omega.is_finite() && peak_omega > 0.0);

        Self {
            scale: if degenerate { 0.0 } else { display.scale },
            angle: display.wind_direction_deg / 180.0 * PI,
            spread_blend: display.spread_blend,
            swell: display.swell.clamp(0.01, 1.0),
            alpha: if degenerate { 0.0 } else { alpha },
            peak_omega: if degenerate { 0.0 } else { peak_omega },
            gamma: display.peak_enhancement,
            short_waves_fade: display.short_waves_fade,
        }
    }

    /// Whether this component contributes any energy
    pub fn is_active(&self) -> bool {
        self.scale > 0.0 && self.alpha > 0.0 && self.peak_omega > 0.0
    }
}

/// JONSWAP alpha: `0.076 * (g * fetch / U²)^-0.22`
pub fn jonswap_alpha(gravity: f32, fetch: f32, wind_speed: f32) -> f32 {
    0.076 * (gravity * fetch / wind_speed / wind_speed).powf(-0.22)
}

/// JONSWAP peak angular frequency: `22 * (U * fetch / g²)^-0.33`
pub fn jonswap_peak_frequency(gravity: f32, fetch: f32, wind_speed: f32) -> f32 {
    22.0 * (wind_speed * fetch / gravity / gravity).powf(-0.33)
}

/// Global wave settings: physical constants plus the two spectrum components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSettings {
    /// Gravitational acceleration (m/s²)
    pub gravity: f32,

    /// Water depth (m), enters the finite-depth dispersion relation
    pub depth: f32,

    /// Horizontal displacement multiplier ("choppiness"), 0..1
    pub lambda: f32,

    /// Local wind sea
    pub local: DisplaySpectrumSettings,

    /// Distant swell
    pub swell: DisplaySpectrumSettings,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            depth: 500.0,
            lambda: 0.8,
            local: DisplaySpectrumSettings::default(),
            swell: DisplaySpectrumSettings::default_swell(),
        }
    }
}

impl WaveSettings {
    /// Derived parameters for both components, local first
    pub fn spectrum_settings(&self) -> [SpectrumSettings; 2] {
        [
            SpectrumSettings::derive(&self.local, self.gravity),
            SpectrumSettings::derive(&self.swell, self.gravity),
        ]
    }

    /// Validate physical constants
    pub fn validate(&self) -> Result<(), OceanError> {
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(OceanError::InvalidSetting {
                name: "gravity",
                value: self.gravity,
            });
        }
        if !(self.depth.is_finite() && self.depth > 0.0) {
            return Err(OceanError::InvalidSetting {
                name: "depth",
                value: self.depth,
            });
        }
        if !self.lambda.is_finite() {
            return Err(OceanError::InvalidSetting {
                name: "lambda",
                value: self.lambda,
            });
        }
        Ok(())
    }
}

/// Foam (turbulence) accumulation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoamSettings {
    /// Time for accumulated foam to halve with no new compression (s)
    pub half_life_s: f32,

    /// Foam added per second per unit of compression below the threshold
    pub growth_rate: f32,

    /// Jacobian value below which the surface counts as compressed
    pub jacobian_threshold: f32,
}

impl Default for FoamSettings {
    fn default() -> Self {
        Self {
            half_life_s: 1.0,
            growth_rate: 1.0,
            jacobian_threshold: 0.0,
        }
    }
}

/// Cascade layout: grid resolution and world-space tile sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Texels per side (power of two)
    pub resolution: usize,

    /// Tile size per cascade (m), strictly descending
    pub length_scales: Vec<f32>,

    /// Recompute initial spectra every frame (debug mode)
    pub always_recalculate_initials: bool,

    /// Seed for the shared Gaussian noise grid
    pub noise_seed: u64,

    pub foam: FoamSettings,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            length_scales: vec![250.0, 17.0, 5.0],
            always_recalculate_initials: false,
            noise_seed: 0x5EA5_1DE5,
            foam: FoamSettings::default(),
        }
    }
}

impl CascadeConfig {
    /// Validate resolution and length scale ordering
    pub fn validate(&self) -> Result<(), OceanError> {
        if !self.resolution.is_power_of_two() {
            return Err(OceanError::NonPowerOfTwo(self.resolution));
        }
        if self.length_scales.is_empty() {
            return Err(OceanError::NoCascades);
        }
        let positive = self
            .length_scales
            .iter()
            .all(|l| l.is_finite() && *l > 0.0);
        let descending = self.length_scales.windows(2).all(|w| w[0] > w[1]);
        if !positive || !descending {
            return Err(OceanError::InvalidLengthScales(self.length_scales.clone()));
        }
        Ok(())
    }

    /// Wavenumber band `(cutoff_low, cutoff_high)` for every cascade
    pub fn cutoffs(&self) -> Vec<(f32, f32)> {
        compute_cascade_cutoffs(&self.length_scales)
    }
}

/// Boundary between a cascade and the next finer one (rad/m)
pub fn compute_cascade_boundary(finer_length_scale: f32) -> f32 {
    2.0 * PI / finer_length_scale * 6.0
}

/// Contiguous wavenumber bands for descending length scales
///
/// Band `i` spans `[boundary_i, boundary_{i+1}]`, with the first band starting
/// at [`CUTOFF_MIN`] and the last ending at [`CUTOFF_MAX`].
pub fn compute_cascade_cutoffs(length_scales: &[f32]) -> Vec<(f32, f32)> {
    let count = length_scales.len();
    (0..count)
        .map(|i| {
            let low = if i == 0 {
                CUTOFF_MIN
            } else {
                compute_cascade_boundary(length_scales[i])
            };
            let high = if i + 1 == count {
                CUTOFF_MAX
            } else {
                compute_cascade_boundary(length_scales[i + 1])
            };
            (low, high)
        })
        .collect()
}
