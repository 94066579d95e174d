//! Initial spectrum generation.
//!
//! Produces the static frequency-domain amplitudes `h0` for one cascade from
//! Gaussian noise and the directional JONSWAP spectrum. Texel `(x, y)` maps
//! to wavevector `(x - N/2, y - N/2) * 2π / L`.

use glam::Vec2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

use crate::grid::Grid;
use crate::params::SpectrumSettings;

/// Per-texel invariant wave data: wavevector, its inverse length, angular frequency
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WaveData {
    pub kx: f32,
    /// `1 / |k|` inside the band, `1` outside
    pub inv_k: f32,
    pub kz: f32,
    /// Angular frequency from the dispersion relation, `0` outside the band
    pub omega: f32,
}

/// Hermitian pair stored per texel: `h0(k)` and `conj(h0(-k))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumTexel {
    pub h0: Complex32,
    pub h0_minus_k_conj: Complex32,
}

impl Default for SpectrumTexel {
    fn default() -> Self {
        Self {
            h0: Complex32::new(0.0, 0.0),
            h0_minus_k_conj: Complex32::new(0.0, 0.0),
        }
    }
}

/// Physical inputs shared by every texel of one cascade
#[derive(Debug, Clone, Copy)]
pub struct SpectrumInputs {
    pub length_scale: f32,
    pub cutoff_low: f32,
    pub cutoff_high: f32,
    pub gravity: f32,
    pub depth: f32,
    pub components: [SpectrumSettings; 2],
}

/// Grid of standard-normal complex pairs (Box-Muller), deterministic per seed
pub fn gaussian_noise(size: usize, seed: u64) -> Grid<Complex32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut normal = move || {
        let u1: f32 = rng.gen();
        let u2: f32 = 1.0 - rng.gen::<f32>();
        (2.0 * PI * u1).cos() * (-2.0 * u2.ln()).sqrt()
    };
    let mut noise = Grid::new(size, Complex32::new(0.0, 0.0));
    for texel in noise.as_mut_slice() {
        *texel = Complex32::new(normal(), normal());
    }
    noise
}

/// Wavevector of texel `(x, y)`
#[inline]
pub fn wave_vector(x: usize, y: usize, size: usize, length_scale: f32) -> Vec2 {
    let delta_k = 2.0 * PI / length_scale;
    let half = (size / 2) as i64;
    Vec2::new(
        (x as i64 - half) as f32 * delta_k,
        (y as i64 - half) as f32 * delta_k,
    )
}

/// Finite-depth dispersion relation `ω = sqrt(g k tanh(min(k h, 20)))`
pub fn frequency(k: f32, gravity: f32, depth: f32) -> f32 {
    (gravity * k * (k * depth).min(20.0).tanh()).sqrt()
}

/// `dω/dk` of [`frequency`]
pub fn frequency_derivative(k: f32, gravity: f32, depth: f32) -> f32 {
    let th = (k * depth).min(20.0).tanh();
    let ch = (k * depth).cosh();
    gravity * (depth * k / ch / ch + th) / frequency(k, gravity, depth) / 2.0
}

/// Normalisation of the cos-2s spreading function (polynomial fit)
fn normalisation_factor(s: f32) -> f32 {
    let s2 = s * s;
    let s3 = s2 * s;
    let s4 = s3 * s;
    if s < 5.0 {
        -0.000564 * s4 + 0.00776 * s3 - 0.044 * s2 + 0.192 * s + 0.163
    } else {
        -4.80e-08 * s4 + 1.07e-05 * s3 - 9.53e-04 * s2 + 5.90e-02 * s + 3.93e-01
    }
}

fn cosine_2s(theta: f32, s: f32) -> f32 {
    normalisation_factor(s) * (0.5 * theta).cos().abs().powf(2.0 * s)
}

fn spread_power(omega: f32, peak_omega: f32) -> f32 {
    if omega > peak_omega {
        9.77 * (omega / peak_omega).abs().powf(-2.5)
    } else {
        6.97 * (omega / peak_omega).abs().powf(5.0)
    }
}

/// Directional spreading: blend of cos² and frequency-dependent cos-2s
pub fn direction_spectrum(theta: f32, omega: f32, settings: &SpectrumSettings) -> f32 {
    let s = spread_power(omega, settings.peak_omega)
        + 16.0 * (omega / settings.peak_omega).min(20.0).tanh() * settings.swell * settings.swell;
    let cos2 = 2.0 / PI * theta.cos() * theta.cos();
    cos2 + (cosine_2s(theta - settings.angle, s) - cos2) * settings.spread_blend
}

/// TMA shallow-water correction of the JONSWAP spectrum
fn tma_correction(omega: f32, gravity: f32, depth: f32) -> f32 {
    let omega_h = omega * (depth / gravity).sqrt();
    if omega_h <= 1.0 {
        0.5 * omega_h * omega_h
    } else if omega_h < 2.0 {
        1.0 - 0.5 * (2.0 - omega_h) * (2.0 - omega_h)
    } else {
        1.0
    }
}

/// JONSWAP frequency spectrum with TMA correction
pub fn jonswap(omega: f32, gravity: f32, depth: f32, settings: &SpectrumSettings) -> f32 {
    if !settings.is_active() || omega <= 0.0 {
        return 0.0;
    }
    let peak = settings.peak_omega;
    let sigma = if omega <= peak { 0.07 } else { 0.09 };
    let r = (-(omega - peak) * (omega - peak) / 2.0 / sigma / sigma / peak / peak).exp();
    let inv_omega = 1.0 / omega;
    let peak_over_omega = peak / omega;
    settings.scale
        * tma_correction(omega, gravity, depth)
        * settings.alpha
        * gravity
        * gravity
        * inv_omega.powi(5)
        * (-1.25 * peak_over_omega.powi(4)).exp()
        * settings.gamma.abs().powf(r)
}

fn short_waves_fade(k: f32, settings: &SpectrumSettings) -> f32 {
    (-settings.short_waves_fade * settings.short_waves_fade * k * k).exp()
}

/// Directional spectrum summed over active components
pub fn directional_spectrum(k: Vec2, omega: f32, inputs: &SpectrumInputs) -> f32 {
    let k_length = k.length();
    let theta = k.y.atan2(k.x);
    inputs
        .components
        .iter()
        .filter(|c| c.is_active())
        .map(|c| {
            jonswap(omega, inputs.gravity, inputs.depth, c)
                * direction_spectrum(theta, omega, c)
                * short_waves_fade(k_length, c)
        })
        .sum()
}

#[inline]
fn in_band(k_length: f32, inputs: &SpectrumInputs) -> bool {
    k_length >= inputs.cutoff_low && k_length <= inputs.cutoff_high
}

/// Wavevector and dispersion table; depends only on size, length scale, band and physics
pub fn precompute_wave_data(size: usize, inputs: &SpectrumInputs) -> Grid<WaveData> {
    Grid::from_fn(size, |x, y| {
        let k = wave_vector(x, y, size, inputs.length_scale);
        let k_length = k.length();
        if in_band(k_length, inputs) {
            WaveData {
                kx: k.x,
                inv_k: 1.0 / k_length,
                kz: k.y,
                omega: frequency(k_length, inputs.gravity, inputs.depth),
            }
        } else {
            WaveData {
                kx: k.x,
                inv_k: 1.0,
                kz: k.y,
                omega: 0.0,
            }
        }
    })
}

/// One-sided amplitudes `h0_k = ξ * sqrt(2 S |dω/dk| / k Δk²)`, zero outside the band
pub fn initial_spectrum(noise: &Grid<Complex32>, inputs: &SpectrumInputs) -> Grid<Complex32> {
    let size = noise.size();
    let delta_k = 2.0 * PI / inputs.length_scale;
    Grid::from_fn(size, |x, y| {
        let k = wave_vector(x, y, size, inputs.length_scale);
        let k_length = k.length();
        if !in_band(k_length, inputs) {
            return Complex32::new(0.0, 0.0);
        }
        let omega = frequency(k_length, inputs.gravity, inputs.depth);
        let d_omega_dk = frequency_derivative(k_length, inputs.gravity, inputs.depth);
        let spectrum = directional_spectrum(k, omega, inputs);
        let amplitude =
            (2.0 * spectrum * d_omega_dk.abs() / k_length * delta_k * delta_k).sqrt();
        if amplitude.is_finite() {
            noise.get(x, y) * amplitude
        } else {
            Complex32::new(0.0, 0.0)
        }
    })
}

/// Pair every `h0(k)` with `conj(h0(-k))`
pub fn conjugated_spectrum(h0_k: &Grid<Complex32>) -> Grid<SpectrumTexel> {
    let size = h0_k.size();
    Grid::from_fn(size, |x, y| SpectrumTexel {
        h0: h0_k.get(x, y),
        h0_minus_k_conj: h0_k.get((size - x) % size, (size - y) % size).conj(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DisplaySpectrumSettings, WaveSettings};

    fn inputs(length_scale: f32, settings: &WaveSettings) -> SpectrumInputs {
        SpectrumInputs {
            length_scale,
            cutoff_low: 0.0001,
            cutoff_high: 9999.0,
            gravity: settings.gravity,
            depth: settings.depth,
            components: settings.spectrum_settings(),
        }
    }

    #[test]
    fn test_noise_is_deterministic_and_roughly_normal() {
        let a = gaussian_noise(64, 42);
        let b = gaussian_noise(64, 42);
        assert_eq!(a, b);
        assert_ne!(a, gaussian_noise(64, 43));

        let n = a.as_slice().len() as f32;
        let mean: f32 = a.as_slice().iter().map(|c| c.re).sum::<f32>() / n;
        let var: f32 = a.as_slice().iter().map(|c| (c.re - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 0.1, "mean {mean}");
        assert!((var - 1.0).abs() < 0.15, "variance {var}");
    }

    #[test]
    fn test_noise_fills_every_texel() {
        let noise = gaussian_noise(16, 7);
        assert_eq!(noise.size(), 16);
        assert_eq!(noise.as_slice().len(), 256);
        assert!(noise
            .as_slice()
            .iter()
            .all(|c| c.re.is_finite() && c.im.is_finite() && *c != Complex32::new(0.0, 0.0)));
        // Row-major order follows the draw order of the seeded stream
        assert_eq!(gaussian_noise(4, 7).get(0, 0), noise.get(0, 0));
    }

    #[test]
    fn test_dispersion_deep_water_limit() {
        // tanh saturates: ω ≈ sqrt(g k)
        let omega = frequency(0.5, 9.81, 500.0);
        assert!((omega - (9.81f32 * 0.5).sqrt()).abs() < 1e-5);
        // Group velocity is half the phase velocity in deep water
        let d = frequency_derivative(0.5, 9.81, 500.0);
        assert!((d - 0.5 * omega / 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_wave_vector_centred() {
        let k = wave_vector(4, 4, 8, 10.0);
        assert_eq!(k, Vec2::ZERO);
        let k = wave_vector(5, 3, 8, 10.0);
        let dk = 2.0 * PI / 10.0;
        assert!((k.x - dk).abs() < 1e-6 && (k.y + dk).abs() < 1e-6);
    }

    #[test]
    fn test_band_limits_zero_outside() {
        let settings = WaveSettings::default();
        let mut inputs = inputs(100.0, &settings);
        inputs.cutoff_low = 0.5;
        inputs.cutoff_high = 1.0;
        let noise = gaussian_noise(32, 1);
        let h0k = initial_spectrum(&noise, &inputs);
        let data = precompute_wave_data(32, &inputs);

        for y in 0..32 {
            for x in 0..32 {
                let k = wave_vector(x, y, 32, 100.0).length();
                if k < 0.5 || k > 1.0 {
                    assert_eq!(h0k.get(x, y), Complex32::new(0.0, 0.0));
                    assert_eq!(data.get(x, y).omega, 0.0);
                    assert_eq!(data.get(x, y).inv_k, 1.0);
                } else {
                    assert!(data.get(x, y).omega > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_hermitian_pairs() {
        let settings = WaveSettings::default();
        let inputs = inputs(50.0, &settings);
        let h0k = initial_spectrum(&gaussian_noise(16, 9), &inputs);
        let h0 = conjugated_spectrum(&h0k);
        for y in 0..16 {
            for x in 0..16 {
                let mirrored = h0.get((16 - x) % 16, (16 - y) % 16);
                assert_eq!(h0.get(x, y).h0_minus_k_conj, mirrored.h0.conj());
            }
        }
    }

    #[test]
    fn test_calm_sea_has_no_energy() {
        let settings = WaveSettings {
            local: DisplaySpectrumSettings {
                wind_speed: 0.0,
                ..Default::default()
            },
            swell: DisplaySpectrumSettings::calm(),
            ..Default::default()
        };
        let inputs = inputs(20.0, &settings);
        let h0k = initial_spectrum(&gaussian_noise(8, 3), &inputs);
        assert!(h0k.as_slice().iter().all(|c| *c == Complex32::new(0.0, 0.0)));
    }

    #[test]
    fn test_spectrum_peaks_downwind() {
        let settings = WaveSettings {
            swell: DisplaySpectrumSettings::calm(),
            local: DisplaySpectrumSettings {
                wind_direction_deg: 0.0,
                spread_blend: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let inputs = inputs(250.0, &settings);
        let k = 0.1;
        let omega = frequency(k, inputs.gravity, inputs.depth);
        let downwind = directional_spectrum(Vec2::new(k, 0.0), omega, &inputs);
        let crosswind = directional_spectrum(Vec2::new(0.0, k), omega, &inputs);
        assert!(downwind > crosswind);
        assert!(downwind.is_finite() && downwind > 0.0);
    }
}
