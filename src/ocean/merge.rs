//! Cascade compositing: inverse FFT of the derivative spectra and merge into
//! displacement, slope and foam fields.

use glam::{Vec3, Vec4};
use rustfft::num_complex::Complex32;
use std::ops::{Add, Mul};

use crate::error::OceanError;
use crate::grid::Grid;
use crate::params::FoamSettings;

use super::evolve::DerivativeFields;
use super::fft::Fft;

/// Spatial-domain fields sampled by shading and physics
#[derive(Debug, Clone)]
pub struct CascadeOutputs {
    /// `(λ Dx, Dy, λ Dz)` per texel
    pub displacement: Grid<Vec3>,
    /// `(Dyx, Dyz, λ Dxx, λ Dzz)` per texel
    pub derivatives: Grid<Vec4>,
    /// Accumulated foam intensity in `[0, 1]`
    pub turbulence: Grid<f32>,
    /// Box-filtered chain below `derivatives`, halving down to 1×1
    pub derivative_mips: Vec<Grid<Vec4>>,
    /// Box-filtered chain below `turbulence`
    pub turbulence_mips: Vec<Grid<f32>>,
}

impl CascadeOutputs {
    pub fn new(size: usize) -> Self {
        Self {
            displacement: Grid::new(size, Vec3::ZERO),
            derivatives: Grid::new(size, Vec4::ZERO),
            turbulence: Grid::new(size, 0.0),
            derivative_mips: Vec::new(),
            turbulence_mips: Vec::new(),
        }
    }
}

/// Inverse-transform all four spectra in place (permuted, unscaled)
pub fn inverse_transform(
    fft: &Fft,
    fields: &mut DerivativeFields,
    scratch: &mut Grid<Complex32>,
) -> Result<(), OceanError> {
    for buffer in fields.buffers_mut() {
        fft.inverse_fft_2d(buffer, scratch, true, false, true)?;
    }
    Ok(())
}

/// Surface Jacobian from horizontal displacement derivatives
///
/// Values below zero mean the surface folds over itself.
#[inline]
pub fn jacobian(lambda: f32, dxx: f32, dzz: f32, dxz: f32) -> f32 {
    (1.0 + lambda * dxx) * (1.0 + lambda * dzz) - lambda * lambda * dxz * dxz
}

/// Integrate foam: exponential decay plus growth under compression
#[inline]
pub fn integrate_foam(previous: f32, jacobian: f32, delta_time: f32, foam: &FoamSettings) -> f32 {
    let decay = if foam.half_life_s > 0.0 {
        0.5f32.powf(delta_time.max(0.0) / foam.half_life_s)
    } else {
        0.0
    };
    let compression = (foam.jacobian_threshold - jacobian).max(0.0);
    (previous * decay + foam.growth_rate * compression * delta_time.max(0.0)).clamp(0.0, 1.0)
}

/// Merge spatial-domain buffers into the cascade output fields
pub fn merge(
    fields: &DerivativeFields,
    lambda: f32,
    delta_time: f32,
    foam: &FoamSettings,
    outputs: &mut CascadeOutputs,
) {
    outputs.displacement.par_texels_mut(|x, y, d| {
        let dx_dz = fields.dx_dz.get(x, y);
        let dy_dxz = fields.dy_dxz.get(x, y);
        *d = Vec3::new(lambda * dx_dz.re, dy_dxz.re, lambda * dx_dz.im);
    });

    outputs.derivatives.par_texels_mut(|x, y, d| {
        let dyx_dyz = fields.dyx_dyz.get(x, y);
        let dxx_dzz = fields.dxx_dzz.get(x, y);
        *d = Vec4::new(
            dyx_dyz.re,
            dyx_dyz.im,
            lambda * dxx_dzz.re,
            lambda * dxx_dzz.im,
        );
    });

    outputs.turbulence.par_texels_mut(|x, y, t| {
        let dxx_dzz = fields.dxx_dzz.get(x, y);
        let dxz = fields.dy_dxz.get(x, y).im;
        let j = jacobian(lambda, dxx_dzz.re, dxx_dzz.im, dxz);
        *t = integrate_foam(*t, j, delta_time, foam);
    });

    build_mips(&outputs.derivatives, &mut outputs.derivative_mips);
    build_mips(&outputs.turbulence, &mut outputs.turbulence_mips);
}

/// Refresh the 2×2 box-filtered mip chain below `base`
///
/// Levels already in `levels` are reused when their sizes match; the chain
/// is only reallocated when the base size changes.
pub fn build_mips<T>(base: &Grid<T>, levels: &mut Vec<Grid<T>>)
where
    T: Copy + Send + Sync + Add<Output = T> + Mul<f32, Output = T>,
{
    let count = base.size().trailing_zeros() as usize;
    let reusable = levels.len() == count
        && levels
            .iter()
            .enumerate()
            .all(|(i, level)| level.size() == base.size() >> (i + 1));
    if !reusable {
        levels.clear();
        levels.extend((1..=count).map(|i| Grid::new(base.size() >> i, base.get(0, 0))));
    }

    for i in 0..levels.len() {
        let (coarser, finer) = levels.split_at_mut(i);
        let source = coarser.last().unwrap_or(base);
        finer[0].par_texels_mut(|x, y, texel| {
            *texel = (source.get(2 * x, 2 * y)
                + source.get(2 * x + 1, 2 * y)
                + source.get(2 * x, 2 * y + 1)
                + source.get(2 * x + 1, 2 * y + 1))
                * 0.25;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_surface_jacobian_is_one() {
        assert_eq!(jacobian(0.8, 0.0, 0.0, 0.0), 1.0);
        assert!(jacobian(1.0, -1.5, 0.0, 0.0) < 0.0);
    }

    #[test]
    fn test_foam_decays_with_half_life() {
        let foam = FoamSettings {
            half_life_s: 2.0,
            growth_rate: 1.0,
            jacobian_threshold: 0.0,
        };
        let value = integrate_foam(0.8, 1.0, 2.0, &foam);
        assert!((value - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_foam_grows_under_compression_and_clamps() {
        let foam = FoamSettings::default();
        let grown = integrate_foam(0.0, -0.5, 0.1, &foam);
        assert!(grown > 0.0);
        let saturated = integrate_foam(0.9, -10.0, 1.0, &foam);
        assert_eq!(saturated, 1.0);
    }

    #[test]
    fn test_foam_accumulates_over_frames() {
        let foam = FoamSettings::default();
        let mut value = 0.0;
        let mut history = Vec::new();
        for _ in 0..5 {
            value = integrate_foam(value, -0.2, 1.0 / 60.0, &foam);
            history.push(value);
        }
        assert!(history.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_mip_chain() {
        let base = Grid::from_fn(4, |x, y| (x + 4 * y) as f32);
        let mut mips = Vec::new();
        build_mips(&base, &mut mips);
        assert_eq!(mips.len(), 2);
        assert_eq!(mips[0].size(), 2);
        assert_eq!(mips[0].get(0, 0), (0.0 + 1.0 + 4.0 + 5.0) / 4.0);
        assert_eq!(mips[1].size(), 1);
        assert_eq!(mips[1].get(0, 0), 7.5);
    }

    #[test]
    fn test_mip_chain_reuses_levels() {
        let mut mips = Vec::new();
        build_mips(&Grid::new(8, 1.0f32), &mut mips);
        let first_level = mips[0].as_slice().as_ptr();

        build_mips(&Grid::new(8, 3.0f32), &mut mips);
        assert_eq!(mips.len(), 3);
        assert_eq!(mips[0].as_slice().as_ptr(), first_level);
        assert!(mips.iter().all(|m| m.as_slice().iter().all(|v| *v == 3.0)));

        // A different base size rebuilds the chain
        build_mips(&Grid::new(4, 2.0f32), &mut mips);
        assert_eq!(mips.len(), 2);
        assert_eq!(mips[1].size(), 1);
        assert_eq!(mips[1].get(0, 0), 2.0);
    }

    #[test]
    fn test_size_one_has_no_mips() {
        let mut mips = vec![Grid::new(2, 0.0f32)];
        build_mips(&Grid::new(1, 5.0f32), &mut mips);
        assert!(mips.is_empty());
    }

    #[test]
    fn test_merge_applies_lambda() {
        let size = 2;
        let mut fields = DerivativeFields::zeroed(size);
        fields.dx_dz = Grid::new(size, Complex32::new(1.0, -2.0));
        fields.dy_dxz = Grid::new(size, Complex32::new(3.0, 0.0));
        fields.dxx_dzz = Grid::new(size, Complex32::new(0.5, 0.25));
        let mut outputs = CascadeOutputs::new(size);

        merge(&fields, 0.5, 0.016, &FoamSettings::default(), &mut outputs);
        assert_eq!(outputs.displacement.get(1, 1), Vec3::new(0.5, 3.0, -1.0));
        assert_eq!(outputs.derivatives.get(0, 1), Vec4::new(0.0, 0.0, 0.25, 0.125));
        assert_eq!(outputs.turbulence.get(0, 0), 0.0);
        assert_eq!(outputs.derivative_mips.len(), 1);
    }
}
