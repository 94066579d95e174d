//! Time evolution of the frequency-domain spectrum.
//!
//! Each output buffer packs two real spatial fields as `A + iB`; after the
//! inverse FFT the real part holds `A` and the imaginary part holds `B`.

use rayon::prelude::*;
use rustfft::num_complex::Complex32;

use crate::grid::Grid;

use super::spectrum::{SpectrumTexel, WaveData};

/// Four packed frequency-domain fields produced per frame
#[derive(Debug, Clone)]
pub struct DerivativeFields {
    /// Horizontal displacement `Dx + i Dz`
    pub dx_dz: Grid<Complex32>,
    /// Height and cross derivative `Dy + i Dxz`
    pub dy_dxz: Grid<Complex32>,
    /// Height slopes `Dyx + i Dyz`
    pub dyx_dyz: Grid<Complex32>,
    /// Horizontal displacement derivatives `Dxx + i Dzz`
    pub dxx_dzz: Grid<Complex32>,
}

impl DerivativeFields {
    pub fn zeroed(size: usize) -> Self {
        let zero = Grid::new(size, Complex32::new(0.0, 0.0));
        Self {
            dx_dz: zero.clone(),
            dy_dxz: zero.clone(),
            dyx_dyz: zero.clone(),
            dxx_dzz: zero,
        }
    }

    /// Mutable access to all four buffers, in a fixed order
    pub fn buffers_mut(&mut self) -> [&mut Grid<Complex32>; 4] {
        [
            &mut self.dx_dz,
            &mut self.dy_dxz,
            &mut self.dyx_dyz,
            &mut self.dxx_dzz,
        ]
    }
}

/// `h(k, t) = h0(k) e^{iωt} + conj(h0(-k)) e^{-iωt}`
#[inline]
pub fn amplitude_at(texel: &SpectrumTexel, omega: f32, time: f32) -> Complex32 {
    let phase = omega * time;
    let exponent = Complex32::new(phase.cos(), phase.sin());
    texel.h0 * exponent + texel.h0_minus_k_conj * exponent.conj()
}

/// Evaluate all four derivative spectra of one texel at `time`
#[inline]
pub fn evolve_texel(texel: &SpectrumTexel, wave: &WaveData, time: f32) -> [Complex32; 4] {
    let h = amplitude_at(texel, wave.omega, time);
    let ih = Complex32::new(-h.im, h.re);

    let displacement_x = ih * wave.kx * wave.inv_k;
    let displacement_y = h;
    let displacement_z = ih * wave.kz * wave.inv_k;
    let displacement_x_dx = -h * wave.kx * wave.kx * wave.inv_k;
    let displacement_y_dx = ih * wave.kx;
    let displacement_z_dx = -h * wave.kx * wave.kz * wave.inv_k;
    let displacement_y_dz = ih * wave.kz;
    let displacement_z_dz = -h * wave.kz * wave.kz * wave.inv_k;

    [
        pack(displacement_x, displacement_z),
        pack(displacement_y, displacement_z_dx),
        pack(displacement_y_dx, displacement_y_dz),
        pack(displacement_x_dx, displacement_z_dz),
    ]
}

/// `a + i b` for two spectra of real fields
#[inline]
fn pack(a: Complex32, b: Complex32) -> Complex32 {
    Complex32::new(a.re - b.im, a.im + b.re)
}

/// Advance the whole spectrum to `time`, overwriting `out`
pub fn evolve(
    spectrum: &Grid<SpectrumTexel>,
    waves: &Grid<WaveData>,
    time: f32,
    out: &mut DerivativeFields,
) {
    let size = spectrum.size();
    let [dx_dz, dy_dxz, dyx_dyz, dxx_dzz] = out.buffers_mut();
    dx_dz
        .as_mut_slice()
        .par_chunks_mut(size)
        .zip(dy_dxz.as_mut_slice().par_chunks_mut(size))
        .zip(dyx_dyz.as_mut_slice().par_chunks_mut(size))
        .zip(dxx_dzz.as_mut_slice().par_chunks_mut(size))
        .enumerate()
        .for_each(|(y, (((row_0, row_1), row_2), row_3))| {
            let spectrum_row = spectrum.row(y);
            let wave_row = waves.row(y);
            for x in 0..size {
                let [a, b, c, d] = evolve_texel(&spectrum_row[x], &wave_row[x], time);
                row_0[x] = a;
                row_1[x] = b;
                row_2[x] = c;
                row_3[x] = d;
            }
        });
}
