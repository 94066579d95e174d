//! Radix-2 2D FFT over square power-of-two grids.
//!
//! The butterfly structure is the self-sorting (Stockham) form: every stage
//! reads two natural-order inputs and writes natural-order output, so no
//! bit-reversal permutation pass is needed. The index/twiddle table is
//! computed once per size and shared by forward and inverse transforms.

use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

use crate::error::OceanError;
use crate::grid::Grid;

/// One butterfly: `out = in[a] + twiddle * in[b]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Butterfly {
    pub twiddle: Complex32,
    pub a: u32,
    pub b: u32,
}

/// Precomputed twiddle factors and input indices, `log2(size)` stages × `size` rows
#[derive(Debug, Clone)]
pub struct TwiddleTable {
    size: usize,
    stages: usize,
    entries: Vec<Butterfly>,
}

impl TwiddleTable {
    /// Build the table for `size`
    ///
    /// For stage `s` and row `y < size / 2` with block size `b = size >> (s + 1)`:
    /// `a = (2b * (y / b) + y % b) % size`, partner `a + b`, twiddle
    /// `exp(-2πi * b * (y / b) / size)`. Row `y + size / 2` uses the same
    /// operands with the negated twiddle. Size 1 has no stages and
    /// transforms as the identity.
    pub fn precompute(size: usize) -> Result<Self, OceanError> {
        if !size.is_power_of_two() {
            return Err(OceanError::NonPowerOfTwo(size));
        }
        let stages = size.trailing_zeros() as usize;
        let half = size / 2;
        let mut entries = vec![
            Butterfly {
                twiddle: Complex32::new(0.0, 0.0),
                a: 0,
                b: 0,
            };
            stages * size
        ];

        for stage in 0..stages {
            let block = size >> (stage + 1);
            for y in 0..half {
                let group = y / block;
                let a = (2 * block * group + y % block) % size;
                let angle = -2.0 * PI / size as f32 * (block * group) as f32;
                let twiddle = Complex32::new(angle.cos(), angle.sin());

                entries[stage * size + y] = Butterfly {
                    twiddle,
                    a: a as u32,
                    b: (a + block) as u32,
                };
                entries[stage * size + y + half] = Butterfly {
                    twiddle: -twiddle,
                    a: a as u32,
                    b: (a + block) as u32,
                };
            }
        }

        Ok(Self {
            size,
            stages,
            entries,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of butterfly stages per axis (`log2(size)`)
    pub fn stages(&self) -> usize {
        self.stages
    }

    #[inline]
    pub fn entry(&self, stage: usize, row: usize) -> Butterfly {
        self.entries[stage * self.size + row]
    }
}

/// Which of the two buffers holds the latest result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingPong {
    Input,
    Scratch,
}

impl PingPong {
    /// Borrow the buffer this value points at
    pub fn select<'a, T>(self, input: &'a Grid<T>, scratch: &'a Grid<T>) -> &'a Grid<T> {
        match self {
            Self::Input => input,
            Self::Scratch => scratch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// 2D FFT engine bound to one grid size
#[derive(Debug, Clone)]
pub struct Fft {
    table: TwiddleTable,
}

impl Fft {
    pub fn new(size: usize) -> Result<Self, OceanError> {
        Ok(Self {
            table: TwiddleTable::precompute(size)?,
        })
    }

    pub fn size(&self) -> usize {
        self.table.size
    }

    pub fn table(&self) -> &TwiddleTable {
        &self.table
    }

    /// Forward 2D transform
    ///
    /// Returns the buffer holding the result. With `output_to_input` the
    /// result is guaranteed to end up in `input`.
    pub fn fft_2d(
        &self,
        input: &mut Grid<Complex32>,
        scratch: &mut Grid<Complex32>,
        output_to_input: bool,
    ) -> Result<PingPong, OceanError> {
        self.transform(input, scratch, output_to_input, false)
    }

    /// Inverse 2D transform using conjugated twiddles
    ///
    /// `scale` divides by `size²`; `permute` then multiplies texel `(x, y)`
    /// by `(-1)^(x + y)` to re-centre the zero frequency.
    pub fn inverse_fft_2d(
        &self,
        input: &mut Grid<Complex32>,
        scratch: &mut Grid<Complex32>,
        output_to_input: bool,
        scale: bool,
        permute: bool,
    ) -> Result<PingPong, OceanError> {
        let result = self.transform(input, scratch, output_to_input, true)?;
        let target = match result {
            PingPong::Input => input,
            PingPong::Scratch => scratch,
        };

        if scale {
            let norm = 1.0 / (self.table.size * self.table.size) as f32;
            target.par_texels_mut(|_, _, c| *c *= norm);
        }
        if permute {
            target.par_texels_mut(|x, y, c| {
                if (x + y) % 2 == 1 {
                    *c = -*c;
                }
            });
        }
        Ok(result)
    }

    fn transform(
        &self,
        input: &mut Grid<Complex32>,
        scratch: &mut Grid<Complex32>,
        output_to_input: bool,
        inverse: bool,
    ) -> Result<PingPong, OceanError> {
        for grid in [&*input, &*scratch] {
            if grid.size() != self.table.size {
                return Err(OceanError::SizeMismatch {
                    expected: self.table.size,
                    actual: grid.size(),
                });
            }
        }

        let mut current = PingPong::Input;
        for axis in [Axis::Horizontal, Axis::Vertical] {
            for stage in 0..self.table.stages {
                current = match current {
                    PingPong::Input => {
                        self.pass(axis, stage, inverse, input, scratch);
                        PingPong::Scratch
                    }
                    PingPong::Scratch => {
                        self.pass(axis, stage, inverse, scratch, input);
                        PingPong::Input
                    }
                };
            }
        }

        if output_to_input && current == PingPong::Scratch {
            input.copy_from(scratch);
            current = PingPong::Input;
        }
        Ok(current)
    }

    fn pass(
        &self,
        axis: Axis,
        stage: usize,
        inverse: bool,
        src: &Grid<Complex32>,
        dst: &mut Grid<Complex32>,
    ) {
        let table = &self.table;
        let twiddle = |b: Butterfly| {
            if inverse {
                b.twiddle.conj()
            } else {
                b.twiddle
            }
        };

        match axis {
            Axis::Horizontal => dst.par_rows_mut(|y, row| {
                let src_row = src.row(y);
                for (x, out) in row.iter_mut().enumerate() {
                    let b = table.entry(stage, x);
                    *out = src_row[b.a as usize] + twiddle(b) * src_row[b.b as usize];
                }
            }),
            Axis::Vertical => dst.par_rows_mut(|y, row| {
                let b = table.entry(stage, y);
                let w = twiddle(b);
                let row_a = src.row(b.a as usize);
                let row_b = src.row(b.b as usize);
                for (x, out) in row.iter_mut().enumerate() {
                    *out = row_a[x] + w * row_b[x];
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rustfft::FftPlanner;

    fn reference_fft_2d(grid: &Grid<Complex32>) -> Vec<Complex32> {
        let n = grid.size();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let mut data = grid.as_slice().to_vec();

        for row in data.chunks_mut(n) {
            fft.process(row);
        }
        for x in 0..n {
            let mut column: Vec<Complex32> = (0..n).map(|y| data[y * n + x]).collect();
            fft.process(&mut column);
            for (y, value) in column.into_iter().enumerate() {
                data[y * n + x] = value;
            }
        }
        data
    }

    fn test_grid(n: usize) -> Grid<Complex32> {
        Grid::from_fn(n, |x, y| {
            let t = (x * 7 + y * 13) as f32;
            Complex32::new((t * 0.37).sin(), (t * 0.11).cos() - 0.5)
        })
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(matches!(
            TwiddleTable::precompute(12),
            Err(OceanError::NonPowerOfTwo(12))
        ));
        assert!(TwiddleTable::precompute(0).is_err());
    }

    #[test]
    fn test_size_one_is_identity() {
        let table = TwiddleTable::precompute(1).unwrap();
        assert_eq!(table.stages(), 0);

        let fft = Fft::new(1).unwrap();
        let value = Complex32::new(0.5, -2.0);
        let mut input = Grid::new(1, value);
        let mut scratch = Grid::new(1, Complex32::new(0.0, 0.0));
        assert_eq!(
            fft.fft_2d(&mut input, &mut scratch, false).unwrap(),
            PingPong::Input
        );
        assert_eq!(input.get(0, 0), value);
        fft.inverse_fft_2d(&mut input, &mut scratch, true, true, true)
            .unwrap();
        assert_eq!(input.get(0, 0), value);
    }

    #[test]
    fn test_grid_size_mismatch_is_an_error() {
        let fft = Fft::new(8).unwrap();
        let mut input = Grid::new(4, Complex32::new(1.0, 0.0));
        let mut scratch = Grid::new(8, Complex32::new(0.0, 0.0));
        assert!(matches!(
            fft.fft_2d(&mut input, &mut scratch, true),
            Err(OceanError::SizeMismatch {
                expected: 8,
                actual: 4
            })
        ));

        let mut input = Grid::new(8, Complex32::new(1.0, 0.0));
        let mut scratch = Grid::new(16, Complex32::new(0.0, 0.0));
        assert!(matches!(
            fft.inverse_fft_2d(&mut input, &mut scratch, true, false, true),
            Err(OceanError::SizeMismatch {
                expected: 8,
                actual: 16
            })
        ));
        // Nothing was written before the check failed
        assert!(input.as_slice().iter().all(|c| *c == Complex32::new(1.0, 0.0)));
    }

    #[test]
    fn test_table_indices_size_4() {
        let table = TwiddleTable::precompute(4).unwrap();
        assert_eq!(table.stages(), 2);

        // Stage 0: block 2, pairs (0,2) and (1,3), unit twiddles
        let e = table.entry(0, 1);
        assert_eq!((e.a, e.b), (1, 3));
        assert!((e.twiddle - Complex32::new(1.0, 0.0)).norm() < 1e-6);
        let mirrored = table.entry(0, 3);
        assert_eq!((mirrored.a, mirrored.b), (1, 3));
        assert!((mirrored.twiddle - Complex32::new(-1.0, 0.0)).norm() < 1e-6);

        // Stage 1: block 1, row 1 pairs (2,3) with -i
        let e = table.entry(1, 1);
        assert_eq!((e.a, e.b), (2, 3));
        assert!((e.twiddle - Complex32::new(0.0, -1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_forward_matches_reference() {
        for n in [2usize, 4, 16, 32] {
            let mut input = test_grid(n);
            let expected = reference_fft_2d(&input);
            let mut scratch = Grid::new(n, Complex32::new(0.0, 0.0));
            let fft = Fft::new(n).unwrap();

            let result = fft.fft_2d(&mut input, &mut scratch, true).unwrap();
            assert_eq!(result, PingPong::Input);

            for (got, want) in input.as_slice().iter().zip(&expected) {
                assert!((got - want).norm() < 1e-3, "n={n}: {got} vs {want}");
            }
        }
    }

    #[test]
    fn test_inverse_without_scale_is_unnormalised() {
        let n = 8;
        let mut input = Grid::new(n, Complex32::new(0.0, 0.0));
        input.set(0, 0, Complex32::new(1.0, 0.0));
        let mut scratch = input.clone();
        let fft = Fft::new(n).unwrap();

        fft.inverse_fft_2d(&mut input, &mut scratch, true, false, false)
            .unwrap();
        for c in input.as_slice() {
            assert!((c - Complex32::new(1.0, 0.0)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_permute_checkerboard() {
        let n = 4;
        // Impulse at the centred origin (n/2, n/2) becomes a constant field after permute
        let mut input = Grid::new(n, Complex32::new(0.0, 0.0));
        input.set(n / 2, n / 2, Complex32::new(1.0, 0.0));
        let mut scratch = input.clone();
        let fft = Fft::new(n).unwrap();

        fft.inverse_fft_2d(&mut input, &mut scratch, true, false, true)
            .unwrap();
        for c in input.as_slice() {
            assert!((c - Complex32::new(1.0, 0.0)).norm() < 1e-5, "{c}");
        }
    }

    #[test]
    fn test_select_result_buffer() {
        let n = 4;
        let mut input = test_grid(n);
        let mut scratch = Grid::new(n, Complex32::new(0.0, 0.0));
        let fft = Fft::new(n).unwrap();
        let which = fft.fft_2d(&mut input, &mut scratch, false).unwrap();
        let expected = reference_fft_2d(&test_grid(n));
        let result = which.select(&input, &scratch);
        for (got, want) in result.as_slice().iter().zip(&expected) {
            assert!((got - want).norm() < 1e-4);
        }
    }

    proptest! {
        #[test]
        fn fft_round_trip_reconstructs_input(
            values in proptest::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 64)
        ) {
            let n = 8;
            let data: Vec<Complex32> = values.iter().map(|&(re, im)| Complex32::new(re, im)).collect();
            let original = Grid::from_vec(n, data).unwrap();
            let mut input = original.clone();
            let mut scratch = Grid::new(n, Complex32::new(0.0, 0.0));
            let fft = Fft::new(n).unwrap();

            fft.fft_2d(&mut input, &mut scratch, true).unwrap();
            fft.inverse_fft_2d(&mut input, &mut scratch, true, true, false).unwrap();

            let peak = original.as_slice().iter().map(|c| c.norm()).fold(1.0f32, f32::max);
            for (got, want) in input.as_slice().iter().zip(original.as_slice()) {
                prop_assert!((got - want).norm() <= 1e-4 * peak + 1e-5, "{} vs {}", got, want);
            }
        }
    }
}
