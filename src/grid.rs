//! Square 2D buffers used as textures by the compute kernels.
//!
//! Storage is row-major: texel `(x, y)` lives at `y * size + x`. Kernels are
//! dispatched row-parallel through rayon.

use rayon::prelude::*;

/// Square, power-of-two sized 2D buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Copy + Send + Sync> Grid<T> {
    /// Create a grid filled with `value`
    pub fn new(size: usize, value: T) -> Self {
        Self {
            size,
            data: vec![value; size * size],
        }
    }

    /// Create a grid by evaluating `f(x, y)` for every texel (in parallel)
    pub fn from_fn<F>(size: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> T + Sync,
    {
        let data = (0..size * size)
            .into_par_iter()
            .map(|i| f(i % size, i / size))
            .collect();
        Self { size, data }
    }

    /// Wrap an existing row-major buffer
    pub fn from_vec(size: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == size * size).then_some(Self { size, data })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.index(x, y)]
    }

    /// Texel with repeat addressing on both axes
    #[inline]
    pub fn get_wrapped(&self, x: i64, y: i64) -> T {
        let n = self.size as i64;
        self.get(x.rem_euclid(n) as usize, y.rem_euclid(n) as usize)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Row `y` as a slice
    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.size..(y + 1) * self.size]
    }

    /// Overwrite this grid with another of the same size
    pub fn copy_from(&mut self, other: &Grid<T>) {
        debug_assert_eq!(self.size, other.size);
        self.data.copy_from_slice(&other.data);
    }

    /// Run `kernel(y, row)` on every row in parallel
    pub fn par_rows_mut<F>(&mut self, kernel: F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        self.data
            .par_chunks_mut(self.size)
            .enumerate()
            .for_each(|(y, row)| kernel(y, row));
    }

    /// Run `kernel(x, y, texel)` on every texel in parallel
    pub fn par_texels_mut<F>(&mut self, kernel: F)
    where
        F: Fn(usize, usize, &mut T) + Sync + Send,
    {
        self.par_rows_mut(|y, row| {
            for (x, texel) in row.iter_mut().enumerate() {
                kernel(x, y, texel);
            }
        });
    }
}
