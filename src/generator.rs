//! Sources for the initial contents of the input matrices.
//!
//! Anything that maps `(i, j)` to an element is a [`MatrixSource`], so a
//! closure works as well as the named sources below.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{validation_error, Result};
use crate::matrix::{Element, Matrix};

/// Produces the contents of an `n x n` matrix.
pub trait MatrixSource {
    fn generate(&self, dimension: usize) -> Result<Matrix>;
}

impl<F> MatrixSource for F
where
    F: Fn(usize, usize) -> Element,
{
    fn generate(&self, dimension: usize) -> Result<Matrix> {
        Matrix::from_fn(dimension, self)
    }
}

/// `A[i, j] = 4 + i*j + j`, the default left-hand input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultA;

impl DefaultA {
    pub fn value(i: usize, j: usize) -> Element {
        let (i, j) = (i as Element, j as Element);
        4 + i * j + j
    }
}

impl MatrixSource for DefaultA {
    fn generate(&self, dimension: usize) -> Result<Matrix> {
        Matrix::from_fn(dimension, Self::value)
    }
}

/// `B[i, j] = 12 - i*j + i`, the default right-hand input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultB;

impl DefaultB {
    pub fn value(i: usize, j: usize) -> Element {
        let (i, j) = (i as Element, j as Element);
        12 - i * j + i
    }
}

impl MatrixSource for DefaultB {
    fn generate(&self, dimension: usize) -> Result<Matrix> {
        Matrix::from_fn(dimension, Self::value)
    }
}

/// Uniformly random elements in `[low, high]`, reproducible from a seed.
#[derive(Debug, Clone, Copy)]
pub struct RandomSource {
    seed: u64,
    low: Element,
    high: Element,
}

impl RandomSource {
    /// Range used by [`RandomSource::new`].
    pub const DEFAULT_RANGE: (Element, Element) = (-100, 100);

    pub fn new(seed: u64) -> Self {
        let (low, high) = Self::DEFAULT_RANGE;
        Self { seed, low, high }
    }

    /// # Errors
    ///
    /// Returns a validation error if `low > high`.
    pub fn with_range(seed: u64, low: Element, high: Element) -> Result<Self> {
        if low > high {
            return Err(validation_error(format!(
                "random range is empty: {low} > {high}"
            )));
        }
        Ok(Self { seed, low, high })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl MatrixSource for RandomSource {
    fn generate(&self, dimension: usize) -> Result<Matrix> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        Matrix::from_fn(dimension, |_, _| rng.random_range(self.low..=self.high))
    }
}
