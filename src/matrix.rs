//! Square integer matrices in row-major storage.
//!
//! Element `(i, j)` of an `n x n` matrix lives at linear index `i * n + j`.
//! A row block is therefore always a contiguous run of the backing vector,
//! which is what lets the collectives move whole rows as plain slices.

use std::ops::Index;

use crate::error::{try_with_capacity, validation_error, Result};
use crate::kernel::par_multiply_block;

/// Scalar type stored in every matrix.
pub type Element = i64;

/// An owned, square, row-major matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    dimension: usize,
    data: Vec<Element>,
}

/// Calculates the linear index of `(i, j)` in a row-major matrix.
#[inline(always)]
pub fn at(i: usize, j: usize, n: usize) -> usize {
    i * n + j
}

fn element_count(dimension: usize) -> Result<usize> {
    if dimension == 0 {
        return Err(validation_error("matrix dimension must be at least 1"));
    }
    dimension
        .checked_mul(dimension)
        .ok_or_else(|| validation_error(format!("dimension {dimension} overflows usize")))
}

impl Matrix {
    /// Creates an `n x n` matrix filled with zeros.
    pub fn zeros(dimension: usize) -> Result<Self> {
        Self::from_fn(dimension, |_, _| 0)
    }

    /// Creates an `n x n` matrix whose element `(i, j)` is `f(i, j)`.
    ///
    /// Elements are produced in row-major order.
    pub fn from_fn<F>(dimension: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> Element,
    {
        let len = element_count(dimension)?;
        let mut data = try_with_capacity(len)?;
        for i in 0..dimension {
            for j in 0..dimension {
                data.push(f(i, j));
            }
        }
        Ok(Self { dimension, data })
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `data.len() != dimension * dimension`.
    pub fn from_vec(dimension: usize, data: Vec<Element>) -> Result<Self> {
        let len = element_count(dimension)?;
        if data.len() != len {
            return Err(validation_error(format!(
                "a {dimension}x{dimension} matrix needs {len} elements, got {}",
                data.len()
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Number of rows (and columns).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Total number of elements, always `dimension²`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; a matrix has at least one element.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<Element> {
        if i < self.dimension && j < self.dimension {
            Some(self.data[at(i, j, self.dimension)])
        } else {
            None
        }
    }

    /// Returns row `i` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `i >= dimension`.
    pub fn row(&self, i: usize) -> &[Element] {
        let start = at(i, 0, self.dimension);
        &self.data[start..start + self.dimension]
    }

    /// Iterates over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Element]> + '_ {
        self.data.chunks_exact(self.dimension)
    }

    pub fn as_slice(&self) -> &[Element] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<Element> {
        self.data
    }

    /// Computes `self * rhs` directly, without any distribution.
    ///
    /// This is the reference the distributed result must match.
    pub fn product(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.dimension != rhs.dimension {
            return Err(validation_error(format!(
                "cannot multiply a {0}x{0} matrix by a {1}x{1} matrix",
                self.dimension, rhs.dimension
            )));
        }
        let data = par_multiply_block(&self.data, &rhs.data, self.dimension, self.dimension)?;
        Matrix::from_vec(self.dimension, data)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Element;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        assert!(
            i < self.dimension && j < self.dimension,
            "index ({}, {}) out of bounds for a {}x{} matrix",
            i,
            j,
            self.dimension,
            self.dimension
        );
        &self.data[at(i, j, self.dimension)]
    }
}
