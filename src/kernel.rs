//! # Row-Block Multiplication
//!
//! Computes `C_block = A_block * B` where `A_block` is a run of whole rows of
//! an `n x n` matrix and `B` is the full `n x n` right-hand side. Both inputs
//! and the output are row-major. The kernel knows nothing about which rows
//! it was handed; the caller places the result.
//!
//! Two entry points share one contract:
//! - [`multiply_block`]: single-threaded, used by each worker on its own block.
//! - [`par_multiply_block`]: rows computed in parallel with Rayon, used for the
//!   non-distributed reference product.

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::error::{try_with_capacity, validation_error, Result};
use crate::matrix::{at, Element};

/// Minimum number of output elements before [`par_multiply_block`] splits
/// work across threads. Below this the scheduling overhead dominates.
pub const PARALLEL_THRESHOLD: usize = 64 * 64;

fn check_shapes(a_block: &[Element], b: &[Element], n: usize, rows: usize) -> Result<usize> {
    let expected_a = rows
        .checked_mul(n)
        .ok_or_else(|| validation_error("row block size overflows usize"))?;
    if a_block.len() != expected_a {
        return Err(validation_error(format!(
            "row block holds {} elements, expected {} ({} rows of {})",
            a_block.len(),
            expected_a,
            rows,
            n
        )));
    }
    let expected_b = n
        .checked_mul(n)
        .ok_or_else(|| validation_error("matrix size overflows usize"))?;
    if b.len() != expected_b {
        return Err(validation_error(format!(
            "right-hand matrix holds {} elements, expected {}",
            b.len(),
            expected_b
        )));
    }
    Ok(expected_a)
}

/// Computes one output row: `c_row[j] = sum_k a_row[k] * b[k][j]`.
///
/// Iterates `k` in the outer loop so both `b` and `c_row` are walked
/// sequentially.
#[inline(always)]
fn multiply_row(a_row: &[Element], b: &[Element], c_row: &mut [Element], n: usize) {
    c_row.fill(0);
    for (k, &a_ik) in a_row.iter().enumerate() {
        let b_row = &b[at(k, 0, n)..at(k + 1, 0, n)];
        for (c_ij, &b_kj) in c_row.iter_mut().zip(b_row) {
            *c_ij += a_ik * b_kj;
        }
    }
}

/// Multiplies a block of `rows` whole rows against the full matrix `b`.
///
/// # Arguments
///
/// * `a_block` - `rows * n` elements, row-major.
/// * `b` - The full `n x n` right-hand matrix, row-major.
/// * `n` - Matrix dimension.
/// * `rows` - Number of rows in `a_block`; may be zero.
///
/// # Returns
///
/// The `rows * n` product block, row-major. Empty when `rows == 0`.
///
/// # Errors
///
/// A validation error if the slice lengths do not match `rows` and `n`, or
/// an allocation error if the output block cannot be reserved.
pub fn multiply_block(
    a_block: &[Element],
    b: &[Element],
    n: usize,
    rows: usize,
) -> Result<Vec<Element>> {
    let len = check_shapes(a_block, b, n, rows)?;
    let mut c_block = try_with_capacity(len)?;
    c_block.resize(len, 0);

    if rows == 0 {
        return Ok(c_block);
    }

    for (a_row, c_row) in a_block.chunks_exact(n).zip(c_block.chunks_exact_mut(n)) {
        multiply_row(a_row, b, c_row, n);
    }

    Ok(c_block)
}

/// Parallel variant of [`multiply_block`].
///
/// Output rows are independent, so each one is handed to Rayon as its own
/// task. Small blocks fall back to the sequential kernel.
pub fn par_multiply_block(
    a_block: &[Element],
    b: &[Element],
    n: usize,
    rows: usize,
) -> Result<Vec<Element>> {
    let len = check_shapes(a_block, b, n, rows)?;
    if len <= PARALLEL_THRESHOLD {
        return multiply_block(a_block, b, n, rows);
    }

    let mut c_block = try_with_capacity(len)?;
    c_block.resize(len, 0);

    c_block
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(i, c_row)| {
            let a_row = &a_block[at(i, 0, n)..at(i + 1, 0, n)];
            multiply_row(a_row, b, c_row, n);
        });

    Ok(c_block)
}
