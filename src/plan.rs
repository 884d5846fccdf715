//! Row partitioning of an `n x n` matrix across a fixed group of workers.
//!
//! Rows are dealt out in contiguous runs. With `base = n / w` and
//! `remainder = n % w`, ranks `0..remainder` receive `base + 1` rows and all
//! other ranks receive `base` rows, so no two workers differ by more than one
//! row. When `w > n` the trailing ranks receive nothing.
//!
//! Counts and offsets are expressed in *elements*, not rows, so they can be
//! used directly to slice a row-major buffer.

use std::ops::Range;

use crate::error::{configuration_error, validation_error, Result};

/// The slice of a matrix assigned to one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    /// Number of elements, always a multiple of the dimension.
    pub count: usize,
    /// Index of the first element in the full matrix.
    pub offset: usize,
}

impl PlanEntry {
    /// Element range covered by this entry.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// Per-rank `(count, offset)` pairs for one matrix dimension and group size.
///
/// The same plan drives both the scatter of `A` and the gather of `C`, which
/// is what puts every result row back where its input row came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    dimension: usize,
    entries: Vec<PlanEntry>,
}

impl DistributionPlan {
    /// Plans the distribution of an `dimension x dimension` matrix over
    /// `workers` ranks.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either argument is zero, or if the
    /// matrix does not fit in `usize` elements.
    pub fn new(dimension: usize, workers: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(configuration_error(
                dimension,
                workers,
                "matrix dimension must be at least 1",
            ));
        }
        if workers == 0 {
            return Err(configuration_error(
                dimension,
                workers,
                "worker count must be at least 1",
            ));
        }
        if dimension.checked_mul(dimension).is_none() {
            return Err(configuration_error(
                dimension,
                workers,
                "matrix element count overflows usize",
            ));
        }

        let base = dimension / workers;
        let remainder = dimension % workers;

        let mut entries = Vec::with_capacity(workers);
        let mut offset = 0;
        for rank in 0..workers {
            let rows = base + usize::from(rank < remainder);
            let count = rows * dimension;
            entries.push(PlanEntry { count, offset });
            offset += count;
        }

        Ok(Self { dimension, entries })
    }

    /// Matrix dimension the plan was built for.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of ranks in the plan.
    pub fn workers(&self) -> usize {
        self.entries.len()
    }

    /// Entry for `rank`.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= workers()`.
    pub fn entry(&self, rank: usize) -> PlanEntry {
        self.entries[rank]
    }

    pub fn count(&self, rank: usize) -> usize {
        self.entries[rank].count
    }

    pub fn offset(&self, rank: usize) -> usize {
        self.entries[rank].offset
    }

    /// Number of whole rows assigned to `rank`.
    pub fn rows(&self, rank: usize) -> usize {
        self.entries[rank].count / self.dimension
    }

    /// Global row indices assigned to `rank`.
    pub fn row_range(&self, rank: usize) -> Range<usize> {
        let entry = self.entries[rank];
        let first = entry.offset / self.dimension;
        first..first + entry.count / self.dimension
    }

    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.count).collect()
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.offset).collect()
    }

    /// Iterates over `(rank, entry)` pairs in rank order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, PlanEntry)> + '_ {
        self.entries.iter().copied().enumerate()
    }

    /// Total number of elements covered, `dimension²`.
    pub fn total_elements(&self) -> usize {
        self.dimension * self.dimension
    }

    /// Re-checks the coverage invariants.
    ///
    /// Counts must be multiples of the dimension, each offset must follow
    /// directly from the previous entry, and the counts must add up to the
    /// whole matrix.
    pub fn validate(&self) -> Result<()> {
        let mut expected_offset = 0;
        for (rank, entry) in self.entries() {
            if entry.count % self.dimension != 0 {
                return Err(validation_error(format!(
                    "rank {rank} is assigned {} elements, not a whole number of rows",
                    entry.count
                )));
            }
            if entry.offset != expected_offset {
                return Err(validation_error(format!(
                    "rank {rank} starts at offset {}, expected {expected_offset}",
                    entry.offset
                )));
            }
            expected_offset += entry.count;
        }
        if expected_offset != self.total_elements() {
            return Err(validation_error(format!(
                "plan covers {expected_offset} elements, matrix has {}",
                self.total_elements()
            )));
        }
        Ok(())
    }
}
