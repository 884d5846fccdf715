//! Run configuration.

use crate::error::{configuration_error, Result};

/// Matrix dimension used when none is given.
pub const DEFAULT_DIMENSION: usize = 7;

/// Rank that owns the full matrices and receives the result.
pub const COORDINATOR_RANK: usize = 0;

/// Shape of one distributed multiplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Matrices are `dimension x dimension`.
    pub dimension: usize,
    /// Size of the worker group, coordinator included.
    pub workers: usize,
}

impl RunConfig {
    pub fn new(dimension: usize, workers: usize) -> Self {
        Self { dimension, workers }
    }

    /// Default dimension over as many workers as the machine has CPUs.
    pub fn with_available_workers(dimension: usize) -> Self {
        Self::new(dimension, available_workers())
    }

    /// Rejects empty matrices and empty groups before anything is
    /// distributed.
    pub fn validate(&self) -> Result<()> {
        if self.dimension < 1 {
            return Err(configuration_error(
                self.dimension,
                self.workers,
                "matrix dimension must be at least 1",
            ));
        }
        if self.workers < 1 {
            return Err(configuration_error(
                self.dimension,
                self.workers,
                "worker count must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::with_available_workers(DEFAULT_DIMENSION)
    }
}

/// Number of workers the launch environment offers, at least one.
pub fn available_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.dimension, DEFAULT_DIMENSION);
        assert!(config.workers >= 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(matches!(
            RunConfig::new(0, 2).validate(),
            Err(Error::Configuration { dimension: 0, .. })
        ));
        assert!(matches!(
            RunConfig::new(2, 0).validate(),
            Err(Error::Configuration { workers: 0, .. })
        ));
    }
}
