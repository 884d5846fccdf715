//! Error types for rowscatter operations.
//!
//! Every error is fatal to the worker group: a worker that hits one drops
//! out of the remaining collectives, and its peers observe the failure as
//! [`Error::PeerAborted`].

use thiserror::Error;

/// Errors that can occur while planning, distributing or multiplying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The run was configured with an empty matrix or an empty group.
    #[error("Invalid configuration: {message} (dimension: {dimension}, workers: {workers})")]
    Configuration {
        /// Requested matrix dimension.
        dimension: usize,
        /// Requested worker count.
        workers: usize,
        /// Human-readable error message.
        message: String,
    },
    /// A collective could not move its data.
    #[error("Distribution failed on rank {rank}: {message}")]
    Distribution {
        /// Rank that observed the failure.
        rank: usize,
        /// Human-readable error message.
        message: String,
    },
    /// A peer left the group before finishing its collectives.
    #[error("Rank {rank} aborted: peer rank {peer} failed")]
    PeerAborted {
        /// Rank that observed the abort.
        rank: usize,
        /// Rank that failed.
        peer: usize,
    },
    /// A local buffer could not be reserved.
    #[error("Memory allocation failed: {message} (requested {requested_elements} elements)")]
    Allocation {
        /// Number of elements that was requested.
        requested_elements: usize,
        /// Human-readable error message.
        message: String,
    },
    /// A buffer or plan does not match what the operation expects.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Returns `true` for errors that only report some other worker's failure.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Error::PeerAborted { .. })
    }
}

/// Result type alias for rowscatter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Creates a configuration error.
pub fn configuration_error(dimension: usize, workers: usize, message: impl Into<String>) -> Error {
    Error::Configuration {
        dimension,
        workers,
        message: message.into(),
    }
}

/// Creates a distribution error.
pub fn distribution_error(rank: usize, message: impl Into<String>) -> Error {
    Error::Distribution {
        rank,
        message: message.into(),
    }
}

/// Creates an allocation error.
pub fn allocation_error(requested_elements: usize, message: impl Into<String>) -> Error {
    Error::Allocation {
        requested_elements,
        message: message.into(),
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> Error {
    Error::Validation {
        message: message.into(),
    }
}

/// Allocates an empty vector able to hold `len` elements without reallocating.
///
/// Local blocks vary in size by rank, so every per-worker buffer goes through
/// here and an allocation failure is reported instead of aborting the process.
pub fn try_with_capacity<T>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| allocation_error(len, e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let error = configuration_error(0, 4, "matrix dimension must be at least 1");
        let display = format!("{}", error);
        assert!(display.contains("Invalid configuration"));
        assert!(display.contains("dimension: 0"));
        assert!(display.contains("workers: 4"));
        assert!(display.contains("matrix dimension must be at least 1"));
    }

    #[test]
    fn test_distribution_error_display() {
        let error = distribution_error(3, "inbox closed");
        let display = format!("{}", error);
        assert!(display.contains("rank 3"));
        assert!(display.contains("inbox closed"));
    }

    #[test]
    fn test_peer_aborted_is_secondary() {
        let error = Error::PeerAborted { rank: 1, peer: 0 };
        assert!(error.is_secondary());
        assert_eq!(format!("{}", error), "Rank 1 aborted: peer rank 0 failed");
        assert!(!validation_error("x").is_secondary());
    }

    #[test]
    fn test_allocation_error_display() {
        let error = allocation_error(1024, "capacity overflow");
        let display = format!("{}", error);
        assert!(display.contains("Memory allocation failed"));
        assert!(display.contains("1024 elements"));
    }

    #[test]
    fn test_try_with_capacity() {
        let buffer: Vec<i64> = try_with_capacity(49).unwrap();
        assert!(buffer.capacity() >= 49);
        assert!(buffer.is_empty());

        let huge = try_with_capacity::<i64>(usize::MAX);
        assert!(matches!(huge, Err(Error::Allocation { .. })));
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = validation_error("test error");
        let _: &dyn std::error::Error = &error;
        assert!(std::error::Error::source(&error).is_none());
    }
}
