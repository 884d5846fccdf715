//! # rowscatter
//!
//! Square integer matrix multiplication over a fixed group of cooperating
//! workers. The rows of `A` are partitioned into contiguous blocks, one per
//! worker, `B` is broadcast to everyone, each worker multiplies its block,
//! and the result blocks are gathered back into `C` at the coordinator
//! (rank 0).
//!
//! ```
//! use rowscatter::{run_default, RunConfig};
//!
//! let outcome = run_default(RunConfig::new(7, 3)).unwrap();
//! assert_eq!(outcome.c, outcome.a.product(&outcome.b).unwrap());
//! assert_eq!(outcome.c[(0, 0)], 763);
//! ```

pub mod comm;
pub mod config;
pub mod driver;
pub mod error;
pub mod generator;
pub mod kernel;
pub mod matrix;
pub mod plan;
pub mod report;

pub use comm::{launch, Endpoint};
pub use config::{RunConfig, COORDINATOR_RANK, DEFAULT_DIMENSION};
pub use driver::{run, run_default, RunOutcome};
pub use error::{Error, Result};
pub use generator::{DefaultA, DefaultB, MatrixSource, RandomSource};
pub use matrix::{Element, Matrix};
pub use plan::{DistributionPlan, PlanEntry};
