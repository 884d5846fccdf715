//! # Distributed Multiplication Driver
//!
//! Every worker runs [`execute`], the same program, in lockstep:
//!
//! 1. broadcast `B` from the coordinator,
//! 2. plan the row partition of the group,
//! 3. scatter row blocks of `A`,
//! 4. multiply the local block against `B`,
//! 5. gather the result blocks into `C` at the coordinator.
//!
//! Only the coordinator ever holds the full `A`, `B` and `C`. [`run`] wires
//! this up for an in-process group and returns the coordinator's view.

use std::sync::Mutex;

use chrono::{TimeDelta, Utc};
use tracing::{debug, info};

use crate::comm::{self, Endpoint};
use crate::config::{RunConfig, COORDINATOR_RANK};
use crate::error::{distribution_error, validation_error, Result};
use crate::generator::{DefaultA, DefaultB, MatrixSource};
use crate::kernel::multiply_block;
use crate::matrix::{Element, Matrix};
use crate::plan::DistributionPlan;

/// What the coordinator holds once the gather has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Products {
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
    pub plan: DistributionPlan,
}

/// Result of a complete run, as seen by the coordinator.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
    pub plan: DistributionPlan,
    /// Wall time from generating the inputs to holding the full result.
    pub elapsed: TimeDelta,
}

/// One worker's share of the computation.
///
/// `inputs` must be `Some((a, b))` on the coordinator and is ignored
/// elsewhere. Returns the full matrices on the coordinator and `None` on
/// every other rank.
pub fn execute(
    endpoint: &mut Endpoint<Element>,
    dimension: usize,
    inputs: Option<(Matrix, Matrix)>,
) -> Result<Option<Products>> {
    let rank = endpoint.rank();
    let (a, b) = match inputs {
        Some((a, b)) if rank == COORDINATOR_RANK => (Some(a), Some(b)),
        _ => (None, None),
    };
    if rank == COORDINATOR_RANK && a.is_none() {
        return Err(validation_error("coordinator started without input matrices"));
    }

    let b_data = endpoint.broadcast(b.map(Matrix::into_vec), COORDINATOR_RANK)?;

    let plan = DistributionPlan::new(dimension, endpoint.size())?;

    let local_a = endpoint.scatter(a.as_ref().map(Matrix::as_slice), &plan, COORDINATOR_RANK)?;

    let rows = plan.rows(rank);
    let local_c = multiply_block(&local_a, &b_data, dimension, rows)?;
    debug!(rank, rows, "multiplied local block");

    let gathered = endpoint.gather(local_c, &plan, COORDINATOR_RANK)?;

    match (gathered, a) {
        (Some(c), Some(a)) => Ok(Some(Products {
            a,
            b: Matrix::from_vec(dimension, b_data)?,
            c: Matrix::from_vec(dimension, c)?,
            plan,
        })),
        _ => Ok(None),
    }
}

/// Multiplies `source_a * source_b` over an in-process group of
/// `config.workers` workers.
///
/// # Errors
///
/// A configuration error for an empty matrix or group; otherwise the first
/// error any worker hit. No partial result is ever returned.
pub fn run<SA, SB>(config: RunConfig, source_a: &SA, source_b: &SB) -> Result<RunOutcome>
where
    SA: MatrixSource + ?Sized,
    SB: MatrixSource + ?Sized,
{
    config.validate()?;
    let RunConfig { dimension, workers } = config;
    info!(dimension, workers, "starting distributed multiplication");

    let started = Utc::now();
    let a = source_a.generate(dimension)?;
    let b = source_b.generate(dimension)?;
    for (name, m) in [("A", &a), ("B", &b)] {
        if m.dimension() != dimension {
            return Err(validation_error(format!(
                "source for {name} produced a {0}x{0} matrix, expected {dimension}x{dimension}",
                m.dimension()
            )));
        }
    }

    let inputs = Mutex::new(Some((a, b)));
    let results = comm::launch(workers, |endpoint| {
        let inputs = if endpoint.rank() == COORDINATOR_RANK {
            inputs.lock().ok().and_then(|mut slot| slot.take())
        } else {
            None
        };
        execute(endpoint, dimension, inputs)
    })?;
    let elapsed = Utc::now() - started;

    let Products { a, b, c, plan } = results
        .into_iter()
        .nth(COORDINATOR_RANK)
        .flatten()
        .ok_or_else(|| distribution_error(COORDINATOR_RANK, "coordinator holds no result"))?;

    info!(
        dimension,
        workers,
        elapsed_us = elapsed.num_microseconds().unwrap_or(i64::MAX),
        "distributed multiplication complete"
    );

    Ok(RunOutcome {
        a,
        b,
        c,
        plan,
        elapsed,
    })
}

/// [`run`] with the default input formulas.
pub fn run_default(config: RunConfig) -> Result<RunOutcome> {
    run(config, &DefaultA, &DefaultB)
}
