use std::sync::Mutex;

use rayon::ThreadPoolBuilder;
use tracing::{debug, warn};

use super::Endpoint;
use crate::error::{distribution_error, validation_error, Error, Result};

/// Runs `worker` once on each of `size` dedicated threads, all at the same
/// time, handing each call its own [`Endpoint`]. The thread index is the rank.
///
/// The pool lives for exactly one call. Collectives block until every rank
/// has entered them, so the group needs one thread per rank; a shared pool
/// could park several ranks behind each other and never make progress.
///
/// # Returns
///
/// The per-rank results in rank order when every worker succeeded. When any
/// worker failed, the lowest-ranked error that is not a
/// [`Error::PeerAborted`] report is returned, since those only echo the
/// failure of another worker.
pub fn launch<T, R, F>(size: usize, worker: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(&mut Endpoint<T>) -> Result<R> + Sync,
{
    if size == 0 {
        return Err(validation_error("a worker group needs at least one worker"));
    }

    let slots: Vec<Mutex<Option<Endpoint<T>>>> = Endpoint::group(size)
        .into_iter()
        .map(|endpoint| Mutex::new(Some(endpoint)))
        .collect();

    let pool = ThreadPoolBuilder::new()
        .num_threads(size)
        .thread_name(|index| format!("rowscatter-rank-{index}"))
        .build()
        .map_err(|e| distribution_error(0, format!("failed to start {size} workers: {e}")))?;

    debug!(size, "worker group started");

    let results: Vec<Result<R>> = pool.broadcast(|ctx| {
        let rank = ctx.index();
        let claimed = slots[rank].lock().ok().and_then(|mut slot| slot.take());
        let Some(mut endpoint) = claimed else {
            return Err(distribution_error(rank, "endpoint missing for rank"));
        };

        match worker(&mut endpoint) {
            Ok(value) => {
                endpoint.finish();
                Ok(value)
            }
            Err(e) => {
                if e.is_secondary() {
                    debug!(rank, error = %e, "worker stopped");
                } else {
                    warn!(rank, error = %e, "worker failed");
                }
                // Dropping the unfinished endpoint aborts the peers.
                drop(endpoint);
                Err(e)
            }
        }
    });

    collect_results(results)
}

fn collect_results<R>(results: Vec<Result<R>>) -> Result<Vec<R>> {
    let mut values = Vec::with_capacity(results.len());
    let mut first_error: Option<Error> = None;

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => {
                let replace = match &first_error {
                    None => true,
                    Some(current) => current.is_secondary() && !e.is_secondary(),
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_assigns_every_rank_once() {
        let ranks = launch::<i64, _, _>(5, |ep| Ok((ep.rank(), ep.size()))).unwrap();
        assert_eq!(ranks, vec![(0, 5), (1, 5), (2, 5), (3, 5), (4, 5)]);
    }

    #[test]
    fn test_launch_zero_workers() {
        let result = launch::<i64, (), _>(0, |_| Ok(()));
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_failing_worker_error_wins() {
        let result = launch::<i64, Vec<i64>, _>(4, |ep| {
            if ep.rank() == 3 {
                return Err(validation_error("rank 3 gives up"));
            }
            let data = (ep.rank() == 0).then(|| vec![1, 2, 3]);
            ep.broadcast(data, 0)
        });
        assert_eq!(result, Err(validation_error("rank 3 gives up")));
    }

    #[test]
    fn test_collect_prefers_root_cause() {
        let results: Vec<Result<()>> = vec![
            Err(Error::PeerAborted { rank: 0, peer: 2 }),
            Err(Error::PeerAborted { rank: 1, peer: 2 }),
            Err(validation_error("boom")),
        ];
        assert_eq!(collect_results(results), Err(validation_error("boom")));
    }
}
