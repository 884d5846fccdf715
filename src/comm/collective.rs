use tracing::debug;

use super::{Endpoint, Tag};
use crate::error::{distribution_error, try_with_capacity, validation_error, Result};
use crate::plan::DistributionPlan;

/// Rank that collects barrier arrivals.
const BARRIER_ROOT: usize = 0;

fn copy_block<T: Clone>(block: &[T]) -> Result<Vec<T>> {
    let mut owned = try_with_capacity(block.len())?;
    owned.extend_from_slice(block);
    Ok(owned)
}

impl<T: Clone + Default + Send> Endpoint<T> {
    fn check_plan(&self, plan: &DistributionPlan) -> Result<()> {
        if plan.workers() != self.size {
            return Err(validation_error(format!(
                "plan covers {} workers, group has {}",
                plan.workers(),
                self.size
            )));
        }
        Ok(())
    }

    /// Blocks until every rank in the group has called `barrier`.
    pub fn barrier(&mut self) -> Result<()> {
        if self.size == 1 {
            return Ok(());
        }
        if self.rank == BARRIER_ROOT {
            for _ in 1..self.size {
                self.recv_any(Tag::BarrierArrive)?;
            }
            for peer in (0..self.size).filter(|&p| p != BARRIER_ROOT) {
                self.send(peer, Tag::BarrierRelease, Vec::new())?;
            }
        } else {
            self.send(BARRIER_ROOT, Tag::BarrierArrive, Vec::new())?;
            self.recv(BARRIER_ROOT, Tag::BarrierRelease)?;
        }
        Ok(())
    }

    /// Replicates the buffer held by `root` on every rank.
    ///
    /// `root` must pass `Some(data)`; the argument is ignored on every other
    /// rank. Each rank, `root` included, returns its own copy.
    pub fn broadcast(&mut self, data: Option<Vec<T>>, root: usize) -> Result<Vec<T>> {
        self.check_rank(root)?;

        let data = if self.rank == root {
            let data = data.ok_or_else(|| validation_error("broadcast root must supply data"))?;
            debug!(rank = self.rank, len = data.len(), "broadcasting");
            for peer in (0..self.size).filter(|&p| p != root) {
                self.send(peer, Tag::Broadcast, copy_block(&data)?)?;
            }
            data
        } else {
            let data = self.recv(root, Tag::Broadcast)?;
            debug!(rank = self.rank, root, len = data.len(), "received broadcast");
            data
        };

        self.barrier()?;
        Ok(data)
    }

    /// Deals out `full` from `root`, one contiguous block per rank.
    ///
    /// Rank `i` receives `full[plan.offset(i)..plan.offset(i) + plan.count(i)]`
    /// as an owned buffer. `full` is only read on `root`.
    ///
    /// # Errors
    ///
    /// A validation error if the plan does not match the group, or if `root`
    /// supplies no buffer or one whose length differs from the plan total.
    pub fn scatter(
        &mut self,
        full: Option<&[T]>,
        plan: &DistributionPlan,
        root: usize,
    ) -> Result<Vec<T>> {
        self.check_rank(root)?;
        self.check_plan(plan)?;

        let local = if self.rank == root {
            let full = full.ok_or_else(|| validation_error("scatter root must supply data"))?;
            if full.len() != plan.total_elements() {
                return Err(validation_error(format!(
                    "scatter source holds {} elements, plan covers {}",
                    full.len(),
                    plan.total_elements()
                )));
            }
            for (peer, entry) in plan.entries().filter(|&(p, _)| p != root) {
                self.send(peer, Tag::Scatter, copy_block(&full[entry.range()])?)?;
            }
            copy_block(&full[plan.entry(root).range()])?
        } else {
            let block = self.recv(root, Tag::Scatter)?;
            if block.len() != plan.count(self.rank) {
                return Err(distribution_error(
                    self.rank,
                    format!(
                        "scatter delivered {} elements, plan assigns {}",
                        block.len(),
                        plan.count(self.rank)
                    ),
                ));
            }
            block
        };

        debug!(
            rank = self.rank,
            rows = ?plan.row_range(self.rank),
            len = local.len(),
            "scattered block"
        );
        self.barrier()?;
        Ok(local)
    }

    /// Reassembles per-rank blocks at `root`, the inverse of [`scatter`].
    ///
    /// Each rank contributes `local`, which must hold exactly
    /// `plan.count(rank)` elements; `root` writes block `i` at
    /// `plan.offset(i)`. Returns `Some(full)` on `root` and `None` elsewhere.
    ///
    /// [`scatter`]: Endpoint::scatter
    pub fn gather(
        &mut self,
        local: Vec<T>,
        plan: &DistributionPlan,
        root: usize,
    ) -> Result<Option<Vec<T>>> {
        self.check_rank(root)?;
        self.check_plan(plan)?;

        if local.len() != plan.count(self.rank) {
            return Err(validation_error(format!(
                "rank {} contributes {} elements, plan assigns {}",
                self.rank,
                local.len(),
                plan.count(self.rank)
            )));
        }

        let gathered = if self.rank == root {
            let total = plan.total_elements();
            let mut full = try_with_capacity(total)?;
            full.resize(total, T::default());
            full[plan.entry(root).range()].clone_from_slice(&local);

            let mut received = vec![false; self.size];
            received[root] = true;
            for _ in 1..self.size {
                let (source, block) = self.recv_any(Tag::Gather)?;
                if received[source] {
                    return Err(distribution_error(
                        self.rank,
                        format!("rank {source} contributed to the same gather twice"),
                    ));
                }
                if block.len() != plan.count(source) {
                    return Err(distribution_error(
                        self.rank,
                        format!(
                            "rank {source} contributed {} elements, plan assigns {}",
                            block.len(),
                            plan.count(source)
                        ),
                    ));
                }
                full[plan.entry(source).range()].clone_from_slice(&block);
                received[source] = true;
            }
            debug!(rank = self.rank, len = full.len(), "gathered result");
            Some(full)
        } else {
            self.send(root, Tag::Gather, local)?;
            None
        };

        self.barrier()?;
        Ok(gathered)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::error::Error;

    /// Runs `f` on one OS thread per endpoint and returns results by rank.
    fn run_group<R, F>(size: usize, f: F) -> Vec<Result<R>>
    where
        R: Send,
        F: Fn(&mut Endpoint<i64>) -> Result<R> + Sync,
    {
        let endpoints: Vec<Endpoint<i64>> = Endpoint::group(size);
        thread::scope(|s| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|mut endpoint| {
                    let f = &f;
                    s.spawn(move || {
                        let result = f(&mut endpoint);
                        if result.is_ok() {
                            endpoint.finish();
                        }
                        result
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_broadcast_reaches_every_rank() {
        let results = run_group(4, |ep| {
            let data = (ep.rank() == 2).then(|| vec![7, 8, 9]);
            ep.broadcast(data, 2)
        });
        for result in results {
            assert_eq!(result.unwrap(), vec![7, 8, 9]);
        }
    }

    #[test]
    fn test_scatter_gather_uneven() {
        let n = 5;
        let results = run_group(3, |ep| {
            let plan = DistributionPlan::new(n, ep.size())?;
            let full: Vec<i64> = (0..(n * n) as i64).collect();
            let source = (ep.rank() == 0).then_some(full.as_slice());
            let local = ep.scatter(source, &plan, 0)?;
            assert_eq!(local, full[plan.entry(ep.rank()).range()].to_vec());
            ep.gather(local, &plan, 0)
        });
        let full: Vec<i64> = (0..25).collect();
        assert_eq!(results[0].as_ref().unwrap().as_deref(), Some(full.as_slice()));
        assert_eq!(results[1].as_ref().unwrap(), &None);
        assert_eq!(results[2].as_ref().unwrap(), &None);
    }

    #[test]
    fn test_gather_to_non_zero_root() {
        let results = run_group(3, |ep| {
            let plan = DistributionPlan::new(3, 3)?;
            let local = vec![ep.rank() as i64; 3];
            ep.gather(local, &plan, 1)
        });
        assert_eq!(
            results[1].as_ref().unwrap().as_deref(),
            Some(&[0, 0, 0, 1, 1, 1, 2, 2, 2][..])
        );
    }

    #[test]
    fn test_wrong_block_length_aborts_group() {
        let results = run_group(3, |ep| {
            let plan = DistributionPlan::new(3, 3)?;
            let len = if ep.rank() == 2 { 2 } else { 3 };
            ep.gather(vec![0; len], &plan, 0)
        });
        assert!(matches!(results[2], Err(Error::Validation { .. })));
        assert!(matches!(
            results[0],
            Err(Error::PeerAborted { rank: 0, peer: 2 })
        ));
    }

    #[test]
    fn test_plan_for_other_group_size_rejected() {
        let results = run_group(1, |ep| {
            let plan = DistributionPlan::new(4, 2)?;
            ep.scatter(Some(&[0; 16][..]), &plan, 0)
        });
        assert!(matches!(results[0], Err(Error::Validation { .. })));
    }

    #[test]
    fn test_root_outside_group_rejected() {
        let results = run_group(1, |ep| ep.broadcast(Some(vec![1]), 3));
        assert!(matches!(results[0], Err(Error::Validation { .. })));
    }
}
