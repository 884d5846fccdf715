//! Scatter/gather behaviour over real worker groups.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rowscatter::{launch, DistributionPlan, Error};

#[test]
fn test_scatter_then_gather_reconstructs_any_matrix() {
    let mut rng = StdRng::seed_from_u64(42);

    for &(n, workers) in &[(1, 1), (1, 4), (4, 4), (7, 3), (7, 10), (12, 5), (20, 7)] {
        let full: Vec<i64> = (0..n * n).map(|_| rng.random_range(-1_000..=1_000)).collect();

        let gathered = launch(workers, |ep| {
            let plan = DistributionPlan::new(n, ep.size())?;
            let source = (ep.rank() == 0).then_some(full.as_slice());
            let local = ep.scatter(source, &plan, 0)?;

            let rows = plan.row_range(ep.rank());
            assert_eq!(local.as_slice(), &full[rows.start * n..rows.end * n]);

            ep.gather(local, &plan, 0)
        })
        .unwrap();

        assert_eq!(gathered[0].as_deref(), Some(full.as_slice()), "n = {n}, workers = {workers}");
        assert!(gathered[1..].iter().all(Option::is_none));
    }
}

#[test]
fn test_broadcast_copies_are_independent() {
    let copies = launch(4, |ep| {
        let data = (ep.rank() == 0).then(|| vec![1, 2, 3]);
        let mut copy = ep.broadcast(data, 0)?;
        copy[0] += ep.rank() as i64;
        Ok(copy)
    })
    .unwrap();

    assert_eq!(copies, vec![vec![1, 2, 3], vec![2, 2, 3], vec![3, 2, 3], vec![4, 2, 3]]);
}

#[test]
fn test_excess_workers_receive_empty_blocks() {
    let sizes = launch(6, |ep| {
        let plan = DistributionPlan::new(3, ep.size())?;
        let full: Vec<i64> = (0..9).collect();
        let source = (ep.rank() == 0).then_some(full.as_slice());
        let local = ep.scatter(source, &plan, 0)?;
        Ok(local.len())
    })
    .unwrap();

    assert_eq!(sizes, vec![3, 3, 3, 0, 0, 0]);
}

#[test]
fn test_root_without_data_fails_whole_group() {
    let result = launch::<i64, _, _>(3, |ep| {
        let plan = DistributionPlan::new(3, ep.size())?;
        ep.scatter(None, &plan, 0)
    });

    match result {
        Err(Error::Validation { message }) => assert!(message.contains("scatter root")),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn test_panicking_worker_does_not_hang_peers() {
    let outcome = std::panic::catch_unwind(|| {
        launch::<i64, _, _>(3, |ep| {
            if ep.rank() == 1 {
                panic!("rank 1 crashed");
            }
            ep.barrier()
        })
    });

    assert!(outcome.is_err(), "the panic propagates once the group has unwound");
}
