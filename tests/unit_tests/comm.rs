use fluxrec::comm::{Communicator, LocalCommunicator, ReduceOp, SerialCommunicator};
use std::thread;

#[test]
fn serial_communicator_is_identity() {
    let comm = SerialCommunicator;
    assert_eq!((comm.rank(), comm.size()), (0, 1));
    assert!(comm.is_root());
    let mut values = [1.0, -2.0];
    comm.all_reduce(&mut values, ReduceOp::Max);
    assert_eq!(values, [1.0, -2.0]);
    assert_eq!(comm.global_sum(3.5), 3.5);
}

#[test]
fn local_group_reduces_across_threads() {
    let comms = LocalCommunicator::group(4);
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let r = comm.rank() as f64;
                    let mut sum = [r, 1.0];
                    comm.all_reduce_sum(&mut sum);
                    let mut min = [r + 1.0];
                    comm.all_reduce(&mut min, ReduceOp::Min);
                    let mut max = [-r];
                    comm.all_reduce(&mut max, ReduceOp::Max);
                    // Repeated reductions reuse the same slots
                    let total = comm.global_sum(2.0);
                    (comm.rank(), sum, min[0], max[0], total)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.len(), 4);
    for (rank, (r, sum, min, max, total)) in results.into_iter().enumerate() {
        assert_eq!(r, rank);
        assert_eq!(sum, [6.0, 4.0]);
        assert_eq!(min, 1.0);
        assert_eq!(max, 0.0);
        assert_eq!(total, 8.0);
    }
}

#[test]
fn only_rank_zero_is_root() {
    let comms = LocalCommunicator::group(3);
    let roots: Vec<bool> = comms.iter().map(|c| c.is_root()).collect();
    assert_eq!(roots, vec![true, false, false]);
    assert!(comms.iter().all(|c| c.size() == 3));
}

#[test]
#[should_panic]
fn empty_group_panics() {
    LocalCommunicator::group(0);
}
