//! Collective communication between the partitions of a distributed mesh.
//!
//! Every partition of a mesh is driven by one rank. The only collective operation needed by
//! the estimators is an element-wise reduction of a small number of scalars, which every
//! rank sharing the mesh must call uniformly.
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::{Arc, Barrier};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

impl ReduceOp {
    fn combine(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Sum => a + b,
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

pub trait Communicator: Send + Sync + Debug {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Reduces `values` element-wise across all ranks, leaving the result on every rank.
    ///
    /// This is a blocking collective: every rank must call it with slices of equal length.
    fn all_reduce(&self, values: &mut [f64], op: ReduceOp);

    fn all_reduce_sum(&self, values: &mut [f64]) {
        self.all_reduce(values, ReduceOp::Sum)
    }

    /// Sum of a single scalar across all ranks.
    fn global_sum(&self, value: f64) -> f64 {
        let mut values = [value];
        self.all_reduce(&mut values, ReduceOp::Sum);
        values[0]
    }

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Communicator for a mesh that is not partitioned.
#[derive(Debug, Default, Copy, Clone)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce(&self, _values: &mut [f64], _op: ReduceOp) {}
}

#[derive(Debug)]
struct LocalGroup {
    slots: Mutex<Vec<Vec<f64>>>,
    barrier: Barrier,
}

/// A rank in a group of in-process ranks, each driven by its own thread.
///
/// Contributions are combined in rank order, so all ranks obtain bitwise identical
/// results from a reduction.
#[derive(Debug, Clone)]
pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    group: Arc<LocalGroup>,
}

impl LocalCommunicator {
    /// Creates the communicators for a group of `size` ranks, ordered by rank.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn group(size: usize) -> Vec<Self> {
        assert!(size > 0, "A communicator group must have at least one rank");
        let group = Arc::new(LocalGroup {
            slots: Mutex::new(vec![Vec::new(); size]),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                group: Arc::clone(&group),
            })
            .collect()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce(&self, values: &mut [f64], op: ReduceOp) {
        if self.size == 1 {
            return;
        }

        {
            let mut slots = self.group.slots.lock();
            let slot = &mut slots[self.rank];
            slot.clear();
            slot.extend_from_slice(values);
        }
        self.group.barrier.wait();

        {
            let slots = self.group.slots.lock();
            assert!(
                slots.iter().all(|slot| slot.len() == values.len()),
                "All ranks must contribute the same number of values to a reduction"
            );
            for (i, value) in values.iter_mut().enumerate() {
                *value = slots[1..]
                    .iter()
                    .fold(slots[0][i], |acc, slot| op.combine(acc, slot[i]));
            }
        }
        // Nobody may overwrite its slot before every rank has read all contributions
        self.group.barrier.wait();
    }
}
