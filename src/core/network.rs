//! # Process Group Communication Module
//!
//! This module provides the process-group abstraction the planner
//! communicates through. Only one collective is needed: an all-reduce of a
//! single scalar by sum or maximum. Two implementations are provided:
//!
//! - [`SingleProcessGroup`]: a group of one, every reduction is the identity.
//! - [`ThreadGroup`]: an in-process group whose members are handles shared
//!   between threads, used to simulate several processes.
//!
//! Collectives are blocking: every member of a group must reach the same
//! sequence of `all_reduce` calls or the group deadlocks. Members of a
//! [`ThreadGroup`] that disagree on the operator of a reduction panic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Reduction operator of a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
    /// Sum of all contributions
    Sum,
    /// Maximum of all contributions
    Max,
}

impl ReduceOp {
    /// Combine two contributions.
    pub fn combine(self, acc: f64, value: f64) -> f64 {
        match self {
            ReduceOp::Sum => acc + value,
            ReduceOp::Max => acc.max(value),
        }
    }
}

/// A group of cooperating processes.
///
/// Implementations wrap whatever transport the application uses. The
/// layout computations only read [`rank`](ProcessGroup::rank) and
/// [`size`](ProcessGroup::size); the planner additionally calls
/// [`all_reduce`](ProcessGroup::all_reduce).
pub trait ProcessGroup: fmt::Debug {
    /// Rank of the calling process, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of processes in the group (at least 1).
    fn size(&self) -> usize;

    /// Combine `value` across the group; every member receives the same result.
    fn all_reduce(&self, value: f64, op: ReduceOp) -> f64;
}

/// Group containing only the calling process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcessGroup;

impl ProcessGroup for SingleProcessGroup {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce(&self, value: f64, _op: ReduceOp) -> f64 {
        value
    }
}

/// Rendezvous state of one in-flight reduction
#[derive(Debug)]
struct ReduceState {
    /// Completed reductions so far
    generation: u64,
    /// Contribution of each rank for the current generation
    contributions: Vec<Option<f64>>,
    /// Operator requested by the first arrival
    op: Option<ReduceOp>,
    /// Set once members disagreed on an operator: (expected, requested)
    mismatch: Option<(ReduceOp, ReduceOp)>,
    /// Result of the last completed generation
    result: f64,
}

#[derive(Debug)]
struct SharedGroup {
    size: usize,
    state: Mutex<ReduceState>,
    arrived: Condvar,
}

impl SharedGroup {
    fn lock(&self) -> MutexGuard<'_, ReduceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Member handle of an in-process simulated group.
///
/// Create all members at once with [`ThreadGroup::create`] and move each
/// handle to its own thread. The reduction is applied in rank order, so
/// floating-point sums are bit-identical regardless of arrival order.
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    rank: usize,
    shared: Arc<SharedGroup>,
}

impl ThreadGroup {
    /// Create the `size` member handles of a new group, ordered by rank.
    pub fn create(size: usize) -> Vec<ThreadGroup> {
        let size = size.max(1);
        let shared = Arc::new(SharedGroup {
            size,
            state: Mutex::new(ReduceState {
                generation: 0,
                contributions: vec![None; size],
                op: None,
                mismatch: None,
                result: 0.0,
            }),
            arrived: Condvar::new(),
        });

        log::debug!("Thread group created: size={}", size);

        (0..size)
            .map(|rank| ThreadGroup {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Number of collectives completed by this group.
    pub fn completed_reductions(&self) -> u64 {
        self.shared.lock().generation
    }
}

impl ProcessGroup for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_reduce(&self, value: f64, op: ReduceOp) -> f64 {
        if self.shared.size == 1 {
            return value;
        }

        let mut state = self.shared.lock();
        let mismatch = state.mismatch;
        if let Some((expected, requested)) = mismatch {
            drop(state);
            desynchronized(self.rank, expected, requested);
        }
        let generation = state.generation;

        let current = state.op;
        match current {
            None => state.op = Some(op),
            Some(expected) if expected != op => {
                state.mismatch = Some((expected, op));
                drop(state);
                self.shared.arrived.notify_all();
                desynchronized(self.rank, expected, op);
            }
            Some(_) => {}
        }
        state.contributions[self.rank] = Some(value);

        if state.contributions.iter().all(Option::is_some) {
            let op = state.op.unwrap_or(op);
            let result = state
                .contributions
                .iter_mut()
                .filter_map(Option::take)
                .reduce(|acc, v| op.combine(acc, v))
                .unwrap_or(value);
            state.result = result;
            state.op = None;
            state.generation += 1;
            self.shared.arrived.notify_all();
            return result;
        }

        while state.generation == generation {
            state = self
                .shared
                .arrived
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            let mismatch = state.mismatch;
            if let Some((expected, requested)) = mismatch {
                drop(state);
                desynchronized(self.rank, expected, requested);
            }
        }
        state.result
    }
}

/// Abort a member of a group whose reductions no longer line up.
fn desynchronized(rank: usize, expected: ReduceOp, requested: ReduceOp) -> ! {
    log::error!(
        "rank {}: reduction requested {:?} while the group is reducing with {:?}",
        rank,
        requested,
        expected
    );
    panic!(
        "thread group desynchronized: {:?} requested during a {:?} reduction",
        requested, expected
    );
}
