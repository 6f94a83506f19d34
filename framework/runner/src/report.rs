use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use sre_tunnel_instruments::CheckReport;

/// The outcome of a run.
///
/// Returned by [crate::run::run] once every worker has terminated. A partial report can be taken
/// while the run is active with [crate::context::RunnerContext::report].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub scenario_name: String,
    pub run_id: String,
    pub checks: CheckReport,
    /// Iterations that ran to completion, including the ones that failed.
    pub iterations: u64,
    /// Iterations that returned an error or panicked.
    pub failed_iterations: u64,
    pub workers_spawned: usize,
    /// Workers that kept running their behaviour until the run's bound was reached.
    pub workers_completed: usize,
}

impl RunReport {
    /// True when no check failed and no iteration failed.
    pub fn is_success(&self) -> bool {
        self.checks.all_passed() && self.failed_iterations == 0
    }
}

#[derive(Debug, Default)]
pub(crate) struct RunStats {
    iterations: AtomicU64,
    failed_iterations: AtomicU64,
    workers_spawned: AtomicUsize,
    workers_completed: AtomicUsize,
}

impl RunStats {
    pub(crate) fn record_iteration(&self, failed: bool) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_iterations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn worker_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_completed(&self) {
        self.workers_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub(crate) fn failed_iterations(&self) -> u64 {
        self.failed_iterations.load(Ordering::Relaxed)
    }

    pub(crate) fn workers_spawned(&self) -> usize {
        self.workers_spawned.load(Ordering::Relaxed)
    }

    pub(crate) fn workers_completed(&self) -> usize {
        self.workers_completed.load(Ordering::Relaxed)
    }
}

/// Shared allowance of iterations for an iteration-bounded run.
#[derive(Debug)]
pub(crate) struct IterationBudget {
    bound: u64,
    claimed: AtomicU64,
}

impl IterationBudget {
    pub(crate) fn new(bound: u64) -> Self {
        Self {
            bound,
            claimed: AtomicU64::new(0),
        }
    }

    /// Claim one iteration. Returns false once the bound has been handed out.
    pub(crate) fn try_claim(&self) -> bool {
        self.claimed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |claimed| {
                (claimed < self.bound).then_some(claimed + 1)
            })
            .is_ok()
    }

    pub(crate) fn claimed(&self) -> u64 {
        self.claimed.load(Ordering::Acquire)
    }
}
