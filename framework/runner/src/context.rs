use std::{fmt::Debug, sync::Arc, time::Duration};

use sre_tunnel_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use sre_tunnel_instruments::{Checks, Reporter};

use crate::executor::Executor;
use crate::report::{RunReport, RunStats};
use crate::target::normalize_base_url;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Run-wide state. Mutable only in the setup hook, shared read-only with every worker afterwards.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    scenario_name: String,
    run_id: String,
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    checks: Arc<Checks>,
    stop_handle: ShutdownHandle,
    base_url: String,
    group_number: u32,
    request_timeout: Duration,
    pub(crate) stats: Arc<RunStats>,
    value: RV,
}

/// Values resolved from the CLI and environment for a single run.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) scenario_name: String,
    pub(crate) run_id: String,
    pub(crate) base_url: String,
    pub(crate) group_number: u32,
    pub(crate) request_timeout: Duration,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        settings: RunSettings,
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        stop_handle: ShutdownHandle,
    ) -> Self {
        Self {
            scenario_name: settings.scenario_name,
            run_id: settings.run_id,
            executor,
            reporter,
            checks: Arc::new(Checks::new()),
            stop_handle,
            base_url: settings.base_url,
            group_number: settings.group_number,
            request_timeout: settings.request_timeout,
            stats: Arc::new(RunStats::default()),
            value: Default::default(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn checks(&self) -> &Arc<Checks> {
        &self.checks
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The base URL of the service under test, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `path` onto [RunnerContext::base_url].
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", normalize_base_url(&self.base_url), path.trim_start_matches('/'))
    }

    /// The 1-based group number of this run.
    pub fn group_number(&self) -> u32 {
        self.group_number
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Ask every worker to stop after its current iteration.
    pub fn force_stop_scenario(&self) {
        self.stop_handle.shutdown();
    }

    /// A snapshot of the run so far. Safe to call while workers are running.
    pub fn report(&self) -> RunReport {
        RunReport {
            scenario_name: self.scenario_name.clone(),
            run_id: self.run_id.clone(),
            checks: self.checks.report(),
            iterations: self.stats.iterations(),
            failed_iterations: self.stats.failed_iterations(),
            workers_spawned: self.stats.workers_spawned(),
            workers_completed: self.stats.workers_completed(),
        }
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Per-worker state. Each worker owns its context for the whole run.
pub struct WorkerContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    worker_id: String,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> WorkerContext<RV, V> {
    pub(crate) fn new(
        worker_id: String,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            worker_id,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    /// A value which is unique to this worker, in the form `worker-{index}`.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    /// Listener for the soft stop of the run. Long-running behaviours can poll this to finish
    /// early, though the runner itself only checks it between iterations.
    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    /// Record a named check against this run, attributed to this worker.
    pub fn check<F>(&self, label: &str, predicate: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<bool>,
    {
        self.runner_context
            .checks()
            .check_for(Some(&self.worker_id), label, predicate)
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
