use std::sync::Arc;
use std::time::Duration;

use crate::cli::SreTunnelScenarioCli;
use crate::context::{RunnerContext, UserValuesConstraint, WorkerContext};
use crate::error::RunError;
use crate::init::init;
use crate::target::{normalize_base_url, resolve_base_url, resolve_group_number};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type WorkerHookMut<RV, V> = fn(&mut WorkerContext<RV, V>) -> HookResult;

/// When a run stops. Exactly one bound applies to each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBound {
    /// Workers keep starting iterations until this much wall-clock time has passed.
    Duration(Duration),
    /// Workers share this many iterations between them.
    Iterations(u64),
}

/// The builder for a scenario definition.
///
/// This must be used at the start of a test to define the scenario that you want to run.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// The parsed command line, which takes precedence over the scenario defaults.
    cli: SreTunnelScenarioCli,
    /// The number of workers to use if one is not given on the command line.
    default_workers: Option<usize>,
    /// The run duration to use if no bound is given on the command line.
    default_duration_s: Option<u64>,
    /// The iteration bound to use if no bound is given on the command line.
    default_iterations: Option<u64>,
    /// Global setup hook for this scenario. It will be run once, before any workers are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Setup hook for a worker, which will be run once for each worker as it starts.
    setup_worker_fn: Option<WorkerHookMut<RV, V>>,
    /// The behaviour each worker runs once per iteration.
    worker_behaviour: Option<WorkerHookMut<RV, V>>,
    /// Teardown hook for a worker, run once when the worker stops running its behaviour.
    teardown_worker_fn: Option<WorkerHookMut<RV, V>>,
    /// Global teardown hook for this scenario, run once after all workers have stopped.
    teardown_fn: Option<GlobalHook<RV>>,
}

/// A validated, immutable scenario ready to be passed to [crate::run::run].
pub struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub name: String,
    pub workers: usize,
    pub bound: RunBound,
    pub base_url: String,
    pub group_number: u32,
    pub request_timeout: Duration,
    pub cli: SreTunnelScenarioCli,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub setup_worker_fn: Option<WorkerHookMut<RV, V>>,
    pub worker_behaviour: WorkerHookMut<RV, V>,
    pub teardown_worker_fn: Option<WorkerHookMut<RV, V>>,
    pub teardown_fn: Option<GlobalHook<RV>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Create a scenario definition from a name and an already parsed command line.
    ///
    /// See the [ScenarioDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: SreTunnelScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_workers: None,
            default_duration_s: None,
            default_iterations: None,
            setup_fn: None,
            setup_worker_fn: None,
            worker_behaviour: None,
            teardown_worker_fn: None,
            teardown_fn: None,
        }
    }

    /// Initialise logging, parse the command line and create a new scenario definition.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, init())
    }

    /// Set the number of workers to run if `--workers` is not given.
    pub fn with_default_workers(mut self, workers: usize) -> Self {
        self.default_workers = Some(workers);
        self
    }

    /// Set the duration to run for if neither `--duration` nor `--iterations` is given.
    pub fn with_default_duration_s(mut self, duration: u64) -> Self {
        self.default_duration_s = Some(duration);
        self
    }

    /// Set the total number of iterations if neither `--duration` nor `--iterations` is given.
    pub fn with_default_iterations(mut self, iterations: u64) -> Self {
        self.default_iterations = Some(iterations);
        self
    }

    /// Set the global setup hook [ScenarioDefinitionBuilder::setup_fn] for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the worker setup hook [ScenarioDefinitionBuilder::setup_worker_fn] for this scenario.
    pub fn use_worker_setup(mut self, setup_worker_fn: WorkerHookMut<RV, V>) -> Self {
        self.setup_worker_fn = Some(setup_worker_fn);
        self
    }

    /// Set the worker behaviour hook [ScenarioDefinitionBuilder::worker_behaviour] for this scenario.
    pub fn use_worker_behaviour(mut self, behaviour: WorkerHookMut<RV, V>) -> Self {
        self.worker_behaviour = Some(behaviour);
        self
    }

    /// Set the worker teardown hook [ScenarioDefinitionBuilder::teardown_worker_fn] for this scenario.
    pub fn use_worker_teardown(mut self, teardown_worker_fn: WorkerHookMut<RV, V>) -> Self {
        self.teardown_worker_fn = Some(teardown_worker_fn);
        self
    }

    /// Set the global teardown hook [ScenarioDefinitionBuilder::teardown_fn] for this scenario.
    ///
    /// This hook is best effort, a failure is logged and does not fail the run.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    fn resolve_bound(&self) -> Result<RunBound, RunError> {
        let bound = match (self.cli.duration, self.cli.iterations) {
            (Some(_), Some(_)) => {
                return Err(RunError::Configuration(
                    "--duration and --iterations cannot be used together".to_string(),
                ))
            }
            (Some(duration), None) => RunBound::Duration(Duration::from_secs(duration)),
            (None, Some(iterations)) => RunBound::Iterations(iterations),
            (None, None) => match (self.default_duration_s, self.default_iterations) {
                (Some(_), Some(_)) => {
                    return Err(RunError::Configuration(format!(
                        "Scenario [{}] defines both a default duration and a default iteration count",
                        self.name
                    )))
                }
                (Some(duration), None) => RunBound::Duration(Duration::from_secs(duration)),
                (None, Some(iterations)) => RunBound::Iterations(iterations),
                (None, None) => {
                    return Err(RunError::Configuration(
                        "No run bound, set --duration or --iterations".to_string(),
                    ))
                }
            },
        };

        match bound {
            RunBound::Duration(duration) if duration.is_zero() => Err(RunError::Configuration(
                "The run duration must be at least 1 second".to_string(),
            )),
            RunBound::Iterations(0) => Err(RunError::Configuration(
                "The iteration count must be at least 1".to_string(),
            )),
            bound => Ok(bound),
        }
    }

    pub(crate) fn build(self) -> Result<ScenarioDefinition<RV, V>, RunError> {
        let workers = self.cli.workers.or(self.default_workers).unwrap_or(1);
        if workers == 0 {
            return Err(RunError::Configuration(
                "The number of workers must be at least 1".to_string(),
            ));
        }

        let bound = self.resolve_bound()?;

        let worker_behaviour = self.worker_behaviour.ok_or_else(|| {
            RunError::Configuration(format!("Scenario [{}] has no worker behaviour", self.name))
        })?;

        if self.cli.request_timeout_s == 0 {
            return Err(RunError::Configuration(
                "The request timeout must be at least 1 second".to_string(),
            ));
        }

        let base_url = match self.cli.target_url.as_deref() {
            Some(url) if !url.trim().is_empty() => normalize_base_url(url.trim()),
            _ => resolve_base_url(),
        };
        let group_number = match self.cli.group_number {
            Some(group_number) if group_number >= 1 => group_number,
            _ => resolve_group_number(),
        };

        Ok(ScenarioDefinition {
            name: self.name,
            workers,
            bound,
            base_url,
            group_number,
            request_timeout: Duration::from_secs(self.cli.request_timeout_s),
            cli: self.cli,
            setup_fn: self.setup_fn,
            setup_worker_fn: self.setup_worker_fn,
            worker_behaviour,
            teardown_worker_fn: self.teardown_worker_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}
