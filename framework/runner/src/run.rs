use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::Context;
use sre_tunnel_core::prelude::{ShutdownHandle, ShutdownSignalError, WorkerBailError};
use sre_tunnel_instruments::ReportConfig;
use sre_tunnel_summary_model::{append_run_summary, RunSummary};

use crate::cli::ReporterOpt;
use crate::context::{RunSettings, RunnerContext, UserValuesConstraint, WorkerContext};
use crate::definition::{RunBound, ScenarioDefinition, ScenarioDefinitionBuilder};
use crate::error::RunError;
use crate::executor::Executor;
use crate::progress::{start_iteration_progress, start_progress};
use crate::report::{IterationBudget, RunReport};
use crate::shutdown::start_shutdown_listener;
use crate::target::{GROUP_NUMBER_ENV, SRE_URL_ENV};

/// Run a scenario to completion and return its report.
///
/// Fails only if the definition is invalid ([RunError::Configuration]) or the global setup hook
/// fails ([RunError::Setup]). Everything that goes wrong inside a worker is logged and counted in
/// the returned [RunReport].
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario [{}] against {} with {} workers, bound {:?}",
        definition.name,
        definition.base_url,
        definition.workers,
        definition.bound
    );

    let run_id = definition
        .cli
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());
    let started_at = chrono::Utc::now().timestamp();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    // Soft stop, observed by workers between iterations
    let stop_handle = ShutdownHandle::default();
    // Hard shutdown, also cancels in-flight work
    let shutdown_handle = start_shutdown_listener(&runtime, stop_handle.clone());

    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let reporter = Arc::new(match definition.cli.reporter {
        ReporterOpt::InMemory => ReportConfig::default().enable_in_memory().init(),
        ReporterOpt::Noop => ReportConfig::default().init(),
    });

    let mut runner_context = RunnerContext::new(
        RunSettings {
            scenario_name: definition.name.clone(),
            run_id: run_id.clone(),
            base_url: definition.base_url.clone(),
            group_number: definition.group_number,
            request_timeout: definition.request_timeout,
        },
        executor,
        reporter,
        stop_handle.clone(),
    );

    if let Some(setup_fn) = definition.setup_fn {
        setup_fn(&mut runner_context).map_err(RunError::Setup)?;
    }

    let iteration_budget = match definition.bound {
        RunBound::Duration(duration) => {
            if !definition.cli.no_progress {
                start_progress(duration, stop_handle.new_listener());
            }

            // Set a timer to stop the run after the duration has elapsed
            let stop_handle = stop_handle.clone();
            runner_context.executor().spawn(async move {
                tokio::time::sleep(duration).await;
                log::debug!("Run duration elapsed, stopping workers");
                stop_handle.shutdown();
            });

            None
        }
        RunBound::Iterations(bound) => {
            let budget = Arc::new(IterationBudget::new(bound));
            if !definition.cli.no_progress {
                start_iteration_progress(budget.clone(), bound, stop_handle.new_listener());
            }
            Some(budget)
        }
    };

    let runner_context = Arc::new(runner_context);

    let mut handles = Vec::with_capacity(definition.workers);
    for worker_index in 0..definition.workers {
        let worker_id = format!("worker-{}", worker_index);
        let spawned = spawn_worker(
            worker_id.clone(),
            &definition,
            runner_context.clone(),
            &stop_handle,
            iteration_budget.clone(),
        );

        match spawned {
            Ok(handle) => {
                runner_context.stats.worker_spawned();
                handles.push((worker_id, handle));
            }
            Err(e) => log::error!("Failed to spawn thread for {}: {:?}", worker_id, e),
        }
    }

    for (worker_id, handle) in handles {
        if handle.join().is_err() {
            log::error!("Worker {} terminated with a panic outside its behaviour", worker_id);
        }
    }

    // Every worker has stopped, release anything still waiting on the run to end
    stop_handle.shutdown();

    if let Some(teardown_fn) = definition.teardown_fn {
        // Don't crash the runner if the teardown fails. We still want the reporting and runner
        // shutdown to happen cleanly. The hook is documented as 'best effort'
        if let Err(e) = teardown_fn(runner_context.clone()) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    let report = runner_context.report();
    runner_context.reporter().finalize(&report.checks);

    if !definition.cli.no_summary {
        let summary = build_run_summary(&definition, &report, started_at);
        log::info!("Run summary fingerprint: {}", summary.fingerprint());
        if let Err(e) = append_run_summary(&summary, &definition.cli.summary_file) {
            log::error!(
                "Failed to write run summary to {}: {:?}",
                definition.cli.summary_file.display(),
                e
            );
        }
    }

    log::info!(
        "Scenario [{}] finished: {} iterations ({} failed), {} checks ({} failed)",
        report.scenario_name,
        report.iterations,
        report.failed_iterations,
        report.checks.total_recorded(),
        report.checks.total_failed()
    );

    Ok(report)
}

fn spawn_worker<RV: UserValuesConstraint, V: UserValuesConstraint>(
    worker_id: String,
    definition: &ScenarioDefinition<RV, V>,
    runner_context: Arc<RunnerContext<RV>>,
    stop_handle: &ShutdownHandle,
    iteration_budget: Option<Arc<IterationBudget>>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    let setup_worker_fn = definition.setup_worker_fn;
    let worker_behaviour_fn = definition.worker_behaviour;
    let teardown_worker_fn = definition.teardown_worker_fn;

    // For us to check if the worker should stop between iterations
    let cycle_stop_listener = stop_handle.new_listener();
    // For the behaviour implementation to listen for the stop and respond appropriately
    let delegated_stop_listener = stop_handle.new_listener();

    std::thread::Builder::new()
        .name(worker_id.clone())
        .spawn(move || {
            let stats = runner_context.stats.clone();
            let mut context =
                WorkerContext::<RV, V>::new(worker_id.clone(), runner_context, delegated_stop_listener);

            if let Some(setup_worker_fn) = setup_worker_fn {
                if let Err(e) = setup_worker_fn(&mut context) {
                    log::error!("Worker setup failed for {}: {:?}", worker_id, e);
                    return;
                }
            }

            log::debug!("Starting {}", worker_id);

            let mut completed = true;
            loop {
                if cycle_stop_listener.should_shutdown() {
                    break;
                }
                if let Some(budget) = &iteration_budget {
                    if !budget.try_claim() {
                        break;
                    }
                }

                match catch_unwind(AssertUnwindSafe(|| worker_behaviour_fn(&mut context))) {
                    Ok(Ok(())) => stats.record_iteration(false),
                    Ok(Err(e)) if e.is::<ShutdownSignalError>() => {
                        // Expected if the run is being interrupted, the check at the top of the
                        // loop will catch this and break out.
                    }
                    Ok(Err(e)) if e.is::<WorkerBailError>() => {
                        stats.record_iteration(true);
                        log::warn!("{} is bailing: {}", worker_id, e);
                        completed = false;
                        break;
                    }
                    Ok(Err(e)) => {
                        stats.record_iteration(true);
                        log::error!("Iteration failed for {}: {:?}", worker_id, e);
                    }
                    Err(_) => {
                        stats.record_iteration(true);
                        log::error!("Iteration panicked for {}", worker_id);
                    }
                }
            }

            log::debug!("Stopping {}", worker_id);

            if completed {
                stats.worker_completed();
            }

            if let Some(teardown_worker_fn) = teardown_worker_fn {
                if let Err(e) = teardown_worker_fn(&mut context) {
                    log::error!("Worker teardown failed for {}: {:?}", worker_id, e);
                }
            }
        })
}

fn build_run_summary<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: &ScenarioDefinition<RV, V>,
    report: &RunReport,
    started_at: i64,
) -> RunSummary {
    let (run_duration, iteration_bound) = match definition.bound {
        RunBound::Duration(duration) => (Some(duration.as_secs()), None),
        RunBound::Iterations(iterations) => (None, Some(iterations)),
    };

    let mut summary = RunSummary::new(
        report.run_id.clone(),
        report.scenario_name.clone(),
        started_at,
        run_duration,
        iteration_bound,
        report.workers_spawned,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    summary.set_worker_end_count(report.workers_completed);
    summary.set_iterations(report.iterations, report.failed_iterations);
    summary.set_checks(report.checks.clone());
    summary.add_env(SRE_URL_ENV.to_string(), definition.base_url.clone());
    summary.add_env(
        GROUP_NUMBER_ENV.to_string(),
        definition.group_number.to_string(),
    );

    summary
}
