use std::sync::Arc;

use sre_tunnel_runner::prelude::{
    run, HookResult, ReporterOpt, RunError, RunnerContext, ScenarioDefinitionBuilder,
    SreTunnelScenarioCli, UserValuesConstraint, WorkerBailError, WorkerContext,
};

#[derive(Default, Debug)]
struct RunnerContextValue {}

impl UserValuesConstraint for RunnerContextValue {}

#[derive(Default, Debug)]
struct WorkerContextValue {
    value: i32,
}

impl UserValuesConstraint for WorkerContextValue {}

fn sample_cli_cfg() -> SreTunnelScenarioCli {
    SreTunnelScenarioCli {
        target_url: Some("http://localhost:1".to_string()),
        no_progress: true,
        reporter: ReporterOpt::Noop,
        no_summary: true,
        ..Default::default()
    }
}

fn noop_behaviour(_ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>) -> HookResult {
    Ok(())
}

#[test]
fn propagate_error_in_setup_hook() {
    fn setup(_ctx: &mut RunnerContext<RunnerContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in setup hook"))
    }

    fn worker_behaviour(
        _ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>,
    ) -> HookResult {
        panic!("No worker should start when setup fails");
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "propagate_error_in_setup_hook",
        sample_cli_cfg(),
    )
    .with_default_duration_s(5)
    .use_setup(setup)
    .use_worker_behaviour(worker_behaviour);

    let result = run(scenario);

    let err = result.unwrap_err();
    match err.downcast_ref::<RunError>() {
        Some(RunError::Setup(inner)) => assert_eq!("Error in setup hook", inner.to_string()),
        other => panic!("Expected a setup error, got {other:?}"),
    }
}

#[test]
fn reject_invalid_configuration_before_setup() {
    fn setup(_ctx: &mut RunnerContext<RunnerContextValue>) -> HookResult {
        panic!("Setup should not run for an invalid configuration");
    }

    let mut cfg = sample_cli_cfg();
    cfg.workers = Some(0);
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "reject_invalid_configuration_before_setup",
        cfg,
    )
    .with_default_duration_s(5)
    .use_setup(setup)
    .use_worker_behaviour(noop_behaviour);

    let err = run(scenario).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::Configuration(_))
    ));
}

#[test]
fn capture_error_in_worker_setup() {
    fn worker_setup(_ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in worker setup hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "capture_error_in_worker_setup",
        sample_cli_cfg(),
    )
    .with_default_duration_s(5)
    .use_worker_setup(worker_setup)
    .use_worker_behaviour(noop_behaviour);

    let report = run(scenario).unwrap();

    assert_eq!(1, report.workers_spawned);
    assert_eq!(0, report.workers_completed);
    assert_eq!(0, report.iterations);
}

#[test]
fn capture_error_in_worker_behaviour_and_continue() {
    fn worker_behaviour(
        ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>,
    ) -> HookResult {
        if ctx.get().value < 5 {
            ctx.get_mut().value += 1;
        } else {
            // Save time running this test by shutting down once this has run a few times.
            ctx.runner_context().force_stop_scenario();
        }

        Err(anyhow::anyhow!("Error in worker behaviour hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "capture_error_in_worker_behaviour_and_continue",
        sample_cli_cfg(),
    )
    .with_default_duration_s(5)
    .use_worker_behaviour(worker_behaviour);

    let report = run(scenario).unwrap();

    assert_eq!(6, report.iterations);
    assert_eq!(6, report.failed_iterations);
    assert_eq!(1, report.workers_completed);
}

#[test]
fn capture_panic_in_worker_behaviour_and_continue() {
    fn worker_behaviour(
        ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>,
    ) -> HookResult {
        ctx.get_mut().value += 1;
        if ctx.get().value % 2 == 0 {
            panic!("Panic in worker behaviour hook");
        }
        Ok(())
    }

    let mut cfg = sample_cli_cfg();
    cfg.iterations = Some(10);
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "capture_panic_in_worker_behaviour_and_continue",
        cfg,
    )
    .use_worker_behaviour(worker_behaviour);

    let report = run(scenario).unwrap();

    assert_eq!(10, report.iterations);
    assert_eq!(5, report.failed_iterations);
}

#[test]
fn bail_error_stops_only_that_worker() {
    fn worker_behaviour(
        ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>,
    ) -> HookResult {
        if ctx.worker_id() == "worker-0" {
            return Err(WorkerBailError::default().into());
        }

        ctx.get_mut().value += 1;
        // Keep going until the other worker has bailed
        if ctx.get().value >= 20 && ctx.runner_context().report().failed_iterations == 1 {
            ctx.runner_context().force_stop_scenario();
        }
        Ok(())
    }

    let mut cfg = sample_cli_cfg();
    cfg.workers = Some(2);
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "bail_error_stops_only_that_worker",
        cfg,
    )
    .with_default_duration_s(5)
    .use_worker_behaviour(worker_behaviour);

    let report = run(scenario).unwrap();

    assert_eq!(2, report.workers_spawned);
    assert_eq!(1, report.workers_completed);
    assert_eq!(1, report.failed_iterations);
    assert!(report.iterations >= 21);
}

#[test]
fn capture_error_in_worker_teardown() {
    fn worker_teardown(
        _ctx: &mut WorkerContext<RunnerContextValue, WorkerContextValue>,
    ) -> HookResult {
        Err(anyhow::anyhow!("Error in worker teardown hook"))
    }

    let mut cfg = sample_cli_cfg();
    cfg.iterations = Some(3);
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "capture_error_in_worker_teardown",
        cfg,
    )
    .use_worker_behaviour(noop_behaviour)
    .use_worker_teardown(worker_teardown);

    let result = run(scenario);

    assert!(result.is_ok());
}

#[test]
fn capture_error_in_teardown() {
    fn teardown(_ctx: Arc<RunnerContext<RunnerContextValue>>) -> HookResult {
        Err(anyhow::anyhow!("Error in teardown hook"))
    }

    let mut cfg = sample_cli_cfg();
    cfg.iterations = Some(3);
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, WorkerContextValue>::new(
        "capture_error_in_teardown",
        cfg,
    )
    .use_worker_behaviour(noop_behaviour)
    .use_teardown(teardown);

    let result = run(scenario);

    assert!(result.is_ok());
}
