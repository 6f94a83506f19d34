use http_tunnel_runner::prelude::*;

fn worker_setup(ctx: &mut WorkerContext<HttpRunnerContext, HttpWorkerContext>) -> HookResult {
    configure_http_client(ctx)?;
    Ok(())
}

fn worker_behaviour(ctx: &mut WorkerContext<HttpRunnerContext, HttpWorkerContext>) -> HookResult {
    let result = http_get(ctx, "/v1/report");
    check_status(ctx, "report status 200", &result, 200);
    result?;

    Ok(())
}

fn scenario(
    builder: ScenarioDefinitionBuilder<HttpRunnerContext, HttpWorkerContext>,
) -> ScenarioDefinitionBuilder<HttpRunnerContext, HttpWorkerContext> {
    builder
        .with_default_workers(10)
        .with_default_duration_s(30)
        .use_worker_setup(worker_setup)
        .use_worker_behaviour(worker_behaviour)
}

fn main() -> TunnelResult<()> {
    let builder = scenario(ScenarioDefinitionBuilder::new_with_init(env!(
        "CARGO_PKG_NAME"
    )));

    let report = run(builder)?;
    if !report.checks.all_passed() {
        anyhow::bail!(
            "{} of {} checks failed",
            report.checks.total_failed(),
            report.checks.total_recorded()
        );
    }

    Ok(())
}
