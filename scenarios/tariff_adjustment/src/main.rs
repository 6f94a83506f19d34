use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use http_tunnel_runner::prelude::*;

mod accounts;
mod adjustment;

use accounts::select_account;
use adjustment::{AccountResponse, AdjustmentRequest, AdjustmentState, Fee};

/// How long the service is given to apply an accepted adjustment before it is read back.
const VERIFY_DELAY: Duration = Duration::from_secs(2);

const FEE_CHECK: &str = "account monthly_fee matches requested new_fee";

#[derive(Default, Debug)]
struct ScenarioValues {
    account_id: Option<String>,
}

impl UserValuesConstraint for ScenarioValues {}

#[derive(Default, Debug)]
struct WorkerValues {
    rejected: u64,
    mismatched: u64,
}

impl UserValuesConstraint for WorkerValues {}

type TariffRunnerContext = HttpRunnerContext<ScenarioValues>;
type TariffWorkerContext = WorkerContext<TariffRunnerContext, HttpWorkerContext<WorkerValues>>;

fn setup(ctx: &mut RunnerContext<TariffRunnerContext>) -> HookResult {
    let account_id = select_account(ctx.group_number());
    log::info!(
        "Group {} is adjusting account {}",
        ctx.group_number(),
        account_id
    );

    ctx.get_mut().scenario_values.account_id = Some(account_id.to_string());

    Ok(())
}

fn worker_setup(ctx: &mut TariffWorkerContext) -> HookResult {
    configure_http_client(ctx)?;
    Ok(())
}

fn worker_behaviour(ctx: &mut TariffWorkerContext) -> HookResult {
    let account_id = ctx
        .runner_context()
        .get()
        .scenario_values
        .account_id
        .clone()
        .context("No account selected, the setup hook did not run")?;

    let mut state = AdjustmentState::Start;
    while !state.is_terminal() {
        state = step(ctx, &account_id, state)?;
    }

    match state {
        AdjustmentState::AdjustRejected { status } => {
            log::debug!(
                "Adjustment for account {} rejected with status {}",
                account_id,
                status
            );
            ctx.get_mut().scenario_values.rejected += 1;
        }
        AdjustmentState::Mismatch => ctx.get_mut().scenario_values.mismatched += 1,
        _ => {}
    }

    Ok(())
}

/// Move an adjustment on by one state. Only the verification records a check.
fn step(
    ctx: &TariffWorkerContext,
    account_id: &str,
    state: AdjustmentState,
) -> TunnelResult<AdjustmentState> {
    let next = match state {
        AdjustmentState::Start => AdjustmentState::AdjustSent {
            fee: Fee::random(&mut rand::thread_rng()),
        },
        AdjustmentState::AdjustSent { fee } => {
            let response = http_post_json(
                ctx,
                &format!("/v1/accounts/{account_id}/tariff-adjustments"),
                &AdjustmentRequest {
                    new_fee: fee.value(),
                },
            )
            .context("Tariff adjustment request failed")?;

            AdjustmentState::on_adjust_response(fee, response.status())
        }
        AdjustmentState::AdjustAccepted { fee } => AdjustmentState::Wait { fee },
        AdjustmentState::Wait { fee } => {
            ctx.runner_context().executor().execute_in_place(async {
                tokio::time::sleep(VERIFY_DELAY).await;
                Ok(())
            })?;

            AdjustmentState::Verify { fee }
        }
        AdjustmentState::Verify { fee } => {
            let result = http_get(ctx, &format!("/v1/accounts/{account_id}"));
            if let Err(e) = &result {
                if e.is::<ShutdownSignalError>() {
                    return Err(ShutdownSignalError::default().into());
                }
            }

            let matched = ctx.check(FEE_CHECK, || {
                let response = match &result {
                    Ok(response) => response,
                    Err(e) => anyhow::bail!("Account read failed: {e}"),
                };
                if response.status() != 200 {
                    return Ok(false);
                }

                let account: AccountResponse = response.json()?;
                log::debug!(
                    "Account {} has monthly_fee {}, requested {}",
                    account_id,
                    account.monthly_fee,
                    fee
                );

                Ok(fee.matches(&account.monthly_fee))
            });

            // An unreachable service fails the iteration as well as the check
            result.context("Account read-back request failed")?;

            if matched {
                AdjustmentState::Verified
            } else {
                AdjustmentState::Mismatch
            }
        }
        terminal => terminal,
    };

    Ok(next)
}

fn worker_teardown(ctx: &mut TariffWorkerContext) -> HookResult {
    let values = &ctx.get().scenario_values;
    if values.rejected > 0 || values.mismatched > 0 {
        log::info!(
            "{} finished with {} rejected and {} mismatched adjustments",
            ctx.worker_id(),
            values.rejected,
            values.mismatched
        );
    }

    Ok(())
}

fn teardown(ctx: Arc<RunnerContext<TariffRunnerContext>>) -> HookResult {
    let checks = ctx.checks().report();
    if let Some(summary) = checks.get(FEE_CHECK) {
        log::info!(
            "Verified {} of {} adjustments in [{}] run {}",
            summary.passed,
            summary.total(),
            ctx.scenario_name(),
            ctx.run_id()
        );
    }

    Ok(())
}

fn scenario(
    builder: ScenarioDefinitionBuilder<TariffRunnerContext, HttpWorkerContext<WorkerValues>>,
) -> ScenarioDefinitionBuilder<TariffRunnerContext, HttpWorkerContext<WorkerValues>> {
    builder
        .with_default_workers(1)
        .with_default_duration_s(60)
        .use_setup(setup)
        .use_worker_setup(worker_setup)
        .use_worker_behaviour(worker_behaviour)
        .use_worker_teardown(worker_teardown)
        .use_teardown(teardown)
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

#[cfg(test)]
mod tests {
    use super::*;
    use accounts::ACCOUNT_IDS;
    use http_tunnel_runner::testing::{StubResponse, StubServer};
    use parking_lot::Mutex;
    use serde_json::json;

    fn test_cli(base_url: &str, group_number: u32) -> SreTunnelScenarioCli {
        SreTunnelScenarioCli {
            target_url: Some(base_url.to_string()),
            group_number: Some(group_number),
            iterations: Some(1),
            no_progress: true,
            reporter: ReporterOpt::Noop,
            no_summary: true,
            ..Default::default()
        }
    }

    fn run_against(server: &StubServer, group_number: u32) -> RunReport {
        let cli = test_cli(server.base_url(), group_number);
        run(scenario(ScenarioDefinitionBuilder::new("tariff_adjustment", cli))).unwrap()
    }

    /// A service that accepts every adjustment and answers the read-back with `read_back`.
    fn read_back_service(read_back: fn() -> StubResponse) -> StubServer {
        StubServer::start(move |request| match request.method.as_str() {
            "POST" => StubResponse::status(204),
            _ => read_back(),
        })
        .unwrap()
    }

    /// A service that accepts adjustments with `status` and reads back the last submitted fee
    /// rendered by `render`.
    fn account_service(status: u16, render: fn(f64) -> serde_json::Value) -> StubServer {
        let submitted = Arc::new(Mutex::new(None::<f64>));

        StubServer::start(move |request| match request.method.as_str() {
            "POST" => {
                *submitted.lock() = request
                    .json_body()
                    .and_then(|body| body["new_fee"].as_f64());
                StubResponse::status(status)
            }
            "GET" => match *submitted.lock() {
                Some(fee) => StubResponse::json(200, json!({ "monthly_fee": render(fee) })),
                None => StubResponse::status(404),
            },
            _ => StubResponse::status(405),
        })
        .unwrap()
    }

    #[test]
    fn accepted_adjustment_is_verified() {
        let server = account_service(204, |fee| json!(fee));

        let report = run_against(&server, 1);

        let check = report.checks.get(FEE_CHECK).unwrap();
        assert_eq!(1, check.passed);
        assert_eq!(0, check.failed);

        let requests = server.requests();
        assert_eq!(2, requests.len());
        assert_eq!("POST", requests[0].method);
        assert_eq!(
            format!("/v1/accounts/{}/tariff-adjustments", ACCOUNT_IDS[0]),
            requests[0].path()
        );
        let new_fee = requests[0].json_body().unwrap()["new_fee"].as_f64().unwrap();
        assert!((1.0..=20.0).contains(&new_fee));
        assert_eq!("GET", requests[1].method);
        assert_eq!(format!("/v1/accounts/{}", ACCOUNT_IDS[0]), requests[1].path());
    }

    #[test]
    fn fee_read_back_as_string_is_verified() {
        let server = account_service(200, |fee| json!(format!("{fee:.1}")));

        let report = run_against(&server, 1);

        assert_eq!(1, report.checks.get(FEE_CHECK).unwrap().passed);
    }

    #[test]
    fn fee_with_representation_noise_is_verified() {
        let server = account_service(204, |fee| json!(fee + 0.00000001));

        let report = run_against(&server, 1);

        assert_eq!(1, report.checks.get(FEE_CHECK).unwrap().passed);
    }

    #[test]
    fn different_fee_fails_the_check() {
        let server = account_service(204, |fee| json!(fee + 1.0));

        let report = run_against(&server, 1);

        let check = report.checks.get(FEE_CHECK).unwrap();
        assert_eq!(0, check.passed);
        assert_eq!(1, check.failed);
        assert!(!report.checks.all_passed());
    }

    #[test]
    fn rejected_adjustment_records_no_check() {
        let server = StubServer::with_status(400).unwrap();

        let report = run_against(&server, 1);

        assert!(report.checks.get(FEE_CHECK).is_none());
        assert_eq!(0, report.checks.total_recorded());
        assert_eq!(1, report.iterations);
        assert_eq!(0, report.failed_iterations);
        // Nothing is read back after a rejection
        assert_eq!(1, server.requests().len());
    }

    #[test]
    fn group_number_selects_account() {
        let server = StubServer::with_status(400).unwrap();

        run_against(&server, 3 + ACCOUNT_IDS.len() as u32);

        let requests = server.requests();
        assert_eq!(
            format!("/v1/accounts/{}/tariff-adjustments", ACCOUNT_IDS[2]),
            requests[0].path()
        );
    }

    #[test]
    fn dropped_read_back_fails_check_and_iteration() {
        let server = read_back_service(StubResponse::disconnect);

        let report = run_against(&server, 1);

        let check = report.checks.get(FEE_CHECK).unwrap();
        assert_eq!(0, check.passed);
        assert_eq!(1, check.failed);
        assert_eq!(1, report.iterations);
        assert_eq!(1, report.failed_iterations);
        assert_eq!(2, server.requests().len());
    }

    #[test]
    fn read_back_error_status_fails_the_check() {
        let server = read_back_service(|| StubResponse::status(500));

        let report = run_against(&server, 1);

        let check = report.checks.get(FEE_CHECK).unwrap();
        assert_eq!(1, check.failed);
        assert_eq!(1, report.iterations);
        assert_eq!(0, report.failed_iterations);
    }

    #[test]
    fn malformed_read_back_fails_the_check_and_run_continues() {
        let server = read_back_service(|| StubResponse::text(200, "{\"monthly_fee\": "));

        let cli = SreTunnelScenarioCli {
            iterations: Some(2),
            ..test_cli(server.base_url(), 1)
        };
        let report = run(scenario(ScenarioDefinitionBuilder::new("tariff_adjustment", cli))).unwrap();

        let check = report.checks.get(FEE_CHECK).unwrap();
        assert_eq!(0, check.passed);
        assert_eq!(2, check.failed);
        assert_eq!(2, report.iterations);
        assert_eq!(0, report.failed_iterations);
        assert_eq!(4, server.requests().len());
    }
}
