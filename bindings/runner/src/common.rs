use anyhow::Context;
use http_client_instrumented::prelude::{HttpClient, HttpResponse};
use serde::Serialize;
use sre_tunnel_runner::prelude::{
    HookResult, ShutdownSignalError, TunnelResult, UserValuesConstraint, WorkerContext,
};

use crate::context::HttpWorkerContext;

/// Creates the HTTP client for this worker and stores it in the [HttpWorkerContext].
///
/// Call this from the worker setup hook. The client reports every request to the run's reporter
/// and uses the request timeout configured for the run.
///
/// ```rust
/// use http_tunnel_runner::prelude::*;
///
/// fn worker_setup(ctx: &mut WorkerContext<HttpRunnerContext, HttpWorkerContext>) -> HookResult {
///     configure_http_client(ctx)?;
///     Ok(())
/// }
/// ```
pub fn configure_http_client<RV: UserValuesConstraint, SV: UserValuesConstraint>(
    ctx: &mut WorkerContext<RV, HttpWorkerContext<SV>>,
) -> HookResult {
    let reporter = ctx.runner_context().reporter();
    let timeout = ctx.runner_context().request_timeout();

    let client = HttpClient::new(reporter, timeout).context("Failed to build HTTP client")?;
    log::debug!("Configured HTTP client for {}", ctx.worker_id());

    ctx.get_mut().http_client = Some(client);

    Ok(())
}

/// `GET` a path relative to the base URL of the run, blocking until the response is read.
///
/// Network failures are returned as errors. Any status code is a successful exchange, it is up to
/// the caller to check it.
pub fn http_get<RV: UserValuesConstraint, SV: UserValuesConstraint>(
    ctx: &WorkerContext<RV, HttpWorkerContext<SV>>,
    path: &str,
) -> TunnelResult<HttpResponse> {
    let client = ctx.get().http_client()?;
    let url = ctx.runner_context().url(path);

    ctx.runner_context()
        .executor()
        .execute_in_place(async move { Ok(client.get(&url).await?) })
}

/// `POST` a JSON body to a path relative to the base URL of the run, blocking until the response
/// is read.
pub fn http_post_json<RV, SV, T>(
    ctx: &WorkerContext<RV, HttpWorkerContext<SV>>,
    path: &str,
    body: &T,
) -> TunnelResult<HttpResponse>
where
    RV: UserValuesConstraint,
    SV: UserValuesConstraint,
    T: Serialize + ?Sized,
{
    let client = ctx.get().http_client()?;
    let url = ctx.runner_context().url(path);

    ctx.runner_context()
        .executor()
        .execute_in_place(async move { Ok(client.post_json(&url, body, &[]).await?) })
}

/// Record a check that passes when `result` is a response with the `expected` status.
///
/// A failed request is a failed check. An interrupted request records nothing, the run is
/// stopping anyway.
pub fn check_status<RV: UserValuesConstraint, V: UserValuesConstraint>(
    ctx: &WorkerContext<RV, V>,
    label: &str,
    result: &TunnelResult<HttpResponse>,
    expected: u16,
) -> bool {
    if let Err(e) = result {
        if e.is::<ShutdownSignalError>() {
            return false;
        }
    }

    ctx.check(label, || match result {
        Ok(response) => Ok(response.status() == expected),
        Err(e) => Err(anyhow::anyhow!("Request failed: {e}")),
    })
}
