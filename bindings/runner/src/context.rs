use anyhow::Context;
use http_client_instrumented::prelude::HttpClient;
use sre_tunnel_runner::prelude::UserValuesConstraint;

#[derive(Default, Debug)]
pub struct DefaultScenarioValues {}

impl UserValuesConstraint for DefaultScenarioValues {}

/// Per-worker values for HTTP scenarios.
#[derive(Default, Debug)]
pub struct HttpWorkerContext<SV: UserValuesConstraint = DefaultScenarioValues> {
    pub(crate) http_client: Option<HttpClient>,
    pub scenario_values: SV,
}

impl<SV: UserValuesConstraint> UserValuesConstraint for HttpWorkerContext<SV> {}

impl<SV: UserValuesConstraint> HttpWorkerContext<SV> {
    /// Get the HTTP client for this worker.
    ///
    /// Fails if [crate::prelude::configure_http_client] has not been called in the worker setup.
    pub fn http_client(&self) -> anyhow::Result<HttpClient> {
        self.http_client
            .clone()
            .context("HTTP client is not configured, call 'configure_http_client' in the worker setup")
    }
}
