use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use sre_tunnel_instruments::{report_operation_outcome, OperationRecord, Reporter};

use crate::error::HttpError;
use crate::response::HttpResponse;

/// An HTTP client that reports the duration and outcome of every request.
///
/// Requests are never retried. A request that cannot be completed fails with
/// [HttpError::Network] and the caller decides what to do with it.
#[derive(Debug, Clone)]
pub struct HttpClientInstrumented {
    inner: Client,
    reporter: Arc<Reporter>,
}

impl HttpClientInstrumented {
    pub fn new(reporter: Arc<Reporter>, timeout: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::Build)?;

        Ok(Self { inner, reporter })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.send("http_get", url, self.inner.get(url)).await
    }

    /// POST `body` serialized as JSON, with `Content-Type: application/json`.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        self.post(url, Some(body), headers).await
    }

    /// POST with an optional JSON body and extra headers.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: Option<&T>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut request = self.inner.post(url);

        for (name, value) in headers {
            let invalid = || HttpError::InvalidHeader {
                name: name.to_string(),
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            request = request.header(header_name, header_value);
        }

        if let Some(body) = body {
            let payload =
                serde_json::to_vec(body).map_err(|source| HttpError::Serialization {
                    url: url.to_string(),
                    source,
                })?;
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(payload);
        }

        self.send("http_post", url, request).await
    }

    async fn send(
        &self,
        operation_id: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<HttpResponse, HttpError> {
        let mut operation_record = OperationRecord::new(operation_id);
        operation_record.add_attr("path", path_of(url));

        let result = exchange(url, request).await;

        let is_error = match &result {
            Ok(response) => response.status() >= 500,
            Err(_) => true,
        };
        report_operation_outcome(&self.reporter, operation_record, is_error);

        match &result {
            Err(e) if e.is_timeout() => log::warn!("{operation_id} timed out: {e}"),
            Err(e) => log::debug!("{operation_id} failed: {e}"),
            Ok(_) => {}
        }

        result
    }
}

async fn exchange(url: &str, request: RequestBuilder) -> Result<HttpResponse, HttpError> {
    let network_error = |source| HttpError::Network {
        url: url.to_string(),
        source,
    };

    let response = request.send().await.map_err(network_error)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(network_error)?;

    Ok(HttpResponse::new(url, status, body))
}

/// The path of `url`, used to group operations in reports. Query strings are dropped so that
/// different search terms are reported together.
fn path_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sre_tunnel_instruments::ReportConfig;

    #[test]
    fn path_ignores_query() {
        assert_eq!("/v1/search", path_of("http://localhost:8081/v1/search?term=checking"));
        assert_eq!("/v1/report", path_of("/v1/report?x=1"));
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let reporter = Arc::new(ReportConfig::default().init());
        let client = HttpClientInstrumented::new(reporter, Duration::from_secs(2)).unwrap();

        // Nothing listens on port 1
        let result = client.get("http://127.0.0.1:1/v1/report").await;

        let err = result.unwrap_err();
        assert!(err.is_network(), "unexpected error {err:?}");
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let reporter = Arc::new(ReportConfig::default().init());
        let client = HttpClientInstrumented::new(reporter, Duration::from_millis(200)).unwrap();

        // Connections queue in the backlog but are never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/report", listener.local_addr().unwrap());

        let err = client.get(&url).await.unwrap_err();

        assert!(err.is_network(), "unexpected error {err:?}");
        assert!(err.is_timeout(), "unexpected error {err:?}");
    }

    #[tokio::test]
    async fn invalid_header_is_rejected_before_sending() {
        let reporter = Arc::new(ReportConfig::default().init());
        let client = HttpClientInstrumented::new(reporter, Duration::from_secs(2)).unwrap();

        let result = client
            .post_json(
                "http://127.0.0.1:1/v1/accounts/a/tariff-adjustments",
                &serde_json::json!({ "new_fee": 15.5 }),
                &[("bad header", "x")],
            )
            .await;

        assert!(matches!(result, Err(HttpError::InvalidHeader { .. })));
    }
}
