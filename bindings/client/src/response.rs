use std::borrow::Cow;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::HttpError;

/// A completed HTTP exchange.
///
/// The body is kept as raw bytes. It is only parsed when [HttpResponse::json] or
/// [HttpResponse::json_value] is called, so a malformed body is only an error for callers that
/// look at it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    url: String,
    status: u16,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserialize the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|source| HttpError::Deserialization {
            url: self.url.clone(),
            source,
        })
    }

    /// Deserialize the body without a fixed shape.
    pub fn json_value(&self) -> Result<serde_json::Value, HttpError> {
        self.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Account {
        monthly_fee: f64,
    }

    #[test]
    fn typed_body() {
        let response = HttpResponse::new(
            "http://localhost:8081/v1/accounts/a",
            200,
            r#"{"id":"a","monthly_fee":15.5}"#,
        );

        let account: Account = response.json().unwrap();
        assert_eq!(15.5, account.monthly_fee);
        assert!(response.is_success());
    }

    #[test]
    fn malformed_body_fails_only_when_read() {
        let response = HttpResponse::new("http://localhost:8081/v1/report", 200, "<html>");

        assert_eq!(200, response.status());
        assert_eq!("<html>", response.text());
        assert!(matches!(
            response.json_value(),
            Err(HttpError::Deserialization { .. })
        ));
    }

    #[test]
    fn empty_body_is_not_json() {
        let response = HttpResponse::new("http://localhost:8081/v1/x", 204, Bytes::new());
        assert!(response.json_value().is_err());
        assert!(response.is_success());
    }
}
