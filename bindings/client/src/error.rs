/// Failures of a single HTTP exchange. None of these are fatal to a run, the runner records them
/// as failed iterations.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// Connection refused, DNS failure, timeout or a body that could not be read.
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to serialize request body for {url}: {source}")]
    Serialization {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// The response body was accessed as JSON but is not valid JSON of the requested shape.
    #[error("Response body from {url} could not be deserialized: {source}")]
    Deserialization {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid header [{name}]")]
    InvalidHeader { name: String },
}

impl HttpError {
    pub fn is_network(&self) -> bool {
        matches!(self, HttpError::Network { .. })
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            HttpError::Network { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
