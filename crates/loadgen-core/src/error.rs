use thiserror::Error;

/// Errors that stop a run before or outside of load generation.
///
/// Failures of individual load requests never surface here; they are
/// counted in the metrics sink instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Server health check failed: {0}")]
    HealthCheckStatus(u16),

    #[error("cannot reach server at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: ClientError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::transport(format!("request timed out: {e}"))
        } else {
            Self::transport(e.to_string())
        }
    }
}
