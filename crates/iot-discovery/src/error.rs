use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Certificate, key or CA bundle could not be loaded.
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request never produced an HTTP response.
    #[error("discovery request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-200 status.
    #[error("discovery failed with HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed discovery response: {0}")]
    Decode(String),
}

impl DiscoveryError {
    /// HTTP status carried by the error, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
