// Error taxonomy for rlsprobe
//
// Retried: Transport, RateLimited, ServerFault. Terminal per entity:
// ClientRejection. Aborts the run: ConnectionFailed, SchemaUnavailable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Network/transport fault below the HTTP layer
    #[error("network error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Target kept answering 429 until attempts ran out
    #[error("rate limited by {url}")]
    RateLimited { url: String },

    /// 5xx from the target
    #[error("server fault HTTP {status} from {url}")]
    ServerFault { url: String, status: u16 },

    /// Non-retryable 4xx other than 401/403
    #[error("request rejected with HTTP {status} by {url}")]
    ClientRejection { url: String, status: u16 },

    /// Root schema endpoint answered non-2xx
    #[error("schema document unavailable (HTTP {status})")]
    SchemaUnavailable { status: u16 },

    /// Connection test failed before enumeration
    #[error("connection test failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Credential failed shape validation
    #[error("invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// Underlying HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ScanError {
    /// HTTP status attached to this error, when one exists
    pub fn status(&self) -> Option<u16> {
        match self {
            ScanError::ServerFault { status, .. }
            | ScanError::ClientRejection { status, .. }
            | ScanError::SchemaUnavailable { status } => Some(*status),
            _ => None,
        }
    }
}
