use crate::ApiErrorBody;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (connection refused, timeout,
    /// TLS failure, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status. The raw body is kept
    /// so callers can read the API's machine-readable error code.
    #[error("server responded with status {status}")]
    Status { status: u16, body: Vec<u8> },

    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body was not what the caller expected.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The configured base URL is not usable.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Returns the HTTP status for [`TransportError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parses the API error body carried by a [`TransportError::Status`].
    ///
    /// Returns `None` for other variants and for bodies that are not the
    /// API's `{ "code": ..., "message": ... }` shape.
    pub fn error_body(&self) -> Option<ApiErrorBody> {
        match self {
            Self::Status { body, .. } => serde_json::from_slice(body).ok(),
            _ => None,
        }
    }

    /// Shorthand for the machine-readable reason code, e.g. `token.expired`.
    pub fn reason_code(&self) -> Option<String> {
        self.error_body().and_then(|body| body.code)
    }
}
