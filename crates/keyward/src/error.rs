//! Unified error type for Keyward.

use keyward_claims::DecodeError;
use keyward_session::RefreshError;
use keyward_store::StoreError;
use keyward_transport::TransportError;

/// The API rejected the session outright (a 401 that is not a plain
/// expiry) while no interactive teardown was available.
///
/// Server-side callers receive this instead of a browser-style sign-out;
/// route guards turn it into "clear cookies, redirect to the entry page".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("authentication token rejected: {reason}")]
pub struct AuthTokenError {
    /// The API's reason code, or `unknown` if it gave none.
    pub reason: String,
}

impl AuthTokenError {
    pub fn new(reason: Option<String>) -> Self {
        Self {
            reason: reason.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The call failed or the API answered with a non-success status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Terminal authentication failure in a non-interactive context.
    #[error(transparent)]
    AuthToken(#[from] AuthTokenError),

    /// The token refresh this request waited on failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Tokens could not be written or cleared.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored token's claims could not be read.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ClientError {
    /// Returns `true` if the session can no longer be used and the user
    /// has to sign in again.
    pub fn is_session_lost(&self) -> bool {
        match self {
            Self::AuthToken(_) => true,
            Self::Refresh(e) => e.is_rejection(),
            Self::Transport(_) | Self::Store(_) | Self::Decode(_) => false,
        }
    }

    /// The HTTP status behind this error, if the API produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}
