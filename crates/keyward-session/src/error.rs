//! Error types for the session layer.

use std::sync::Arc;

use keyward_store::StoreError;
use keyward_transport::TransportError;

/// Errors that can end a token refresh.
///
/// One refresh failure is delivered to every request that was waiting on
/// it, so this type is `Clone`; the transport error is shared behind an
/// `Arc` rather than copied.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    /// There is no refresh token to exchange.
    #[error("no refresh token in the session store")]
    MissingRefreshToken,

    /// The refresh endpoint failed or rejected the refresh token.
    #[error("refresh request failed: {0}")]
    Transport(#[source] Arc<TransportError>),

    /// The new tokens could not be persisted.
    #[error("failed to persist refreshed tokens: {0}")]
    Store(#[from] StoreError),

    /// The task driving the refresh was dropped before it settled.
    #[error("refresh abandoned before it settled")]
    Abandoned,
}

impl RefreshError {
    /// Returns `true` when the refresh can never succeed for this session:
    /// the refresh token is missing or the API answered 401 to it.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::MissingRefreshToken => true,
            Self::Transport(e) => e.status() == Some(401),
            Self::Store(_) | Self::Abandoned => false,
        }
    }
}

impl From<TransportError> for RefreshError {
    fn from(e: TransportError) -> Self {
        Self::Transport(Arc::new(e))
    }
}
