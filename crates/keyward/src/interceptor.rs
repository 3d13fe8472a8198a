//! The authenticated request pipeline.
//!
//! Every call made through [`ApiClient::request`] passes through here:
//!
//! ```text
//!   send ──→ 2xx ─────────────────────────────→ Ok(response)
//!     │
//!     ├──→ 401 token.expired ──→ refresh (single-flight) ──→ replay once
//!     │                                   │                     │
//!     │                                   └─ failed ──→ Err     ├─ 2xx → Ok
//!     │                                                         └─ 401 → terminal
//!     ├──→ 401 anything else ──→ terminal
//!     │
//!     └──→ other status / no response ──→ Err, unchanged
//! ```
//!
//! Terminal means the session is over. An interactive client tears it down
//! (clear cookies, tell the other tabs, go to the entry page) and returns
//! the original error; a server-side client returns [`AuthTokenError`] and
//! leaves the redirect to its caller.

use keyward_transport::{ApiErrorBody, ApiRequest, ApiResponse, HttpTransport, TransportError};

use crate::client::EXPIRED_TOKEN_CODE;
use crate::{ApiClient, AuthTokenError, ClientError};

/// What to do with a response.
#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Success,
    Expired,
    Terminal(Option<String>),
    Failure,
}

fn classify(response: &ApiResponse) -> Disposition {
    if response.is_success() {
        return Disposition::Success;
    }
    if response.status != 401 {
        return Disposition::Failure;
    }
    let code = response
        .json::<ApiErrorBody>()
        .ok()
        .and_then(|body| body.code);
    match code.as_deref() {
        Some(EXPIRED_TOKEN_CODE) => Disposition::Expired,
        _ => Disposition::Terminal(code),
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Sends `request` with the session's bearer token.
    ///
    /// An expired token is refreshed (once per cycle, however many requests
    /// hit it) and the request replayed with the new token. A request is
    /// never refreshed twice: a replay that is still unauthorized is
    /// terminal.
    ///
    /// # Errors
    /// - [`ClientError::Transport`] for non-success statuses and failed
    ///   calls, including a terminal 401 in an interactive context (after
    ///   teardown)
    /// - [`ClientError::AuthToken`] for a terminal 401 in a server context
    /// - [`ClientError::Refresh`] if the refresh this request waited on
    ///   failed
    pub async fn request(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        if request.bearer().is_none() {
            if let Some(token) = self.current_bearer() {
                request.set_bearer(&token);
            }
        }

        let response = self.inner.transport.send(request.clone()).await?;
        match classify(&response) {
            Disposition::Success => Ok(response),
            Disposition::Expired => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    "access token expired"
                );
                self.replay(request).await
            }
            Disposition::Terminal(reason) => Err(self.terminal(response, reason)),
            Disposition::Failure => Err(status_error(response).into()),
        }
    }

    /// Waits for a refreshed token and resubmits `request` with it.
    async fn replay(&self, mut request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let pair = self
            .inner
            .coordinator
            .request_refresh(|| self.refresh_tokens())
            .await?;

        request.set_bearer(&pair.token);
        tracing::debug!(method = %request.method, path = %request.path, "replaying request");
        let response = self.inner.transport.send(request).await?;
        match classify(&response) {
            Disposition::Success => Ok(response),
            Disposition::Expired => {
                Err(self.terminal(response, Some(EXPIRED_TOKEN_CODE.to_string())))
            }
            Disposition::Terminal(reason) => Err(self.terminal(response, reason)),
            Disposition::Failure => Err(status_error(response).into()),
        }
    }

    /// Applies the terminal authentication policy for this context.
    fn terminal(&self, response: ApiResponse, reason: Option<String>) -> ClientError {
        tracing::warn!(
            reason = reason.as_deref().unwrap_or("unknown"),
            interactive = self.is_interactive(),
            "session rejected by api"
        );

        if self.is_interactive() {
            if let Err(e) = self.end_active_session() {
                tracing::warn!(error = %e, "failed to clear session cookies");
            }
            status_error(response).into()
        } else {
            AuthTokenError::new(reason).into()
        }
    }
}

fn status_error(response: ApiResponse) -> TransportError {
    TransportError::Status {
        status: response.status,
        body: response.body,
    }
}
