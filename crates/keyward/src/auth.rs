//! Signing in and out, and the authentication state pages read.

use keyward_claims::{Claims, Requirements, User, has_access};
use keyward_transport::{ApiRequest, HttpTransport};
use serde::{Deserialize, Serialize};

use crate::{ApiClient, ClientError};

/// What the user types into the sign-in form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Response of the sign-in endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    token: String,
    refresh_token: String,
    #[serde(flatten)]
    claims: Claims,
}

/// Who, if anyone, is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    user: Option<User>,
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns `true` if a user is signed in and their claims satisfy
    /// `requirements`. Always `false` while anonymous.
    pub fn can(&self, requirements: &Requirements) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| has_access(&user.claims, requirements))
    }

    /// Renders a fragment only for users who satisfy `requirements`.
    ///
    /// ```rust
    /// use keyward::{AuthState, Requirements};
    ///
    /// let state = AuthState::anonymous();
    /// let metrics = state.gate(&Requirements::new().permission("metrics.list"), || "<Metrics />");
    /// assert_eq!(metrics, None);
    /// ```
    pub fn gate<R>(&self, requirements: &Requirements, render: impl FnOnce() -> R) -> Option<R> {
        self.can(requirements).then(render)
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Signs in with `credentials`.
    ///
    /// Both tokens are persisted with the configured retention window, the
    /// new access token becomes the default bearer, and an interactive
    /// client navigates to the landing page.
    ///
    /// The call bypasses the refresh pipeline: a 401 here means wrong
    /// credentials, not a session to end.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<User, ClientError> {
        let request = ApiRequest::post(self.inner.endpoints.sign_in.as_str()).json(credentials)?;
        let session: SignInResponse = self
            .inner
            .transport
            .send(request)
            .await?
            .error_for_status()?
            .json()?;

        self.persist_tokens(&session.token, &session.refresh_token)?;
        self.set_default_token(Some(session.token));
        tracing::info!(email = %credentials.email, "signed in");

        if let Some(navigator) = &self.inner.navigator {
            navigator.navigate(&self.inner.config.landing_path);
        }

        Ok(User {
            email: credentials.email.clone(),
            claims: session.claims,
        })
    }

    /// Fetches the signed-in user from the identity endpoint.
    pub async fn current_user(&self) -> Result<User, ClientError> {
        let request = ApiRequest::get(self.inner.endpoints.identity.as_str());
        Ok(self.request(request).await?.json()?)
    }

    /// Rebuilds the authentication state at startup.
    ///
    /// Anonymous when there is no access token. Otherwise asks the API who
    /// the token belongs to; if that fails for any reason the session is
    /// ended and the state is anonymous.
    pub async fn restore_session(&self) -> AuthState {
        if self
            .inner
            .store
            .get(&self.inner.config.access_token_name)
            .is_none()
        {
            return AuthState::anonymous();
        }

        match self.current_user().await {
            Ok(user) => {
                tracing::debug!(email = %user.email, "session restored");
                AuthState::signed_in(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session");
                if let Err(e) = self.end_active_session() {
                    tracing::warn!(error = %e, "failed to clear session cookies");
                }
                AuthState::anonymous()
            }
        }
    }

    /// Ends the session: an interactive client clears the cookies, tells
    /// the other tabs and navigates to the entry page; a server-side one
    /// only clears the cookies.
    pub fn sign_out(&self) -> Result<(), ClientError> {
        tracing::info!("signing out");
        Ok(self.end_session()?)
    }
}
