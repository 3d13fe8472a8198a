//! `ApiClient` and its builder.
//!
//! An `ApiClient` is one execution context's view of the API: a transport,
//! the store its tokens live in, and the refresh coordinator that keeps
//! concurrent expiries down to a single refresh. Browser-like contexts
//! also carry a [`SessionTerminator`]; server contexts do not.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use keyward_claims::{Claims, decode};
use keyward_session::{
    InteractiveTerminator, Navigator, RefreshCoordinator, RefreshError, SessionBus, SessionConfig,
    SessionTerminator, Teardown, TokenPair, clear_tokens, listen_for_sign_out,
};
use keyward_store::{BrowserJar, RequestContext, SessionStore, StoreError};
use keyward_transport::{ApiRequest, HttpTransport};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::ClientError;

/// The API's reason code for an access token that is merely out of date.
pub const EXPIRED_TOKEN_CODE: &str = "token.expired";

/// Paths of the endpoints Keyward talks to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `POST {email, password}` → tokens and claims.
    pub sign_in: String,
    /// `GET` → the signed-in user.
    pub identity: String,
    /// `POST {refreshToken}` → a new token pair.
    pub refresh: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sign_in: "/sessions".to_string(),
            identity: "/me".to_string(),
            refresh: "/refresh".to_string(),
        }
    }
}

impl Endpoints {
    /// Makes every path absolute.
    pub fn validated(mut self) -> Self {
        for path in [&mut self.sign_in, &mut self.identity, &mut self.refresh] {
            if !path.starts_with('/') {
                path.insert(0, '/');
            }
        }
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

pub(crate) struct Inner<T> {
    pub(crate) transport: T,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) config: SessionConfig,
    pub(crate) endpoints: Endpoints,
    /// Bearer attached to requests that do not set their own.
    default_token: RwLock<Option<String>>,
    pub(crate) coordinator: RefreshCoordinator,
    pub(crate) terminator: Option<Arc<dyn SessionTerminator>>,
    pub(crate) navigator: Option<Arc<dyn Navigator>>,
    bus: Option<Arc<SessionBus>>,
    teardown: Option<Arc<Teardown>>,
    /// Held while deciding whether the session still needs ending.
    ending: Mutex<()>,
}

/// A session-aware API client.
///
/// Cheap to clone; clones share the store, the default bearer and the
/// refresh coordinator.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use keyward::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let client = ApiClient::builder()
///     .store(Arc::new(BrowserJar::new()))
///     .build(ReqwestTransport::new("http://localhost:3333")?);
///
/// let user = client
///     .sign_in(&Credentials::new("diego@example.com", "123456"))
///     .await?;
/// println!("signed in as {}", user.email);
/// # Ok(())
/// # }
/// ```
pub struct ApiClient<T> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ApiClient<()> {
    /// Creates a new builder.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Builds a client for one server-side request.
    ///
    /// Tokens are read from and written to `ctx`, and a terminal
    /// authentication failure surfaces as [`crate::AuthTokenError`].
    pub fn for_request(ctx: RequestContext, config: SessionConfig, transport: T) -> Self {
        ApiClientBuilder::new()
            .config(config)
            .store(Arc::new(ctx))
            .build(transport)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    /// The coordinator deduplicating this client's refreshes.
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Returns `true` if this client tears the session down itself on a
    /// terminal authentication failure.
    pub fn is_interactive(&self) -> bool {
        self.inner.terminator.is_some()
    }

    /// The bearer token attached to outgoing requests.
    pub fn default_token(&self) -> Option<String> {
        self.inner
            .default_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The bearer for the next request.
    ///
    /// The store wins over the cached default: another client sharing the
    /// store may have refreshed the pair since this one last looked.
    pub(crate) fn current_bearer(&self) -> Option<String> {
        let cached = self.default_token();
        match self.inner.store.get(&self.inner.config.access_token_name) {
            Some(stored) if cached.as_deref() != Some(stored.as_str()) => {
                self.set_default_token(Some(stored.clone()));
                Some(stored)
            }
            _ => cached,
        }
    }

    pub(crate) fn set_default_token(&self, token: Option<String>) {
        *self
            .inner
            .default_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Decodes the claims embedded in the stored access token.
    ///
    /// Returns `Ok(None)` when there is no access token. The signature is
    /// not verified.
    pub fn token_claims(&self) -> Result<Option<Claims>, ClientError> {
        match self.inner.store.get(&self.inner.config.access_token_name) {
            Some(token) => Ok(Some(decode(&token)?)),
            None => Ok(None),
        }
    }

    /// Starts tearing this context down whenever another tab signs out.
    ///
    /// Returns `None` for a client built without a bus.
    pub fn listen_for_sign_out(&self) -> Option<JoinHandle<()>> {
        match (&self.inner.bus, &self.inner.teardown) {
            (Some(bus), Some(teardown)) => Some(listen_for_sign_out(bus, Arc::clone(teardown))),
            _ => None,
        }
    }

    /// Writes both tokens with the configured retention window and path.
    pub(crate) fn persist_tokens(
        &self,
        token: &str,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        let options = self.inner.config.cookie_options();
        self.inner
            .store
            .set(&self.inner.config.access_token_name, token, &options)?;
        self.inner
            .store
            .set(&self.inner.config.refresh_token_name, refresh_token, &options)
    }

    pub(crate) fn has_session_cookies(&self) -> bool {
        let config = &self.inner.config;
        self.inner.store.get(&config.access_token_name).is_some()
            || self.inner.store.get(&config.refresh_token_name).is_some()
    }

    /// Ends the session the way this context can: full teardown and
    /// broadcast when interactive, clearing the cookies otherwise.
    pub(crate) fn end_session(&self) -> Result<(), StoreError> {
        self.set_default_token(None);
        match &self.inner.terminator {
            Some(terminator) => terminator.terminate(),
            None => clear_tokens(self.inner.store.as_ref(), &self.inner.config),
        }
    }

    /// Ends the session unless it is already over.
    ///
    /// Concurrent terminal failures race here; only the first still finds
    /// session cookies, so teardown and its broadcast happen once.
    pub(crate) fn end_active_session(&self) -> Result<(), StoreError> {
        let _ending = self
            .inner
            .ending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.has_session_cookies() {
            self.set_default_token(None);
            return Ok(());
        }
        self.end_session()
    }

    /// Exchanges the stored refresh token for a new pair.
    ///
    /// Called by the coordinator's leader only. The request goes straight
    /// to the transport so a rejected refresh is never itself refreshed.
    pub(crate) async fn refresh_tokens(&self) -> Result<TokenPair, RefreshError> {
        let Some(refresh_token) = self
            .inner
            .store
            .get(&self.inner.config.refresh_token_name)
        else {
            tracing::warn!("no refresh token stored");
            return Err(self.reject_refresh(RefreshError::MissingRefreshToken));
        };

        let request = ApiRequest::post(self.inner.endpoints.refresh.as_str()).json(&RefreshBody {
            refresh_token: &refresh_token,
        })?;
        let exchanged = match self.inner.transport.send(request).await {
            Ok(response) => response
                .error_for_status()
                .and_then(|response| response.json::<TokenPair>()),
            Err(e) => Err(e),
        };

        match exchanged {
            Ok(pair) => {
                self.persist_tokens(&pair.token, &pair.refresh_token)?;
                self.set_default_token(Some(pair.token.clone()));
                Ok(pair)
            }
            Err(e) => Err(self.reject_refresh(RefreshError::from(e))),
        }
    }

    /// A refresh the API will never accept ends the session here, once,
    /// for the whole cycle.
    fn reject_refresh(&self, err: RefreshError) -> RefreshError {
        if err.is_rejection() && self.is_interactive() {
            tracing::warn!(error = %err, "refresh rejected, ending session");
            if let Err(e) = self.end_active_session() {
                tracing::warn!(error = %e, "failed to clear session cookies");
            }
        }
        err
    }
}

/// Builder for configuring an [`ApiClient`].
///
/// Without a store the client keeps its tokens in a fresh [`BrowserJar`].
/// Giving it both a bus and a navigator makes it interactive: terminal
/// authentication failures clear the store, broadcast "session ended" and
/// navigate to the entry page.
#[derive(Default)]
pub struct ApiClientBuilder {
    config: SessionConfig,
    endpoints: Endpoints,
    store: Option<Arc<dyn SessionStore>>,
    bus: Option<Arc<SessionBus>>,
    navigator: Option<Arc<dyn Navigator>>,
    terminator: Option<Arc<dyn SessionTerminator>>,
}

impl ApiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets where tokens are kept.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets this tab's handle on the cross-tab session channel.
    pub fn bus(mut self, bus: Arc<SessionBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets the router used after sign-in and on teardown.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Overrides the terminator that would be assembled from the bus and
    /// navigator.
    pub fn terminator(mut self, terminator: Arc<dyn SessionTerminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Builds the client.
    pub fn build<T: HttpTransport>(self, transport: T) -> ApiClient<T> {
        let config = self.config.validated();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(BrowserJar::new()) as Arc<dyn SessionStore>);

        let teardown = self.navigator.as_ref().map(|navigator| {
            Arc::new(Teardown::new(
                Arc::clone(&store),
                Arc::clone(navigator),
                config.clone(),
            ))
        });
        let terminator = self.terminator.or_else(|| match (&teardown, &self.bus) {
            (Some(teardown), Some(bus)) => Some(Arc::new(InteractiveTerminator::new(
                Arc::clone(teardown),
                Arc::clone(bus),
            )) as Arc<dyn SessionTerminator>),
            _ => None,
        });

        let default_token = store.get(&config.access_token_name);
        tracing::debug!(
            interactive = terminator.is_some(),
            has_token = default_token.is_some(),
            "api client built"
        );

        ApiClient {
            inner: Arc::new(Inner {
                transport,
                store,
                config,
                endpoints: self.endpoints.validated(),
                default_token: RwLock::new(default_token),
                coordinator: RefreshCoordinator::new(),
                terminator,
                navigator: self.navigator,
                bus: self.bus,
                teardown,
                ending: Mutex::new(()),
            }),
        }
    }
}
