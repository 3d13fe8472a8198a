//! Server-side route guards.
//!
//! A page's server-side loader runs inside a guard. The guard looks at the
//! request's cookies first and either redirects or lets the loader run:
//!
//! | guard          | no token          | token, claims short | token, claims ok    |
//! |----------------|-------------------|---------------------|---------------------|
//! | [`AuthGuard`]  | redirect to entry | redirect to landing | run loader          |
//! | [`GuestGuard`] | run loader        | redirect to landing | redirect to landing |

use std::future::Future;

use keyward_claims::{Requirements, decode, has_access};
use keyward_session::{SessionConfig, clear_tokens};
use keyward_store::{RequestContext, SessionStore};

use crate::ClientError;

/// A non-permanent redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub destination: String,
    pub permanent: bool,
}

impl Redirect {
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            permanent: false,
        }
    }
}

/// What a guarded page renders with: the loader's props, or a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<P> {
    Props(P),
    Redirect(Redirect),
}

impl<P> PageOutcome<P> {
    fn redirect(destination: &str) -> Self {
        tracing::debug!(destination, "guard redirect");
        Self::Redirect(Redirect::to(destination))
    }

    pub fn props(self) -> Option<P> {
        match self {
            Self::Props(props) => Some(props),
            Self::Redirect(_) => None,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Props(_) => None,
            Self::Redirect(redirect) => Some(&redirect.destination),
        }
    }
}

/// Guards a page that needs a signed-in user.
///
/// The claims check reads the access token's payload without verifying its
/// signature. That is enough to decide what to render; the API still
/// authorises every call the loader makes with the same token.
///
/// ```rust,no_run
/// use keyward::prelude::*;
///
/// # async fn page(ctx: RequestContext) -> Result<(), ClientError> {
/// let _outcome = AuthGuard::new(SessionConfig::default())
///     .require(Requirements::new().permission("metrics.list").role("administrator"))
///     .run(ctx, |_ctx| async { Ok::<_, ClientError>("metrics props") })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuthGuard {
    config: SessionConfig,
    requirements: Requirements,
}

impl AuthGuard {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: config.validated(),
            requirements: Requirements::new(),
        }
    }

    /// Demands these claims on top of being signed in.
    pub fn require(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Runs `load` if the request carries a session that satisfies the
    /// requirements.
    ///
    /// If the loader finds the session is gone (the API rejected the token
    /// or its refresh), the cookies are cleared and the user is sent to the
    /// entry page. Any other loader error is returned as is.
    pub async fn run<P, F, Fut>(
        &self,
        ctx: RequestContext,
        load: F,
    ) -> Result<PageOutcome<P>, ClientError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<P, ClientError>>,
    {
        let Some(token) = ctx.get(&self.config.access_token_name) else {
            return Ok(PageOutcome::redirect(&self.config.entry_path));
        };

        if !self.requirements.is_empty() {
            match decode(&token) {
                Ok(claims) if has_access(&claims, &self.requirements) => {}
                Ok(_) => return Ok(PageOutcome::redirect(&self.config.landing_path)),
                Err(e) => {
                    tracing::warn!(error = %e, "unreadable access token");
                    clear_tokens(&ctx, &self.config)?;
                    return Ok(PageOutcome::redirect(&self.config.entry_path));
                }
            }
        }

        match load(ctx.clone()).await {
            Ok(props) => Ok(PageOutcome::Props(props)),
            Err(e) if e.is_session_lost() => {
                tracing::info!(error = %e, "session lost while loading page");
                clear_tokens(&ctx, &self.config)?;
                Ok(PageOutcome::redirect(&self.config.entry_path))
            }
            Err(e) => Err(e),
        }
    }
}

/// Guards a page only anonymous visitors should see, such as the sign-in
/// form.
#[derive(Debug, Clone)]
pub struct GuestGuard {
    config: SessionConfig,
}

impl GuestGuard {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    /// Redirects a signed-in visitor to the landing page; runs `load` for
    /// everyone else.
    pub async fn run<P, F, Fut>(
        &self,
        ctx: RequestContext,
        load: F,
    ) -> Result<PageOutcome<P>, ClientError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<P, ClientError>>,
    {
        if ctx.get(&self.config.access_token_name).is_some() {
            return Ok(PageOutcome::redirect(&self.config.landing_path));
        }
        Ok(PageOutcome::Props(load(ctx).await?))
    }
}
