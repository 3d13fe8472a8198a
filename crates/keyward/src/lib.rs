//! # Keyward
//!
//! Cookie-backed API sessions for web applications.
//!
//! Keyward keeps an access/refresh token pair in cookies, attaches the
//! access token to API calls, and refreshes it when it expires, once,
//! however many calls notice at the same time. Signing out in one tab ends
//! the session in every tab. On the server, route guards decide from the
//! request's cookies whether a page renders or redirects.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use keyward::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = ApiClient::builder()
//!     .store(Arc::new(BrowserJar::new()))
//!     .build(ReqwestTransport::new("http://localhost:3333")?);
//!
//! client.sign_in(&Credentials::new("diego@example.com", "123456")).await?;
//! let me = client.current_user().await?;
//!
//! let state = AuthState::signed_in(me);
//! if state.can(&Requirements::new().permission("metrics.list")) {
//!     // render the metrics panel
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | crate               | concern                                   |
//! |---------------------|-------------------------------------------|
//! | `keyward-claims`    | token claims, permission evaluation       |
//! | `keyward-store`     | cookie stores (browser jar, request)      |
//! | `keyward-transport` | HTTP seam and the `reqwest` transport     |
//! | `keyward-session`   | single-flight refresh, cross-tab bus      |
//! | `keyward` (this)    | API client, interceptor, guards           |

mod auth;
mod client;
mod error;
mod guard;
mod interceptor;

pub use auth::{AuthState, Credentials};
pub use client::{ApiClient, ApiClientBuilder, EXPIRED_TOKEN_CODE, Endpoints};
pub use error::{AuthTokenError, ClientError};
pub use guard::{AuthGuard, GuestGuard, PageOutcome, Redirect};

pub use keyward_claims::{Claims, DecodeError, Requirements, User, decode, has_access};
pub use keyward_session::{
    BusOrigin, Navigator, RefreshCoordinator, RefreshError, RefreshState, SessionBus,
    SessionConfig, SessionEvent, SessionTerminator, TokenPair,
};
pub use keyward_store::{BrowserJar, CookieOptions, RequestContext, SessionStore, StoreError};
#[cfg(feature = "reqwest")]
pub use keyward_transport::ReqwestTransport;
pub use keyward_transport::{ApiRequest, ApiResponse, HttpTransport, Method, TransportError};

/// Everything a typical application needs, in one import.
pub mod prelude {
    pub use crate::{
        ApiClient, ApiRequest, AuthGuard, AuthState, BrowserJar, BusOrigin, ClientError,
        Credentials, GuestGuard, Navigator, PageOutcome, RequestContext, Requirements,
        SessionConfig, SessionStore,
    };

    #[cfg(feature = "reqwest")]
    pub use crate::ReqwestTransport;
}
