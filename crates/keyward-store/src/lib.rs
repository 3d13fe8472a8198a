//! Session token storage for Keyward.
//!
//! The access token and the refresh token live in cookies. Where those
//! cookies come from depends on where the code runs:
//!
//! - in an interactive (browser-like) context there is one ambient jar per
//!   tab: [`BrowserJar`];
//! - while rendering on the server, cookies arrive with the request and
//!   changes leave with the response: [`RequestContext`].
//!
//! Both implement [`SessionStore`], so the rest of Keyward performs the
//! same `get` / `set` / `clear` without caring which one it holds.

mod error;
mod jar;
mod request;

pub use error::StoreError;
pub use jar::BrowserJar;
pub use request::RequestContext;

use std::sync::Arc;
use std::time::Duration;

use cookie::Cookie;

/// Default retention window for session cookies: 30 days.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Where and for how long a cookie is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// How long the cookie is retained after being written.
    pub max_age: Duration,
    /// Which paths the cookie is visible to. `/` means every route.
    pub path: String,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            path: "/".to_string(),
        }
    }
}

/// A durable, request-scoped key-value store for session tokens.
///
/// Implementations never retry. A failed write is returned to the caller,
/// which must treat it as fatal to the operation in progress.
pub trait SessionStore: Send + Sync {
    /// Reads a cookie. Returns `None` if it is absent or has expired.
    fn get(&self, name: &str) -> Option<String>;

    /// Writes a cookie with the given retention window and path.
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError>;

    /// Removes a cookie. `options.path` must match the path it was set with.
    fn clear(&self, name: &str, options: &CookieOptions) -> Result<(), StoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError> {
        (**self).set(name, value, options)
    }

    fn clear(&self, name: &str, options: &CookieOptions) -> Result<(), StoreError> {
        (**self).clear(name, options)
    }
}

/// Builds a validated cookie. Shared by both store implementations.
pub(crate) fn build_cookie(
    name: &str,
    value: &str,
    options: &CookieOptions,
) -> Result<Cookie<'static>, StoreError> {
    if name.is_empty() || !name.chars().all(is_token_char) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    if !value.chars().all(is_cookie_octet) {
        return Err(StoreError::InvalidValue(name.to_string()));
    }
    let secs = i64::try_from(options.max_age.as_secs())
        .map_err(|_| StoreError::MaxAgeOutOfRange(name.to_string()))?;

    Ok(Cookie::build((name.to_string(), value.to_string()))
        .path(options.path.clone())
        .max_age(time::Duration::seconds(secs))
        .build())
}

/// RFC 6265 `cookie-octet`.
fn is_cookie_octet(c: char) -> bool {
    matches!(c, '\x21' | '\x23'..='\x2B' | '\x2D'..='\x3A' | '\x3C'..='\x5B' | '\x5D'..='\x7E')
}

/// RFC 7230 `tchar`, the alphabet of cookie names.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}
