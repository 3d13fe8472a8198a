//! The ambient cookie jar of an interactive (tab) context.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use cookie::Cookie;

use crate::{CookieOptions, SessionStore, StoreError, build_cookie};

/// A tab-wide cookie jar.
///
/// Every component in one tab shares a single jar (wrap it in an `Arc`).
/// Cookies are dropped once their `max_age` has elapsed, so a stale
/// session reads as absent exactly like it would in a browser.
#[derive(Debug, Default)]
pub struct BrowserJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

#[derive(Debug)]
struct StoredCookie {
    cookie: Cookie<'static>,
    expires_at: Instant,
}

impl BrowserJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the live cookies as a `Cookie` request header value,
    /// e.g. `authRefreshToken=r1; authToken=t1`.
    pub fn cookie_header(&self) -> String {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|stored| stored.expires_at > now)
            .map(|stored| format!("{}={}", stored.cookie.name(), stored.cookie.value()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for BrowserJar {
    fn get(&self, name: &str) -> Option<String> {
        let mut cookies = self.lock();
        let expired = cookies
            .get(name)
            .is_some_and(|stored| stored.expires_at <= Instant::now());
        if expired {
            cookies.remove(name);
            tracing::debug!(name, "cookie retention window elapsed");
            return None;
        }
        cookies.get(name).map(|stored| stored.cookie.value().to_string())
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError> {
        let cookie = build_cookie(name, value, options)?;
        let expires_at = Instant::now()
            .checked_add(options.max_age)
            .ok_or_else(|| StoreError::MaxAgeOutOfRange(name.to_string()))?;
        self.lock()
            .insert(name.to_string(), StoredCookie { cookie, expires_at });
        Ok(())
    }

    fn clear(&self, name: &str, _options: &CookieOptions) -> Result<(), StoreError> {
        self.lock().remove(name);
        Ok(())
    }
}
