//! The server-rendering context handle.
//!
//! On the server there is no ambient jar: cookies come in with the request
//! and changes have to be sent back as `Set-Cookie` headers. A
//! `RequestContext` wraps both directions for one request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cookie::{Cookie, CookieJar};

use crate::{CookieOptions, SessionStore, StoreError, build_cookie};

/// Per-request cookie state.
///
/// Cheap to clone: clones share the same jar, so a route guard and the API
/// client it builds for the page loader see each other's writes.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    jar: Arc<Mutex<CookieJar>>,
}

impl RequestContext {
    /// Creates a context from the request's `Cookie` header value.
    ///
    /// Unparseable pairs are skipped.
    pub fn from_cookie_header(header: &str) -> Self {
        let mut jar = CookieJar::new();
        for parsed in Cookie::split_parse(header.to_string()) {
            match parsed {
                Ok(cookie) => jar.add_original(cookie),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed request cookie");
                }
            }
        }
        Self {
            jar: Arc::new(Mutex::new(jar)),
        }
    }

    /// Creates a context for a request that carried no cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `Set-Cookie` header values for every change made during
    /// this request, sorted by cookie name.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let jar = self.lock();
        let mut changed: Vec<&Cookie<'static>> = jar.delta().collect();
        changed.sort_by(|a, b| a.name().cmp(b.name()));
        changed.iter().map(ToString::to_string).collect()
    }

    fn lock(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for RequestContext {
    fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).map(|c| c.value().to_string())
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), StoreError> {
        let cookie = build_cookie(name, value, options)?;
        self.lock().add(cookie);
        Ok(())
    }

    fn clear(&self, name: &str, options: &CookieOptions) -> Result<(), StoreError> {
        let removal = Cookie::build((name.to_string(), "")).path(options.path.clone());
        self.lock().remove(removal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cookie_header_reads_request_cookies() {
        let ctx =
            RequestContext::from_cookie_header("authToken=t1; authRefreshToken=r1; theme=dark");

        assert_eq!(ctx.get("authToken").as_deref(), Some("t1"));
        assert_eq!(ctx.get("authRefreshToken").as_deref(), Some("r1"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_unchanged_request_emits_no_set_cookie() {
        let ctx = RequestContext::from_cookie_header("authToken=t1");
        assert!(ctx.set_cookie_headers().is_empty());
    }

    #[test]
    fn test_set_is_visible_to_later_reads_and_emitted() {
        let ctx = RequestContext::from_cookie_header("authToken=old");

        ctx.set("authToken", "new", &CookieOptions::default()).unwrap();

        assert_eq!(ctx.get("authToken").as_deref(), Some("new"));
        let headers = ctx.set_cookie_headers();
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("authToken=new"));
        assert!(headers[0].contains("Path=/"));
        assert!(headers[0].contains("Max-Age=2592000"));
    }

    #[test]
    fn test_clear_original_cookie_emits_removal() {
        let ctx = RequestContext::from_cookie_header("authToken=t1");

        ctx.clear("authToken", &CookieOptions::default()).unwrap();

        assert_eq!(ctx.get("authToken"), None);
        let headers = ctx.set_cookie_headers();
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("authToken=;"));
        assert!(headers[0].contains("Max-Age=0"));
    }

    #[test]
    fn test_clear_uses_the_path_the_cookie_was_set_with() {
        let ctx = RequestContext::from_cookie_header("authToken=t1");
        let options = CookieOptions {
            path: "/app".to_string(),
            ..CookieOptions::default()
        };

        ctx.set("authToken", "t2", &options).unwrap();
        ctx.clear("authToken", &options).unwrap();

        assert_eq!(ctx.get("authToken"), None);
        let headers = ctx.set_cookie_headers();
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("authToken=;"));
        assert!(headers[0].contains("Path=/app"));
        assert!(headers[0].contains("Max-Age=0"));
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = RequestContext::new();
        let handle = ctx.clone();

        handle.set("authToken", "t1", &CookieOptions::default()).unwrap();

        assert_eq!(ctx.get("authToken").as_deref(), Some("t1"));
    }
}
