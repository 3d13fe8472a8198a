//! Session configuration.

use std::time::Duration;

use keyward_store::{CookieOptions, DEFAULT_MAX_AGE};

/// Configuration shared by the client, the guards and teardown.
///
/// The defaults match the API contract: `authToken` / `authRefreshToken`
/// cookies kept for 30 days at `/`, the sign-in form at `/`, and the
/// dashboard as the authenticated landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Cookie holding the access token.
    pub access_token_name: String,

    /// Cookie holding the refresh token.
    pub refresh_token_name: String,

    /// Retention window for both cookies.
    pub max_age: Duration,

    /// Cookie path scope.
    pub cookie_path: String,

    /// Where a dropped or anonymous session is sent.
    pub entry_path: String,

    /// Where a signed-in user lands (and where an under-privileged one is
    /// sent back to).
    pub landing_path: String,

    /// Well-known cross-tab channel name.
    pub channel_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_name: "authToken".to_string(),
            refresh_token_name: "authRefreshToken".to_string(),
            max_age: DEFAULT_MAX_AGE,
            cookie_path: "/".to_string(),
            entry_path: "/".to_string(),
            landing_path: "/dashboard".to_string(),
            channel_name: "keyward.session".to_string(),
        }
    }
}

impl SessionConfig {
    /// Fixes values that would make the session unusable.
    ///
    /// Rules:
    /// - paths are made absolute (`dashboard` → `/dashboard`);
    /// - empty cookie or channel names fall back to the defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        for path in [
            &mut self.cookie_path,
            &mut self.entry_path,
            &mut self.landing_path,
        ] {
            if !path.starts_with('/') {
                tracing::warn!(path = %path, "session path is not absolute, prefixing '/'");
                path.insert(0, '/');
            }
        }
        if self.access_token_name.is_empty() {
            self.access_token_name = defaults.access_token_name;
        }
        if self.refresh_token_name.is_empty() {
            self.refresh_token_name = defaults.refresh_token_name;
        }
        if self.channel_name.is_empty() {
            self.channel_name = defaults.channel_name;
        }
        self
    }

    /// Cookie options for writing either token.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            max_age: self.max_age,
            path: self.cookie_path.clone(),
        }
    }
}
