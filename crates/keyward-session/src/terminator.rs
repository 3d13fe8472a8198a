//! Session teardown.
//!
//! Ending a session locally means clearing both session cookies and sending
//! the user to the entry page. In an interactive context the other tabs are
//! told as well; a tab that hears about it tears down without telling
//! anyone else.

use std::sync::Arc;

use keyward_store::{SessionStore, StoreError};
use tokio::task::JoinHandle;

use crate::bus::{SessionBus, SessionEvent};
use crate::SessionConfig;

/// Moves the user to another page.
///
/// In a browser this is the router; in tests it records paths.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Ends the session after a terminal authentication failure.
///
/// Only interactive contexts have one. A client without a terminator is
/// running on the server and reports the failure to its caller instead.
pub trait SessionTerminator: Send + Sync {
    fn terminate(&self) -> Result<(), StoreError>;
}

/// Local teardown for one context: clear the tokens, go to the entry page.
pub struct Teardown {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
}

impl Teardown {
    pub fn new(
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            navigator,
            config,
        }
    }

    /// Clears both tokens and navigates to the entry page.
    ///
    /// Navigation happens even if a cookie could not be cleared; the first
    /// store error is returned afterwards.
    pub fn run(&self) -> Result<(), StoreError> {
        let cleared = clear_tokens(self.store.as_ref(), &self.config);
        tracing::info!(entry = %self.config.entry_path, "session torn down");
        self.navigator.navigate(&self.config.entry_path);
        cleared
    }
}

/// Removes both session cookies from `store`, attempting both even if the
/// first fails.
pub fn clear_tokens(store: &dyn SessionStore, config: &SessionConfig) -> Result<(), StoreError> {
    let options = config.cookie_options();
    let access = store.clear(&config.access_token_name, &options);
    let refresh = store.clear(&config.refresh_token_name, &options);
    access.and(refresh)
}

/// The terminator for an interactive context: local teardown, then a
/// "session ended" broadcast to every other tab.
pub struct InteractiveTerminator {
    teardown: Arc<Teardown>,
    bus: Arc<SessionBus>,
}

impl InteractiveTerminator {
    pub fn new(teardown: Arc<Teardown>, bus: Arc<SessionBus>) -> Self {
        Self { teardown, bus }
    }
}

impl SessionTerminator for InteractiveTerminator {
    fn terminate(&self) -> Result<(), StoreError> {
        let result = self.teardown.run();
        self.bus.publish(SessionEvent::SignOut);
        result
    }
}

/// Tears this tab's session down whenever another tab signs out.
///
/// The listener never re-broadcasts. Abort the returned task to stop
/// listening.
pub fn listen_for_sign_out(bus: &SessionBus, teardown: Arc<Teardown>) -> JoinHandle<()> {
    let tab = bus.tab_id();
    bus.subscribe(move |event| match event {
        SessionEvent::SignOut => {
            tracing::info!(%tab, "signed out in another tab");
            if let Err(e) = teardown.run() {
                tracing::warn!(%tab, error = %e, "failed to clear session cookies");
            }
        }
    })
}
