//! The cross-tab session bus.
//!
//! Every tab of an application origin shares a set of named broadcast
//! channels ([`BusOrigin`]). Each tab holds its own [`SessionBus`] handle
//! on the well-known session channel. Signing out in one tab publishes
//! [`SessionEvent::SignOut`]; every *other* tab hears it and tears its
//! own session down.
//!
//! ```text
//!   tab A ──publish(SignOut)──→ [ "keyward.session" ] ──→ tab B handler
//!                                                     ──→ tab C handler
//!                                          (tab A never hears itself)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How many undelivered messages a slow subscriber may fall behind by.
const CHANNEL_CAPACITY: usize = 16;

static NEXT_TAB_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one execution context (one tab) on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u64);

impl TabId {
    fn next() -> Self {
        Self(NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// A message carried on the session channel.
///
/// Serialized as `{"type":"signOut"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The session has ended in some tab; end it here too.
    SignOut,
}

#[derive(Debug, Clone)]
struct Envelope {
    from: TabId,
    event: SessionEvent,
}

/// The channels shared by all tabs of one application origin.
#[derive(Debug, Default)]
pub struct BusOrigin {
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl BusOrigin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a new tab's handle on the channel called `channel_name`.
    ///
    /// The channel itself is not opened until the handle first publishes
    /// or subscribes.
    pub fn tab(self: &Arc<Self>, channel_name: impl Into<String>) -> SessionBus {
        SessionBus {
            origin: Arc::clone(self),
            channel_name: channel_name.into(),
            tab: TabId::next(),
            sender: OnceLock::new(),
        }
    }

    fn open(&self, name: &str) -> broadcast::Sender<Envelope> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(channel = name, "opening session channel");
                broadcast::channel(CHANNEL_CAPACITY).0
            })
            .clone()
    }
}

/// One tab's handle on the session channel.
#[derive(Debug)]
pub struct SessionBus {
    origin: Arc<BusOrigin>,
    channel_name: String,
    tab: TabId,
    sender: OnceLock<broadcast::Sender<Envelope>>,
}

impl SessionBus {
    /// This handle's tab identity.
    pub fn tab_id(&self) -> TabId {
        self.tab
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Sends `event` to every other subscribed tab.
    ///
    /// Publishing with no listeners is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let envelope = Envelope {
            from: self.tab,
            event,
        };
        match self.channel().send(envelope) {
            Ok(receivers) => tracing::info!(
                tab = %self.tab,
                ?event,
                receivers,
                "published session event"
            ),
            Err(_) => tracing::debug!(tab = %self.tab, ?event, "no tab listening"),
        }
    }

    /// Runs `handler` for every event published by another tab.
    ///
    /// The subscription is in place when this returns, so anything
    /// published afterwards is delivered. Must be called from within a
    /// Tokio runtime; the listener lives until the returned task is
    /// aborted.
    pub fn subscribe<F>(&self, handler: F) -> JoinHandle<()>
    where
        F: Fn(SessionEvent) + Send + 'static,
    {
        let mut rx = self.channel().subscribe();
        let me = self.tab;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) if envelope.from == me => {}
                    Ok(envelope) => {
                        tracing::debug!(tab = %me, from = %envelope.from, "session event received");
                        handler(envelope.event);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(tab = %me, missed, "session listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn channel(&self) -> &broadcast::Sender<Envelope> {
        self.sender
            .get_or_init(|| self.origin.open(&self.channel_name))
    }
}
