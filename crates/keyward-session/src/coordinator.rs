//! The refresh coordinator: single-flight token refresh.
//!
//! When an access token expires, every request that was in flight fails
//! with the same "token expired" error at roughly the same time. Only one
//! of them should exchange the refresh token; the rest wait for that
//! exchange and then retry with its result.
//!
//! # State machine
//!
//! ```text
//!          first expired failure
//!   Idle ─────────────────────────→ Refreshing
//!    ↑                                  │
//!    └──── refresh settles (ok or err) ─┘
//!          queue drained FIFO
//! ```
//!
//! Every caller, the leader included, parks a continuation in the queue.
//! When the refresh settles the queue is taken and the state reset to
//! `Idle` under a single lock, then each continuation is resolved in
//! arrival order. A caller that arrives after the reset starts a new
//! cycle; it can never join the batch being drained.
//!
//! # Concurrency note
//!
//! The lock is a plain `std::sync::Mutex` and is never held across an
//! `.await`. On a current-thread runtime (one event loop per context)
//! continuations are also resumed in arrival order, so replays are
//! submitted in the order the original requests failed.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tokio::sync::oneshot;

use crate::RefreshError;

/// A freshly issued access/refresh token pair.
///
/// Wire shape: `{ "token": "...", "refreshToken": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Whether a refresh call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type Outcome = Result<TokenPair, RefreshError>;

/// One parked request waiting for the current refresh to settle.
type PendingRequest = oneshot::Sender<Outcome>;

#[derive(Debug)]
struct Cycle {
    state: RefreshState,
    pending: VecDeque<PendingRequest>,
    completed: u64,
}

/// Deduplicates token refreshes for one API client.
///
/// Each `ApiClient` owns its own coordinator; nothing is shared across
/// clients, tabs or server requests.
#[derive(Debug)]
pub struct RefreshCoordinator {
    cycle: Mutex<Cycle>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    /// Creates an idle coordinator with an empty queue.
    pub fn new() -> Self {
        Self {
            cycle: Mutex::new(Cycle {
                state: RefreshState::Idle,
                pending: VecDeque::new(),
                completed: 0,
            }),
        }
    }

    /// Waits for a refreshed token pair, running `refresh` only if no
    /// refresh is already in flight.
    ///
    /// `refresh` performs the actual exchange (call the refresh endpoint,
    /// persist the tokens). It is invoked at most once per cycle, by the
    /// first caller to arrive while `Idle`. Every caller in the cycle
    /// receives that single outcome.
    ///
    /// # Errors
    /// Returns the cycle's [`RefreshError`], or
    /// [`RefreshError::Abandoned`] if the leading caller was dropped before
    /// the refresh settled.
    pub async fn request_refresh<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let (tx, rx) = oneshot::channel();

        let leads = {
            let mut cycle = self.lock();
            cycle.pending.push_back(tx);
            match cycle.state {
                RefreshState::Idle => {
                    cycle.state = RefreshState::Refreshing;
                    true
                }
                RefreshState::Refreshing => {
                    tracing::debug!(
                        queued = cycle.pending.len(),
                        "refresh in flight, request queued"
                    );
                    false
                }
            }
        };

        if leads {
            tracing::info!("access token expired, refreshing");
            let mut guard = SettleGuard {
                coordinator: self,
                settled: false,
            };
            let outcome = refresh().await;
            guard.settle(outcome);
        }

        rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    /// The current state.
    pub fn state(&self) -> RefreshState {
        self.lock().state
    }

    /// Number of callers parked on the current cycle.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of refresh cycles that have settled.
    pub fn completed_cycles(&self) -> u64 {
        self.lock().completed
    }

    /// Ends the current cycle: takes the queue and resets to `Idle`
    /// atomically, then resolves each parked caller in FIFO order.
    fn settle(&self, outcome: Outcome) {
        let drained = {
            let mut cycle = self.lock();
            cycle.state = RefreshState::Idle;
            cycle.completed += 1;
            std::mem::take(&mut cycle.pending)
        };

        match &outcome {
            Ok(_) => tracing::info!(
                released = drained.len(),
                "token refreshed, replaying queued requests"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                released = drained.len(),
                "token refresh failed, rejecting queued requests"
            ),
        }

        for pending in drained {
            // A receiver that has gone away simply misses its result.
            let _ = pending.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cycle> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles the cycle even if the leading future is dropped mid-refresh, so
/// the coordinator never stays stuck in `Refreshing`.
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(&mut self, outcome: Outcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(Err(RefreshError::Abandoned));
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
