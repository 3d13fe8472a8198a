//! Session machinery for Keyward.
//!
//! This crate holds the parts of a client session that have real
//! concurrency or cross-context concerns:
//!
//! 1. **Single-flight refresh**: one token refresh per expiry, however
//!    many requests hit it ([`RefreshCoordinator`])
//! 2. **Cross-tab sign-out**: tell every tab of the origin that the
//!    session ended ([`BusOrigin`], [`SessionBus`])
//! 3. **Teardown**: clear the tokens and leave ([`Teardown`],
//!    [`SessionTerminator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! keyward (above)           ← API client, interceptor, route guards
//!     ↕
//! keyward-session (this)    ← refresh coordination, bus, teardown
//!     ↕
//! keyward-store (below)     ← where the tokens live
//! ```

mod bus;
mod config;
mod coordinator;
mod error;
mod terminator;

pub use bus::{BusOrigin, SessionBus, SessionEvent, TabId};
pub use config::SessionConfig;
pub use coordinator::{RefreshCoordinator, RefreshState, TokenPair};
pub use error::RefreshError;
pub use terminator::{
    InteractiveTerminator, Navigator, SessionTerminator, Teardown, clear_tokens,
    listen_for_sign_out,
};
