//! Claims for Keyward.
//!
//! This crate answers two questions about a signed-in user:
//!
//! - **What does the token say?** ([`decode`]) reads the permission and
//!   role claims embedded in a bearer token, without contacting the server
//!   and without verifying the signature.
//! - **Is that enough?** ([`has_access`]) checks a claim set against a
//!   page's or fragment's [`Requirements`].
//!
//! # Where it sits
//!
//! ```text
//! Route guards / UI gates (above)  ← ask "may this user see this?"
//!     ↕
//! Claims (this crate)  ← pure functions, no I/O
//! ```
//!
//! Both the server-side guard path (claims decoded from the token) and the
//! client path (claims returned by the identity endpoint) produce the same
//! [`Claims`] shape, so one evaluator serves both.

mod access;
mod claims;
mod decode;
mod error;

pub use access::{Requirements, has_access};
pub use claims::{Claims, User};
pub use decode::decode;
pub use error::DecodeError;
