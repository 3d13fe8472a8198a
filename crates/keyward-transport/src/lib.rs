//! Transport abstraction layer for Keyward.
//!
//! Provides the [`HttpTransport`] trait that the session layer sends API
//! calls through, plus the request/response values that travel across it.
//! The low-level mechanics (connection pooling, TLS, timeouts) belong to
//! the implementation.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): HTTP transport via `reqwest`

mod error;
#[cfg(feature = "reqwest")]
mod client;

pub use error::TransportError;
#[cfg(feature = "reqwest")]
pub use client::ReqwestTransport;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request configuration: everything needed to (re)submit one API call.
///
/// Requests are `Clone` so a call that failed on an expired token can be
/// replayed with a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/me`.
    pub path: String,
    /// Header names are stored lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    /// Returns [`TransportError::Encode`] if `body` cannot be represented
    /// as JSON.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, TransportError> {
        self.body =
            Some(serde_json::to_value(body).map_err(TransportError::Encode)?);
        Ok(self)
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Sets `Authorization: Bearer <token>` in place.
    pub fn set_bearer(&mut self, token: &str) {
        self.headers
            .insert("authorization".to_string(), format!("Bearer {token}"));
    }

    /// Returns the bearer token this request carries, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Creates a response with a JSON body.
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    /// Returns [`TransportError::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(TransportError::Decode)
    }
}

/// The API's error body: `{ "error": true, "code": "token.expired", "message": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Sends API requests.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status; `Err` is reserved for calls that got no response
/// at all. Status handling is the caller's business.
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends one request and waits for its response.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}
