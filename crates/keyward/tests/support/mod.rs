//! A scripted stand-in for the API, shared by the integration tests.
//!
//! Tokens are plain strings. The fake keeps one valid access token, a set
//! of expired ones and one valid refresh token, and answers the way the
//! real API does: `token.expired` for an expired bearer, `token.invalid`
//! for anything else it does not recognise.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use keyward::{
    ApiRequest, ApiResponse, BrowserJar, CookieOptions, HttpTransport, Method, Navigator,
    SessionConfig, SessionStore, TransportError,
};
use serde_json::{Value, json};
use tokio::sync::Notify;

pub const EMAIL: &str = "diego@example.com";
pub const PASSWORD: &str = "123456";
pub const STALE_TOKEN: &str = "stale-token";
pub const FIRST_REFRESH_TOKEN: &str = "refresh-0";

/// One request as the fake API saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

struct State {
    valid_token: Option<String>,
    expired: BTreeSet<String>,
    refresh_token: String,
    issued: u32,
    refresh_failure: Option<(u16, Value)>,
    seen: Vec<Seen>,
}

#[derive(Clone)]
pub struct FakeApi {
    state: Arc<Mutex<State>>,
    refresh_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    /// An API for which [`STALE_TOKEN`] has expired and
    /// [`FIRST_REFRESH_TOKEN`] is still good.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                valid_token: None,
                expired: BTreeSet::from([STALE_TOKEN.to_string()]),
                refresh_token: FIRST_REFRESH_TOKEN.to_string(),
                issued: 0,
                refresh_failure: None,
                seen: Vec::new(),
            })),
            refresh_gate: None,
        }
    }

    /// Makes `token` the currently valid access token.
    pub fn with_valid_token(self, token: &str) -> Self {
        self.state.lock().unwrap().valid_token = Some(token.to_string());
        self
    }

    /// Holds every refresh call until the returned `Notify` is notified.
    pub fn hold_refresh(&mut self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.refresh_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Answers every refresh call with `status` and `body`.
    pub fn fail_refresh(&self, status: u16, body: Value) {
        self.state.lock().unwrap().refresh_failure = Some((status, body));
    }

    /// Rejects every refresh token.
    pub fn revoke_refresh(&self) {
        self.fail_refresh(401, json!({ "error": true, "code": "token.invalid" }));
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.lock().unwrap().seen.clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.seen().iter().filter(|seen| seen.path == path).count()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls_to("/refresh")
    }

    fn record(&self, request: &ApiRequest) {
        self.state.lock().unwrap().seen.push(Seen {
            method: request.method,
            path: request.path.clone(),
            bearer: request.bearer().map(str::to_string),
        });
    }

    fn issue(state: &mut State) -> (String, String) {
        state.issued += 1;
        if let Some(old) = state.valid_token.take() {
            state.expired.insert(old);
        }
        let token = format!("token-{}", state.issued);
        let refresh = format!("refresh-{}", state.issued);
        state.valid_token = Some(token.clone());
        state.refresh_token = refresh.clone();
        (token, refresh)
    }

    fn sign_in(&self, request: &ApiRequest) -> ApiResponse {
        let body = request.body.clone().unwrap_or(Value::Null);
        if body["email"] != EMAIL || body["password"] != PASSWORD {
            return ApiResponse::json_body(
                401,
                &json!({ "error": true, "code": "credentials.invalid" }),
            );
        }

        let (token, refresh) = Self::issue(&mut self.state.lock().unwrap());
        ApiResponse::json_body(
            200,
            &json!({
                "token": token,
                "refreshToken": refresh,
                "permissions": ["users.list", "metrics.list"],
                "roles": ["administrator"],
            }),
        )
    }

    fn refresh(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        if let Some((status, body)) = &state.refresh_failure {
            return ApiResponse::json_body(*status, body);
        }

        let presented = request
            .body
            .as_ref()
            .and_then(|body| body["refreshToken"].as_str())
            .unwrap_or_default();
        if presented != state.refresh_token {
            return ApiResponse::json_body(401, &json!({ "error": true, "code": "token.invalid" }));
        }

        let (token, refresh) = Self::issue(&mut state);
        ApiResponse::json_body(200, &json!({ "token": token, "refreshToken": refresh }))
    }

    fn resource(&self, request: &ApiRequest) -> ApiResponse {
        let path = request.path.as_str();
        match path {
            "/broken" => return ApiResponse::json_body(500, &json!({ "message": "boom" })),
            "/always-expired" => {
                return ApiResponse::json_body(
                    401,
                    &json!({ "error": true, "code": "token.expired" }),
                );
            }
            _ => {}
        }

        let state = self.state.lock().unwrap();
        let bearer = request.bearer();
        if bearer.is_none() || bearer != state.valid_token.as_deref() {
            let code = match bearer {
                Some(token) if state.expired.contains(token) => "token.expired",
                _ => "token.invalid",
            };
            return ApiResponse::json_body(401, &json!({ "error": true, "code": code }));
        }

        if path == "/me" {
            return ApiResponse::json_body(
                200,
                &json!({
                    "email": EMAIL,
                    "permissions": ["users.list", "metrics.list"],
                    "roles": ["administrator"],
                }),
            );
        }
        ApiResponse::json_body(200, &json!({ "path": path, "token": bearer }))
    }
}

impl HttpTransport for FakeApi {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.record(&request);
        match (request.method, request.path.as_str()) {
            (Method::Post, "/sessions") => Ok(self.sign_in(&request)),
            (Method::Post, "/refresh") => {
                if let Some(gate) = &self.refresh_gate {
                    gate.notified().await;
                }
                Ok(self.refresh(&request))
            }
            (_, "/unreachable") => Err(TransportError::Request("connection refused".into())),
            _ => Ok(self.resource(&request)),
        }
    }
}

/// Records every navigation.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_string());
    }
}

/// A browser jar holding the given session cookies.
pub fn seeded_jar(access: &str, refresh: &str) -> Arc<BrowserJar> {
    let config = SessionConfig::default();
    let jar = Arc::new(BrowserJar::new());
    let options = CookieOptions::default();
    jar.set(&config.access_token_name, access, &options).unwrap();
    jar.set(&config.refresh_token_name, refresh, &options).unwrap();
    jar
}

/// A JWT-shaped token carrying the given claims. The signature segment is
/// junk; nothing on the client verifies it.
pub fn token_with_claims(permissions: &[&str], roles: &[&str]) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "sub": EMAIL, "permissions": permissions, "roles": roles }).to_string(),
    );
    format!("{header}.{payload}.signature")
}

/// Lets spawned tasks run until `cond` holds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
