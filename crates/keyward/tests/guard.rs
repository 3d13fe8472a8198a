//! Integration tests for the route guards.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use keyward::{
    ApiClient, ApiRequest, AuthGuard, ClientError, GuestGuard, PageOutcome, RequestContext,
    Requirements, SessionConfig, SessionStore, TransportError,
};
use support::{FIRST_REFRESH_TOKEN, FakeApi, token_with_claims};

fn ctx_with_token(token: &str) -> RequestContext {
    RequestContext::from_cookie_header(&format!(
        "authToken={token}; authRefreshToken={FIRST_REFRESH_TOKEN}"
    ))
}

fn metrics_requirements() -> Requirements {
    Requirements::new()
        .permission("metrics.list")
        .role("administrator")
}

/// A loader that counts its runs and returns `props`.
fn counting_loader(
    runs: &Arc<AtomicUsize>,
    props: &'static str,
) -> impl FnOnce(RequestContext) -> std::future::Ready<Result<&'static str, ClientError>> {
    let runs = Arc::clone(runs);
    move |_ctx| {
        runs.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(props))
    }
}

// ---------------------------------------------------------------------------
// AuthGuard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_auth_guard_without_token_redirects_to_entry() {
    let runs = Arc::new(AtomicUsize::new(0));

    let outcome = AuthGuard::new(SessionConfig::default())
        .run(RequestContext::new(), counting_loader(&runs, "dashboard"))
        .await
        .unwrap();

    match outcome {
        PageOutcome::Redirect(redirect) => {
            assert_eq!(redirect.destination, "/");
            assert!(!redirect.permanent);
        }
        PageOutcome::Props(_) => panic!("expected a redirect"),
    }
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_auth_guard_insufficient_claims_redirects_to_landing() {
    let runs = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_token(&token_with_claims(&["metrics.list"], &["editor"]));

    let outcome = AuthGuard::new(SessionConfig::default())
        .require(metrics_requirements())
        .run(ctx.clone(), counting_loader(&runs, "metrics"))
        .await
        .unwrap();

    assert_eq!(outcome.redirect_target(), Some("/dashboard"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    // The session itself is fine; nothing is cleared.
    assert!(ctx.set_cookie_headers().is_empty());
}

#[tokio::test]
async fn test_auth_guard_sufficient_claims_runs_loader_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_token(&token_with_claims(
        &["metrics.list", "users.list"],
        &["administrator"],
    ));

    let outcome = AuthGuard::new(SessionConfig::default())
        .require(metrics_requirements())
        .run(ctx, counting_loader(&runs, "metrics"))
        .await
        .unwrap();

    assert_eq!(outcome, PageOutcome::Props("metrics"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auth_guard_without_requirements_does_not_decode() {
    let runs = Arc::new(AtomicUsize::new(0));

    let outcome = AuthGuard::new(SessionConfig::default())
        .run(ctx_with_token("opaque-token"), counting_loader(&runs, "dashboard"))
        .await
        .unwrap();

    assert_eq!(outcome, PageOutcome::Props("dashboard"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auth_guard_malformed_token_clears_and_redirects_to_entry() {
    let runs = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_token("not-a-jwt");

    let outcome = AuthGuard::new(SessionConfig::default())
        .require(metrics_requirements())
        .run(ctx.clone(), counting_loader(&runs, "metrics"))
        .await
        .unwrap();

    assert_eq!(outcome.redirect_target(), Some("/"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.get("authToken"), None);
    assert_eq!(ctx.get("authRefreshToken"), None);
}

#[tokio::test]
async fn test_auth_guard_rejected_token_clears_cookies_and_redirects_to_entry() {
    let api = FakeApi::new();
    let ctx = ctx_with_token("revoked-token");

    let outcome = AuthGuard::new(SessionConfig::default())
        .run(ctx.clone(), |ctx| async move {
            let client = ApiClient::for_request(ctx, SessionConfig::default(), api);
            let body: serde_json::Value =
                client.request(ApiRequest::get("/metrics")).await?.json()?;
            Ok::<_, ClientError>(body)
        })
        .await
        .unwrap();

    assert_eq!(outcome.redirect_target(), Some("/"));
    assert_eq!(ctx.get("authToken"), None);
    let headers = ctx.set_cookie_headers();
    assert_eq!(headers.len(), 2);
    assert!(headers.iter().all(|h| h.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_auth_guard_rejected_refresh_redirects_to_entry() {
    let api = FakeApi::new();
    api.revoke_refresh();
    let ctx = ctx_with_token(support::STALE_TOKEN);

    let outcome = AuthGuard::new(SessionConfig::default())
        .run(ctx.clone(), |ctx| async move {
            let client = ApiClient::for_request(ctx, SessionConfig::default(), api);
            client.current_user().await
        })
        .await
        .unwrap();

    assert_eq!(outcome.redirect_target(), Some("/"));
    assert_eq!(ctx.get("authRefreshToken"), None);
}

#[tokio::test]
async fn test_auth_guard_other_loader_errors_propagate() {
    let ctx = ctx_with_token("opaque-token");

    let err = AuthGuard::new(SessionConfig::default())
        .run(ctx.clone(), |_ctx| async {
            Err::<(), _>(ClientError::from(TransportError::Status {
                status: 500,
                body: Vec::new(),
            }))
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(ctx.get("authToken").as_deref(), Some("opaque-token"));
}

#[tokio::test]
async fn test_auth_guard_refreshed_session_renders_page() {
    let api = FakeApi::new();
    let ctx = ctx_with_token(support::STALE_TOKEN);

    let outcome = AuthGuard::new(SessionConfig::default())
        .run(ctx.clone(), |ctx| async move {
            let client = ApiClient::for_request(ctx, SessionConfig::default(), api);
            client.current_user().await
        })
        .await
        .unwrap();

    let user = outcome.props().unwrap();
    assert_eq!(user.email, support::EMAIL);
    assert_eq!(ctx.get("authToken").as_deref(), Some("token-1"));
}

// ---------------------------------------------------------------------------
// GuestGuard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_guest_guard_with_token_redirects_to_landing() {
    let runs = Arc::new(AtomicUsize::new(0));

    let outcome = GuestGuard::new(SessionConfig::default())
        .run(ctx_with_token("any-token"), counting_loader(&runs, "sign-in"))
        .await
        .unwrap();

    assert_eq!(outcome.redirect_target(), Some("/dashboard"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_guest_guard_without_token_runs_loader_once() {
    let runs = Arc::new(AtomicUsize::new(0));

    let outcome = GuestGuard::new(SessionConfig::default())
        .run(RequestContext::new(), counting_loader(&runs, "sign-in"))
        .await
        .unwrap();

    assert_eq!(outcome, PageOutcome::Props("sign-in"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_guards_follow_configured_paths() {
    let config = SessionConfig {
        entry_path: "login".into(),
        landing_path: "home".into(),
        ..SessionConfig::default()
    };

    let anonymous = AuthGuard::new(config.clone())
        .run(RequestContext::new(), |_ctx| async { Ok::<_, ClientError>(()) })
        .await
        .unwrap();
    assert_eq!(anonymous.redirect_target(), Some("/login"));

    let signed_in = GuestGuard::new(config)
        .run(ctx_with_token("any-token"), |_ctx| async { Ok::<_, ClientError>(()) })
        .await
        .unwrap();
    assert_eq!(signed_in.redirect_target(), Some("/home"));
}
