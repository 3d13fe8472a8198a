//! A terminal walk-through of a dashboard app's session.
//!
//! Signs in against the API at `KEYWARD_API_URL` (default
//! `http://localhost:3333`), restores the session the way a freshly opened
//! tab would, renders the sections the user may see, loads a guarded page
//! the way the server would, and signs out.
//!
//! ```text
//! KEYWARD_API_URL=http://localhost:3333 \
//! KEYWARD_EMAIL=diego@example.com KEYWARD_PASSWORD=123456 \
//! RUST_LOG=keyward=debug cargo run -p dashboard
//! ```

use std::sync::Arc;

use keyward::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Stands in for the browser router: logs where the app would go.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "navigate");
    }
}

// ---------------------------------------------------------------------------
// Dashboard sections
// ---------------------------------------------------------------------------

fn metrics_requirements() -> Requirements {
    Requirements::new()
        .permission("metrics.list")
        .role("administrator")
}

/// The sections of the dashboard `state` may see, in render order.
fn visible_sections(state: &AuthState) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if state.is_authenticated() {
        sections.push("welcome");
    }
    if let Some(section) = state.gate(&Requirements::new().permission("users.list"), || "users") {
        sections.push(section);
    }
    if let Some(section) = state.gate(&metrics_requirements(), || "metrics") {
        sections.push(section);
    }
    sections
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,keyward=debug")),
        )
        .init();

    let base_url = env_or("KEYWARD_API_URL", "http://localhost:3333");
    let credentials = Credentials::new(
        env_or("KEYWARD_EMAIL", "diego@example.com"),
        env_or("KEYWARD_PASSWORD", "123456"),
    );
    let config = SessionConfig::default();

    // One browser tab: an ambient jar, a router and a handle on the
    // origin's session channel.
    let origin = BusOrigin::new();
    let jar = Arc::new(BrowserJar::new());
    let client = ApiClient::builder()
        .config(config.clone())
        .store(jar.clone())
        .bus(Arc::new(origin.tab(config.channel_name.clone())))
        .navigator(Arc::new(LogNavigator))
        .build(ReqwestTransport::new(&base_url)?);
    let _listener = client.listen_for_sign_out();

    let user = client.sign_in(&credentials).await?;
    tracing::info!(email = %user.email, roles = ?user.claims.roles, "signed in");

    // A reload: the tab starts over from its cookies.
    let state = client.restore_session().await;
    tracing::info!(sections = ?visible_sections(&state), "dashboard rendered");

    if let Some(claims) = client.token_claims().ok().flatten() {
        tracing::info!(permissions = ?claims.permissions, "claims carried by the access token");
    }

    // The same cookies arriving at the server for the metrics page.
    let ctx = RequestContext::from_cookie_header(&jar.cookie_header());
    let transport = ReqwestTransport::new(&base_url)?;
    let page = AuthGuard::new(config.clone())
        .require(metrics_requirements())
        .run(ctx.clone(), |ctx| async move {
            let server_client = ApiClient::for_request(ctx, config, transport);
            server_client.current_user().await
        })
        .await?;
    match page {
        PageOutcome::Props(user) => tracing::info!(email = %user.email, "metrics page rendered"),
        PageOutcome::Redirect(redirect) => {
            tracing::info!(destination = %redirect.destination, "metrics page redirected")
        }
    }
    for header in ctx.set_cookie_headers() {
        tracing::debug!(%header, "set-cookie");
    }

    client.sign_out()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
