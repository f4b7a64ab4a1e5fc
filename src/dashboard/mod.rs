//! Dashboard — Axum web server for the bankroll page.
//!
//! Serves a JSON API and a self-contained HTML page.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::Html,
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use routes::{DashboardState, SharedState};

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Bind `port` and serve until `shutdown` resolves.
pub async fn serve<F>(state: SharedState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Dashboard server error")
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Dashboard data
        .route("/api/view", get(routes::get_view))
        .route("/api/metrics", get(routes::get_metrics))
        .route("/api/bets", get(routes::get_bets).post(routes::post_bet))
        .route("/api/bets/:id", delete(routes::delete_bet))
        .route("/api/history", get(routes::get_history))
        .route("/api/projection", get(routes::get_projection))
        // Actions
        .route("/api/settings", post(routes::post_settings))
        .route("/api/cycle/close", post(routes::post_close_cycle))
        .route("/api/cycle/new", post(routes::post_new_cycle))
        // Auth
        .route("/api/auth/session", get(routes::get_session))
        .route("/api/auth/sign-in", post(routes::sign_in))
        .route("/api/auth/sign-up", post(routes::sign_up))
        .route("/api/auth/sign-out", post(routes::sign_out))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
