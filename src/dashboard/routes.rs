//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`; the
//! session sits behind one async mutex so each action runs to completion
//! before the next one starts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::backend::{AuthService, Persistence};
use crate::calc::bets::BetInput;
use crate::calc::metrics::Metrics;
use crate::calc::projection::{HistoryRow, ProjectionRow};
use crate::clock::Clock;
use crate::config::BankrollDefaults;
use crate::engine::{Session, SnapshotFeed};
use crate::types::{BancaError, BankrollSettings, User};
use crate::view::{BetView, DashboardView};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub auth: Arc<dyn AuthService>,
    pub store: Arc<dyn Persistence>,
    pub clock: Arc<dyn Clock>,
    pub defaults: BankrollDefaults,
    pub feed: Arc<SnapshotFeed>,
    session: Mutex<Option<Session>>,
}

impl DashboardState {
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
        defaults: BankrollDefaults,
        feed: Arc<SnapshotFeed>,
    ) -> Self {
        Self {
            auth,
            store,
            clock,
            defaults,
            feed,
            session: Mutex::new(None),
        }
    }

    /// Load `user`'s bankroll and make it the active session.
    pub async fn open_session(&self, user: User) -> crate::types::Result<DashboardView> {
        let mut guard = self.session.lock().await;
        let session = Session::open(
            user,
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            &self.defaults,
            Arc::clone(&self.feed),
        )
        .await?;
        let view = session.view();
        *guard = Some(session);
        Ok(view)
    }

    /// Resume the auth backend's existing session, if it has one.
    pub async fn restore(&self) -> crate::types::Result<Option<DashboardView>> {
        match self.auth.current_session().await? {
            Some(user) => self.open_session(user).await.map(Some),
            None => Ok(None),
        }
    }

    async fn close_session(&self) {
        *self.session.lock().await = None;
        self.feed.send_replace(None);
    }
}

pub type SharedState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A `BancaError` rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub BancaError);

impl From<BancaError> for ApiError {
    fn from(err: BancaError) -> Self {
        ApiError(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BancaError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BancaError::Backend { .. } => StatusCode::BAD_GATEWAY,
            BancaError::Auth(_) | BancaError::NotSignedIn => StatusCode::UNAUTHORIZED,
            BancaError::NotFound(_) => StatusCode::NOT_FOUND,
            BancaError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    fn secret(&self) -> SecretString {
        SecretString::new(self.password.clone())
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: Option<User>,
    pub confirmation_required: bool,
    /// Present when the new account was signed in right away.
    pub view: Option<DashboardView>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.store.name().to_string(),
    })
}

/// GET /api/view
pub async fn get_view(State(state): State<SharedState>) -> ApiResult<Json<DashboardView>> {
    Ok(Json(current_view(&state).await?))
}

/// GET /api/metrics
pub async fn get_metrics(State(state): State<SharedState>) -> ApiResult<Json<Metrics>> {
    Ok(Json(current_view(&state).await?.metrics))
}

/// GET /api/bets
pub async fn get_bets(State(state): State<SharedState>) -> ApiResult<Json<Vec<BetView>>> {
    Ok(Json(current_view(&state).await?.bets))
}

/// GET /api/history
pub async fn get_history(State(state): State<SharedState>) -> ApiResult<Json<Vec<HistoryRow>>> {
    Ok(Json(current_view(&state).await?.history))
}

/// GET /api/projection
pub async fn get_projection(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<ProjectionRow>>> {
    Ok(Json(current_view(&state).await?.projection))
}

/// POST /api/bets
pub async fn post_bet(
    State(state): State<SharedState>,
    Json(input): Json<BetInput>,
) -> ApiResult<(StatusCode, Json<BetView>)> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or(BancaError::NotSignedIn)?;
    let bet = session.record_bet(&input).await?;
    Ok((StatusCode::CREATED, Json(BetView::from(&bet))))
}

/// DELETE /api/bets/:id
pub async fn delete_bet(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or(BancaError::NotSignedIn)?;
    session.delete_bet(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/settings
pub async fn post_settings(
    State(state): State<SharedState>,
    Json(settings): Json<BankrollSettings>,
) -> ApiResult<Json<DashboardView>> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or(BancaError::NotSignedIn)?;
    session.save_settings(settings).await?;
    Ok(Json(session.view()))
}

/// POST /api/cycle/close
pub async fn post_close_cycle(State(state): State<SharedState>) -> ApiResult<Json<DashboardView>> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or(BancaError::NotSignedIn)?;
    session.close_cycle().await?;
    Ok(Json(session.view()))
}

/// POST /api/cycle/new
pub async fn post_new_cycle(State(state): State<SharedState>) -> ApiResult<Json<DashboardView>> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or(BancaError::NotSignedIn)?;
    session.start_new_cycle().await?;
    Ok(Json(session.view()))
}

/// GET /api/auth/session
pub async fn get_session(State(state): State<SharedState>) -> ApiResult<Json<SessionResponse>> {
    let guard = state.session.lock().await;
    let user = guard.as_ref().map(|s| s.user().clone());
    Ok(Json(SessionResponse { user }))
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<SharedState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<DashboardView>> {
    let user = state
        .auth
        .sign_in(credentials.email.trim(), &credentials.secret())
        .await?;
    Ok(Json(state.open_session(user).await?))
}

/// POST /api/auth/sign-up
pub async fn sign_up(
    State(state): State<SharedState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<SignUpResponse>)> {
    let email = credentials.email.trim();
    let outcome = state.auth.sign_up(email, &credentials.secret()).await?;

    let view = match (&outcome.user, outcome.confirmation_required) {
        (Some(user), false) => Some(state.open_session(user.clone()).await?),
        _ => {
            info!(email, "Account awaits e-mail confirmation");
            None
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user: outcome.user,
            confirmation_required: outcome.confirmation_required,
            view,
        }),
    ))
}

/// POST /api/auth/sign-out
pub async fn sign_out(State(state): State<SharedState>) -> ApiResult<StatusCode> {
    state.auth.sign_out().await?;
    state.close_session().await;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_view(state: &DashboardState) -> ApiResult<DashboardView> {
    let guard = state.session.lock().await;
    let session = guard.as_ref().ok_or(BancaError::NotSignedIn)?;
    Ok(session.view())
}
