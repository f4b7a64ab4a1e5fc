//! BANCA — bankroll tracking dashboard
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects the configured backend, optionally signs in from environment
//! credentials, and serves the dashboard until Ctrl+C.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use banca::backend::memory::{LocalAuth, MemoryStore};
use banca::backend::sqlite::SqliteStore;
use banca::backend::supabase::SupabaseClient;
use banca::backend::{AuthService, Persistence};
use banca::calc::cycle;
use banca::calc::metrics::current_bankroll;
use banca::clock::SystemClock;
use banca::config::{self, BackendKind};
use banca::dashboard::{self, DashboardState};
use banca::engine::snapshot_feed;
use banca::types::AppState;
use banca::view::format_brl;

const BANNER: &str = r#"
 ____    _    _   _  ____    _
| __ )  / \  | \ | |/ ___|  / \
|  _ \ / _ \ |  \| | |     / _ \
| |_) / ___ \| |\  | |___ / ___ \
|____/_/   \_\_| \_|\____/_/   \_\

  Gestão de Banca — metas diárias
  v0.1.0
"#;

const DEFAULT_DATABASE_URL: &str = "sqlite://banca.db";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        app_name = %cfg.app.name,
        currency = %cfg.app.currency,
        backend = ?cfg.backend.kind,
        "BANCA starting up"
    );

    let credentials = cfg
        .credentials()
        .map(|(email, password)| (email, SecretString::new(password)));

    // -- Backend ---------------------------------------------------------

    let (auth, store) = connect_backend(&cfg, credentials.as_ref()).await?;
    info!(auth = auth.name(), store = store.name(), "Backend ready");

    let (feed, rx) = snapshot_feed();
    let state = Arc::new(DashboardState::new(
        Arc::clone(&auth),
        store,
        Arc::new(SystemClock),
        cfg.defaults.clone(),
        feed,
    ));

    tokio::spawn(log_snapshots(rx));

    // -- Session ---------------------------------------------------------

    match &credentials {
        Some((email, password)) => match auth.sign_in(email, password).await {
            Ok(user) => {
                if let Err(e) = state.open_session(user).await {
                    error!(error = %e, "Failed to load bankroll");
                }
            }
            Err(e) => warn!(error = %e, email = %email, "Automatic sign-in failed"),
        },
        None => match state.restore().await {
            Ok(Some(_)) => info!("Resumed existing session"),
            Ok(None) => info!(
                email_env = %cfg.auth.email_env,
                "No credentials in the environment; sign in through the dashboard"
            ),
            Err(e) => warn!(error = %e, "Could not restore session"),
        },
    }

    // -- Serve -----------------------------------------------------------

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("Received Ctrl+C — shutting down gracefully...");
    };

    if cfg.dashboard.enabled {
        dashboard::serve(state, cfg.dashboard.port, shutdown).await?;
    } else {
        info!("Dashboard disabled. Press Ctrl+C to stop.");
        shutdown.await;
    }

    info!("BANCA shut down cleanly.");
    Ok(())
}

/// Pick the auth and persistence adapters for the configured backend kind.
async fn connect_backend(
    cfg: &config::AppConfig,
    credentials: Option<&(String, SecretString)>,
) -> Result<(Arc<dyn AuthService>, Arc<dyn Persistence>)> {
    match cfg.backend.kind {
        BackendKind::Memory => {
            warn!("Using in-memory storage — nothing survives a restart");
            let auth: Arc<dyn AuthService> = Arc::new(local_auth(credentials).await);
            let store: Arc<dyn Persistence> = Arc::new(MemoryStore::new());
            Ok((auth, store))
        }
        BackendKind::Sqlite => {
            let url = cfg
                .backend
                .database_url
                .as_deref()
                .unwrap_or(DEFAULT_DATABASE_URL);
            let store: Arc<dyn Persistence> = Arc::new(
                SqliteStore::connect(url)
                    .await
                    .with_context(|| format!("Failed to open database {url}"))?,
            );
            let auth: Arc<dyn AuthService> = Arc::new(local_auth(credentials).await);
            Ok((auth, store))
        }
        BackendKind::Supabase => {
            let Some(url) = cfg.backend.supabase_url.as_deref() else {
                bail!("backend.supabase_url is required for the supabase backend");
            };
            let key_env = cfg
                .backend
                .supabase_key_env
                .as_deref()
                .unwrap_or("SUPABASE_ANON_KEY");
            let key = config::AppConfig::resolve_env(key_env)?;
            let client = Arc::new(SupabaseClient::new(url, SecretString::new(key))?);
            let auth: Arc<dyn AuthService> = client.clone();
            let store: Arc<dyn Persistence> = client;
            Ok((auth, store))
        }
    }
}

/// Local kinds keep accounts in process, so the env credentials (if any) are
/// registered up front.
async fn local_auth(credentials: Option<&(String, SecretString)>) -> LocalAuth {
    let auth = LocalAuth::new();
    match credentials {
        Some((email, password)) => auth.with_user(email, password.clone()).await,
        None => auth,
    }
}

/// Log every committed snapshot.
async fn log_snapshots(mut rx: watch::Receiver<Option<Arc<AppState>>>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        match snapshot {
            Some(state) => {
                let cycle_state = cycle::evaluate(&state.bankroll, &state.bets, &state.goals);
                info!(
                    user = %state.user.email,
                    bankroll = %format_brl(current_bankroll(&state.bankroll, &state.bets)),
                    cycle = %cycle_state,
                    bets = state.bets.len(),
                    goals = state.goals.len(),
                    "Snapshot updated"
                );
            }
            None => info!("Signed out"),
        }
    }
}

/// Initialise the tracing subscriber with env-filter and optional JSON output.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("banca=info"));

    let json_logging = std::env::var("BANCA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
