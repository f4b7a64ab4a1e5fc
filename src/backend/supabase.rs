//! Supabase integration: GoTrue auth plus PostgREST tables.
//!
//! Tables: `bancas`, `jogadas`, `metas_diarias`.
//! Auth: `apikey` header with the project's anon key on every request;
//! `Authorization: Bearer {access_token}` once signed in so row-level
//! security scopes rows to the user.
//! Goal upsert: `POST /metas_diarias?on_conflict=banca_id,data` with
//! `Prefer: resolution=merge-duplicates`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{AuthService, Persistence, SignUp};
use crate::types::{
    BancaError, Bankroll, Bet, DailyGoalRecord, GoalStatus, GoalUpsert, NewBankroll, NewBet,
    OutcomeKind, Result, User,
};

const BACKEND: &str = "supabase";

const RETURN_ROWS: &str = "return=representation";
const UPSERT_ROWS: &str = "resolution=merge-duplicates,return=representation";

// ---------------------------------------------------------------------------
// Wire types (PostgREST JSON ↔ Rust)
// ---------------------------------------------------------------------------

/// Ids are uuid strings or bigint numbers depending on the table definition.
fn opaque_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id value: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
struct BancaRow {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
    user_id: String,
    nome_banca: String,
    valor_inicial: Decimal,
    meta_diaria_percentual: Decimal,
    /// Rows created before cycle tracking existed have no value.
    #[serde(default)]
    ciclo_iniciado_em: Option<DateTime<Utc>>,
}

impl From<BancaRow> for Bankroll {
    fn from(row: BancaRow) -> Self {
        Bankroll {
            id: row.id,
            owner_id: row.user_id,
            initial_amount: row.valor_inicial,
            daily_goal_percent: row.meta_diaria_percentual,
            label: row.nome_banca,
            cycle_started_at: row.ciclo_iniciado_em.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BancaWrite<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    nome_banca: &'a str,
    valor_inicial: Decimal,
    meta_diaria_percentual: Decimal,
    ciclo_iniciado_em: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct JogadaRow {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
    #[serde(deserialize_with = "opaque_id")]
    banca_id: String,
    valor_apostado: Decimal,
    valor_retorno: Decimal,
    tipo_resultado: String,
    data_jogada: DateTime<Utc>,
}

impl TryFrom<JogadaRow> for Bet {
    type Error = BancaError;

    fn try_from(row: JogadaRow) -> Result<Self> {
        Ok(Bet {
            id: row.id,
            bankroll_id: row.banca_id,
            amount_staked: row.valor_apostado,
            amount_returned: row.valor_retorno,
            outcome: row.tipo_resultado.parse::<OutcomeKind>()?,
            timestamp: row.data_jogada,
        })
    }
}

#[derive(Debug, Serialize)]
struct JogadaWrite<'a> {
    banca_id: &'a str,
    valor_apostado: Decimal,
    valor_retorno: Decimal,
    tipo_resultado: &'static str,
    data_jogada: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MetaRow {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
    #[serde(deserialize_with = "opaque_id")]
    banca_id: String,
    data: NaiveDate,
    status: String,
    #[serde(default)]
    lucro_final: Decimal,
    #[serde(default)]
    banca_final: Decimal,
    #[serde(default)]
    concluida_em: Option<DateTime<Utc>>,
}

impl TryFrom<MetaRow> for DailyGoalRecord {
    type Error = BancaError;

    fn try_from(row: MetaRow) -> Result<Self> {
        Ok(DailyGoalRecord {
            id: row.id,
            bankroll_id: row.banca_id,
            date: row.data,
            status: row.status.parse::<GoalStatus>()?,
            final_profit: row.lucro_final,
            final_bankroll: row.banca_final,
            closed_at: row.concluida_em.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct MetaWrite<'a> {
    banca_id: &'a str,
    data: NaiveDate,
    status: &'static str,
    lucro_final: Decimal,
    banca_final: Decimal,
    concluida_em: DateTime<Utc>,
}

fn wire_status(status: GoalStatus) -> &'static str {
    match status {
        GoalStatus::Open => "aberta",
        GoalStatus::Completed => "concluida",
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl AuthUser {
    fn into_user(self, fallback_email: &str) -> User {
        User {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

/// `/signup` returns a session when e-mail confirmation is off, or the bare
/// user object when it is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending(AuthUser),
}

/// PostgREST equality filter, e.g. `banca_id=eq.42`.
fn eq_filter(column: &str, value: &str) -> String {
    format!("{column}=eq.{}", urlencoding::encode(value))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct ActiveSession {
    user: User,
    access_token: SecretString,
}

/// Supabase client implementing both auth and persistence.
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: SecretString,
    session: RwLock<Option<ActiveSession>>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("BANCA/0.1.0 (bankroll-dashboard)")
            .build()
            .map_err(|e| BancaError::backend(BACKEND, e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            session: RwLock::new(None),
        })
    }

    // -- Internal helpers ------------------------------------------------

    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(s) => s.access_token.expose_secret().clone(),
            None => self.anon_key.expose_secret().clone(),
        }
    }

    async fn rest(&self, method: Method, table: &str, query: &str) -> RequestBuilder {
        let url = if query.is_empty() {
            format!("{}/rest/v1/{table}", self.base_url)
        } else {
            format!("{}/rest/v1/{table}?{query}", self.base_url)
        };
        debug!(%method, url = %url, "Supabase request");
        self.http
            .request(method, url)
            .header("apikey", self.anon_key.expose_secret().as_str())
            .bearer_auth(self.bearer().await)
    }

    fn auth_request(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}/auth/v1/{path}", self.base_url))
            .header("apikey", self.anon_key.expose_secret().as_str())
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| BancaError::backend(BACKEND, format!("{what}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, what, "Supabase request rejected");
            return Err(BancaError::backend(BACKEND, format!("{what} failed {status}: {body}")));
        }
        Ok(resp)
    }

    async fn rows<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<Vec<T>> {
        self.send(req, what)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| BancaError::backend(BACKEND, format!("{what}: bad response: {e}")))
    }

    async fn single<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        self.rows::<T>(req, what)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BancaError::backend(BACKEND, format!("{what}: no row returned")))
    }

    async fn store_session(&self, token: TokenResponse, email: &str) -> User {
        let user = token.user.into_user(email);
        *self.session.write().await = Some(ActiveSession {
            user: user.clone(),
            access_token: SecretString::new(token.access_token),
        });
        user
    }
}

#[async_trait]
impl AuthService for SupabaseClient {
    async fn current_session(&self) -> Result<Option<User>> {
        Ok(self.session.read().await.as_ref().map(|s| s.user.clone()))
    }

    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<User> {
        let resp = self
            .auth_request("token?grant_type=password")
            .json(&serde_json::json!({ "email": email, "password": password.expose_secret() }))
            .send()
            .await
            .map_err(|e| BancaError::backend(BACKEND, format!("sign-in: {e}")))?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(BancaError::Auth("Email ou senha inválidos.".to_string()));
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                return Err(BancaError::backend(BACKEND, format!("sign-in failed {status}: {body}")));
            }
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| BancaError::backend(BACKEND, format!("sign-in: bad response: {e}")))?;
        let user = self.store_session(token, email).await;
        info!(email = %user.email, "Signed in to Supabase");
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp> {
        let req = self
            .auth_request("signup")
            .json(&serde_json::json!({ "email": email, "password": password.expose_secret() }));
        let resp = self.send(req, "sign-up").await?;
        let body: SignUpResponse = resp
            .json()
            .await
            .map_err(|e| BancaError::backend(BACKEND, format!("sign-up: bad response: {e}")))?;

        Ok(match body {
            SignUpResponse::Session(token) => SignUp {
                user: Some(self.store_session(token, email).await),
                confirmation_required: false,
            },
            SignUpResponse::Pending(user) => SignUp {
                user: Some(user.into_user(email)),
                confirmation_required: true,
            },
        })
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.session.write().await.take();
        if let Some(session) = token {
            let req = self
                .auth_request("logout")
                .bearer_auth(session.access_token.expose_secret());
            // The local session is gone either way; a failed revoke only logs.
            if let Err(e) = self.send(req, "sign-out").await {
                warn!(error = %e, "Token revocation failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

#[async_trait]
impl Persistence for SupabaseClient {
    async fn fetch_bankroll(&self, owner_id: &str) -> Result<Option<Bankroll>> {
        let query = format!("select=*&limit=1&{}", eq_filter("user_id", owner_id));
        let req = self.rest(Method::GET, "bancas", &query).await;
        let rows: Vec<BancaRow> = self.rows(req, "fetch bankroll").await?;
        Ok(rows.into_iter().next().map(Bankroll::from))
    }

    async fn insert_bankroll(&self, new: NewBankroll) -> Result<Bankroll> {
        let req = self
            .rest(Method::POST, "bancas", "")
            .await
            .header("Prefer", RETURN_ROWS)
            .json(&BancaWrite {
                user_id: Some(&new.owner_id),
                nome_banca: &new.label,
                valor_inicial: new.initial_amount,
                meta_diaria_percentual: new.daily_goal_percent,
                ciclo_iniciado_em: new.cycle_started_at,
            });
        let row: BancaRow = self.single(req, "insert bankroll").await?;
        Ok(row.into())
    }

    async fn update_bankroll(&self, bankroll: &Bankroll) -> Result<Bankroll> {
        let req = self
            .rest(Method::PATCH, "bancas", &eq_filter("id", &bankroll.id))
            .await
            .header("Prefer", RETURN_ROWS)
            .json(&BancaWrite {
                user_id: None,
                nome_banca: &bankroll.label,
                valor_inicial: bankroll.initial_amount,
                meta_diaria_percentual: bankroll.daily_goal_percent,
                ciclo_iniciado_em: bankroll.cycle_started_at,
            });
        let rows: Vec<BancaRow> = self.rows(req, "update bankroll").await?;
        rows.into_iter()
            .next()
            .map(Bankroll::from)
            .ok_or_else(|| BancaError::NotFound(format!("bankroll {}", bankroll.id)))
    }

    async fn list_bets(&self, bankroll_id: &str) -> Result<Vec<Bet>> {
        let query = format!("select=*&order=data_jogada.desc&{}", eq_filter("banca_id", bankroll_id));
        let req = self.rest(Method::GET, "jogadas", &query).await;
        let rows: Vec<JogadaRow> = self.rows(req, "list bets").await?;
        rows.into_iter().map(Bet::try_from).collect()
    }

    async fn insert_bet(&self, new: NewBet) -> Result<Bet> {
        let req = self
            .rest(Method::POST, "jogadas", "")
            .await
            .header("Prefer", RETURN_ROWS)
            .json(&JogadaWrite {
                banca_id: &new.bankroll_id,
                valor_apostado: new.amount_staked,
                valor_retorno: new.amount_returned,
                tipo_resultado: new.outcome.as_str(),
                data_jogada: new.timestamp,
            });
        let row: JogadaRow = self.single(req, "insert bet").await?;
        row.try_into()
    }

    async fn delete_bet(&self, bankroll_id: &str, bet_id: &str) -> Result<()> {
        let query = format!("{}&{}", eq_filter("id", bet_id), eq_filter("banca_id", bankroll_id));
        let req = self
            .rest(Method::DELETE, "jogadas", &query)
            .await
            .header("Prefer", RETURN_ROWS);
        let removed: Vec<serde_json::Value> = self.rows(req, "delete bet").await?;
        if removed.is_empty() {
            return Err(BancaError::NotFound(format!("bet {bet_id}")));
        }
        Ok(())
    }

    async fn delete_bets(&self, bankroll_id: &str) -> Result<u64> {
        let req = self
            .rest(Method::DELETE, "jogadas", &eq_filter("banca_id", bankroll_id))
            .await
            .header("Prefer", RETURN_ROWS);
        let removed: Vec<serde_json::Value> = self.rows(req, "clear bets").await?;
        Ok(removed.len() as u64)
    }

    async fn list_goals(&self, bankroll_id: &str) -> Result<Vec<DailyGoalRecord>> {
        let query = format!("select=*&order=data.asc&{}", eq_filter("banca_id", bankroll_id));
        let req = self.rest(Method::GET, "metas_diarias", &query).await;
        let rows: Vec<MetaRow> = self.rows(req, "list goals").await?;
        rows.into_iter().map(DailyGoalRecord::try_from).collect()
    }

    async fn upsert_goal(&self, goal: GoalUpsert) -> Result<DailyGoalRecord> {
        let req = self
            .rest(Method::POST, "metas_diarias", "on_conflict=banca_id,data")
            .await
            .header("Prefer", UPSERT_ROWS)
            .json(&MetaWrite {
                banca_id: &goal.bankroll_id,
                data: goal.date,
                status: wire_status(goal.status),
                lucro_final: goal.final_profit,
                banca_final: goal.final_bankroll,
                concluida_em: goal.closed_at,
            });
        let row: MetaRow = self.single(req, "upsert goal").await?;
        row.try_into()
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
