//! In-process backend.
//!
//! `MemoryStore` keeps all records in maps behind a `tokio::sync::RwLock`;
//! goal records are keyed by (bankroll_id, date) so upserts are a single map
//! insert. `LocalAuth` keeps registered users for the lifetime of the process.
//! Both can be told to fail, which is how tests exercise backend errors.

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{AuthService, Persistence, SignUp};
use crate::types::{
    BancaError, Bankroll, Bet, DailyGoalRecord, GoalUpsert, NewBankroll, NewBet, Result, User,
};

const BACKEND: &str = "memory";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tables {
    bankrolls: HashMap<String, Bankroll>,
    bets: HashMap<String, Bet>,
    goals: BTreeMap<(String, NaiveDate), DailyGoalRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// If set, every operation fails with this message.
    force_error: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force all subsequent operations to return a backend error.
    pub async fn set_error(&self, msg: &str) {
        *self.force_error.write().await = Some(msg.to_string());
    }

    pub async fn clear_error(&self) {
        *self.force_error.write().await = None;
    }

    /// Number of goal records stored for a bankroll.
    pub async fn goal_count(&self, bankroll_id: &str) -> usize {
        self.tables
            .read()
            .await
            .goals
            .keys()
            .filter(|(id, _)| id == bankroll_id)
            .count()
    }

    async fn check(&self) -> Result<()> {
        match self.force_error.read().await.as_deref() {
            Some(msg) => Err(BancaError::backend(BACKEND, msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn fetch_bankroll(&self, owner_id: &str) -> Result<Option<Bankroll>> {
        self.check().await?;
        let tables = self.tables.read().await;
        Ok(tables.bankrolls.values().find(|b| b.owner_id == owner_id).cloned())
    }

    async fn insert_bankroll(&self, new: NewBankroll) -> Result<Bankroll> {
        self.check().await?;
        let bankroll = Bankroll {
            id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            initial_amount: new.initial_amount,
            daily_goal_percent: new.daily_goal_percent,
            label: new.label,
            cycle_started_at: new.cycle_started_at,
        };
        self.tables
            .write()
            .await
            .bankrolls
            .insert(bankroll.id.clone(), bankroll.clone());
        debug!(id = %bankroll.id, "Bankroll inserted");
        Ok(bankroll)
    }

    async fn update_bankroll(&self, bankroll: &Bankroll) -> Result<Bankroll> {
        self.check().await?;
        let mut tables = self.tables.write().await;
        match tables.bankrolls.get_mut(&bankroll.id) {
            Some(stored) => {
                *stored = bankroll.clone();
                Ok(stored.clone())
            }
            None => Err(BancaError::NotFound(format!("bankroll {}", bankroll.id))),
        }
    }

    async fn list_bets(&self, bankroll_id: &str) -> Result<Vec<Bet>> {
        self.check().await?;
        let tables = self.tables.read().await;
        let mut bets: Vec<Bet> = tables
            .bets
            .values()
            .filter(|b| b.bankroll_id == bankroll_id)
            .cloned()
            .collect();
        bets.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(bets)
    }

    async fn insert_bet(&self, new: NewBet) -> Result<Bet> {
        self.check().await?;
        let bet = Bet {
            id: Uuid::new_v4().to_string(),
            bankroll_id: new.bankroll_id,
            amount_staked: new.amount_staked,
            amount_returned: new.amount_returned,
            outcome: new.outcome,
            timestamp: new.timestamp,
        };
        self.tables.write().await.bets.insert(bet.id.clone(), bet.clone());
        Ok(bet)
    }

    async fn delete_bet(&self, bankroll_id: &str, bet_id: &str) -> Result<()> {
        self.check().await?;
        let mut tables = self.tables.write().await;
        match tables.bets.get(bet_id) {
            Some(bet) if bet.bankroll_id == bankroll_id => {
                tables.bets.remove(bet_id);
                Ok(())
            }
            _ => Err(BancaError::NotFound(format!("bet {bet_id}"))),
        }
    }

    async fn delete_bets(&self, bankroll_id: &str) -> Result<u64> {
        self.check().await?;
        let mut tables = self.tables.write().await;
        let before = tables.bets.len();
        tables.bets.retain(|_, b| b.bankroll_id != bankroll_id);
        Ok((before - tables.bets.len()) as u64)
    }

    async fn list_goals(&self, bankroll_id: &str) -> Result<Vec<DailyGoalRecord>> {
        self.check().await?;
        let tables = self.tables.read().await;
        // BTreeMap order is (bankroll_id, date), so this is already ascending.
        Ok(tables
            .goals
            .iter()
            .filter(|((id, _), _)| id == bankroll_id)
            .map(|(_, g)| g.clone())
            .collect())
    }

    async fn upsert_goal(&self, goal: GoalUpsert) -> Result<DailyGoalRecord> {
        self.check().await?;
        let mut tables = self.tables.write().await;
        let key = (goal.bankroll_id.clone(), goal.date);
        let id = tables
            .goals
            .get(&key)
            .map(|g| g.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let record = DailyGoalRecord {
            id,
            bankroll_id: goal.bankroll_id,
            date: goal.date,
            status: goal.status,
            final_profit: goal.final_profit,
            final_bankroll: goal.final_bankroll,
            closed_at: goal.closed_at,
        };
        tables.goals.insert(key, record.clone());
        Ok(record)
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Process-local accounts. Passwords never leave their `SecretString`.
#[derive(Debug, Default)]
pub struct LocalAuth {
    users: RwLock<HashMap<String, (User, SecretString)>>,
    session: RwLock<Option<User>>,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account up front (e.g. from env credentials).
    pub async fn with_user(self, email: &str, password: SecretString) -> Self {
        self.register(email, password).await;
        self
    }

    async fn register(&self, email: &str, password: SecretString) -> User {
        let key = email.trim().to_lowercase();
        let mut users = self.users.write().await;
        let entry = users.entry(key.clone()).or_insert_with(|| {
            (
                User { id: Uuid::new_v4().to_string(), email: key },
                SecretString::new(String::new()),
            )
        });
        entry.1 = password;
        entry.0.clone()
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn current_session(&self) -> Result<Option<User>> {
        Ok(self.session.read().await.clone())
    }

    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<User> {
        let key = email.trim().to_lowercase();
        let user = {
            let users = self.users.read().await;
            match users.get(&key) {
                Some((user, stored)) if stored.expose_secret() == password.expose_secret() => {
                    user.clone()
                }
                _ => return Err(BancaError::Auth("Email ou senha inválidos.".to_string())),
            }
        };
        *self.session.write().await = Some(user.clone());
        info!(email = %user.email, "Signed in");
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp> {
        if !email.contains('@') {
            return Err(BancaError::validation("Email inválido."));
        }
        if password.expose_secret().len() < 6 {
            return Err(BancaError::validation("A senha deve ter pelo menos 6 caracteres."));
        }
        if self.users.read().await.contains_key(&email.trim().to_lowercase()) {
            return Err(BancaError::Auth("Usuário já cadastrado.".to_string()));
        }
        let user = self
            .register(email, SecretString::new(password.expose_secret().clone()))
            .await;
        info!(email = %user.email, "Account created");
        Ok(SignUp { user: Some(user), confirmation_required: false })
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
