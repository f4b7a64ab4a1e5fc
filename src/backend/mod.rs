//! Backend integrations.
//!
//! Defines the `AuthService` and `Persistence` traits and provides
//! implementations for:
//! - `MemoryStore` / `LocalAuth`: in-process, used for tests and demos
//! - `SqliteStore`: local SQLite file via sqlx
//! - `SupabaseClient`: hosted auth + PostgREST tables

pub mod memory;
pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::types::{
    Bankroll, Bet, DailyGoalRecord, GoalUpsert, NewBankroll, NewBet, Result, User,
};

/// Outcome of a registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub user: Option<User>,
    /// The backend sent a confirmation e-mail before the account is usable.
    pub confirmation_required: bool,
}

/// Abstraction over the authentication provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// The signed-in user, if a session is active.
    async fn current_session(&self) -> Result<Option<User>>;

    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<User>;

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp>;

    async fn sign_out(&self) -> Result<()>;

    /// Adapter name for logging.
    fn name(&self) -> &str;
}

/// Record-oriented storage for bankrolls, bets and goal records.
///
/// Implementors never apply business rules; they store what they are given.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn fetch_bankroll(&self, owner_id: &str) -> Result<Option<Bankroll>>;

    async fn insert_bankroll(&self, bankroll: NewBankroll) -> Result<Bankroll>;

    /// Replace the stored bankroll with the same id.
    async fn update_bankroll(&self, bankroll: &Bankroll) -> Result<Bankroll>;

    /// Bets of a bankroll, most recent first.
    async fn list_bets(&self, bankroll_id: &str) -> Result<Vec<Bet>>;

    async fn insert_bet(&self, bet: NewBet) -> Result<Bet>;

    async fn delete_bet(&self, bankroll_id: &str, bet_id: &str) -> Result<()>;

    /// Delete every bet of a bankroll, returning how many were removed.
    async fn delete_bets(&self, bankroll_id: &str) -> Result<u64>;

    /// Goal records of a bankroll, ascending by date.
    async fn list_goals(&self, bankroll_id: &str) -> Result<Vec<DailyGoalRecord>>;

    /// Insert or replace the record keyed by (bankroll_id, date).
    async fn upsert_goal(&self, goal: GoalUpsert) -> Result<DailyGoalRecord>;

    /// Adapter name for logging.
    fn name(&self) -> &str;
}
