//! SQLite persistence via sqlx.
//!
//! Money is stored as decimal text and instants as fixed-width RFC 3339 so
//! that string ordering matches time ordering. The (bankroll_id, date)
//! uniqueness constraint backs the goal upsert.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::Persistence;
use crate::types::{
    BancaError, Bankroll, Bet, DailyGoalRecord, GoalUpsert, NewBankroll, NewBet, Result,
};

const BACKEND: &str = "sqlite";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS bankrolls (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL UNIQUE,
        initial_amount TEXT NOT NULL,
        daily_goal_percent TEXT NOT NULL,
        label TEXT NOT NULL,
        cycle_started_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS bets (
        id TEXT PRIMARY KEY,
        bankroll_id TEXT NOT NULL REFERENCES bankrolls(id),
        amount_staked TEXT NOT NULL,
        amount_returned TEXT NOT NULL,
        outcome TEXT NOT NULL,
        timestamp TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_bets_bankroll ON bets (bankroll_id, timestamp)",
    "CREATE TABLE IF NOT EXISTS daily_goals (
        id TEXT PRIMARY KEY,
        bankroll_id TEXT NOT NULL REFERENCES bankrolls(id),
        date TEXT NOT NULL,
        status TEXT NOT NULL,
        final_profit TEXT NOT NULL,
        final_bankroll TEXT NOT NULL,
        closed_at TEXT NOT NULL,
        UNIQUE (bankroll_id, date)
    )",
];

fn db_err(err: sqlx::Error) -> BancaError {
    BancaError::backend(BACKEND, err)
}

fn instant_text(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn text(row: &SqliteRow, col: &str) -> Result<String> {
    row.try_get::<String, _>(col).map_err(db_err)
}

fn decimal(row: &SqliteRow, col: &str) -> Result<Decimal> {
    let raw = text(row, col)?;
    Decimal::from_str(&raw)
        .map_err(|e| BancaError::backend(BACKEND, format!("column {col}: {e}")))
}

fn instant(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>> {
    let raw = text(row, col)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BancaError::backend(BACKEND, format!("column {col}: {e}")))
}

fn bankroll_from_row(row: &SqliteRow) -> Result<Bankroll> {
    Ok(Bankroll {
        id: text(row, "id")?,
        owner_id: text(row, "owner_id")?,
        initial_amount: decimal(row, "initial_amount")?,
        daily_goal_percent: decimal(row, "daily_goal_percent")?,
        label: text(row, "label")?,
        cycle_started_at: instant(row, "cycle_started_at")?,
    })
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet> {
    Ok(Bet {
        id: text(row, "id")?,
        bankroll_id: text(row, "bankroll_id")?,
        amount_staked: decimal(row, "amount_staked")?,
        amount_returned: decimal(row, "amount_returned")?,
        outcome: text(row, "outcome")?.parse()?,
        timestamp: instant(row, "timestamp")?,
    })
}

fn goal_from_row(row: &SqliteRow) -> Result<DailyGoalRecord> {
    let raw_date = text(row, "date")?;
    Ok(DailyGoalRecord {
        id: text(row, "id")?,
        bankroll_id: text(row, "bankroll_id")?,
        date: NaiveDate::from_str(&raw_date)
            .map_err(|e| BancaError::backend(BACKEND, format!("column date: {e}")))?,
        status: text(row, "status")?.parse()?,
        final_profit: decimal(row, "final_profit")?,
        final_bankroll: decimal(row, "final_bankroll")?,
        closed_at: instant(row, "closed_at")?,
    })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);

        // One connection: `sqlite::memory:` databases are per-connection, and
        // the dashboard serialises writes anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_err)?;
        }

        info!(url, "SQLite store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn fetch_bankroll(&self, owner_id: &str) -> Result<Option<Bankroll>> {
        let row = sqlx::query("SELECT * FROM bankrolls WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(bankroll_from_row).transpose()
    }

    async fn insert_bankroll(&self, new: NewBankroll) -> Result<Bankroll> {
        let row = sqlx::query(
            "INSERT INTO bankrolls (id, owner_id, initial_amount, daily_goal_percent, label, cycle_started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.owner_id)
        .bind(new.initial_amount.to_string())
        .bind(new.daily_goal_percent.to_string())
        .bind(&new.label)
        .bind(instant_text(new.cycle_started_at))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        bankroll_from_row(&row)
    }

    async fn update_bankroll(&self, bankroll: &Bankroll) -> Result<Bankroll> {
        let row = sqlx::query(
            "UPDATE bankrolls
             SET initial_amount = ?2, daily_goal_percent = ?3, label = ?4, cycle_started_at = ?5
             WHERE id = ?1
             RETURNING *",
        )
        .bind(&bankroll.id)
        .bind(bankroll.initial_amount.to_string())
        .bind(bankroll.daily_goal_percent.to_string())
        .bind(&bankroll.label)
        .bind(instant_text(bankroll.cycle_started_at))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => bankroll_from_row(&row),
            None => Err(BancaError::NotFound(format!("bankroll {}", bankroll.id))),
        }
    }

    async fn list_bets(&self, bankroll_id: &str) -> Result<Vec<Bet>> {
        let rows = sqlx::query("SELECT * FROM bets WHERE bankroll_id = ?1 ORDER BY timestamp DESC")
            .bind(bankroll_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(bet_from_row).collect()
    }

    async fn insert_bet(&self, new: NewBet) -> Result<Bet> {
        let row = sqlx::query(
            "INSERT INTO bets (id, bankroll_id, amount_staked, amount_returned, outcome, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.bankroll_id)
        .bind(new.amount_staked.to_string())
        .bind(new.amount_returned.to_string())
        .bind(new.outcome.as_str())
        .bind(instant_text(new.timestamp))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        bet_from_row(&row)
    }

    async fn delete_bet(&self, bankroll_id: &str, bet_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM bets WHERE id = ?1 AND bankroll_id = ?2")
            .bind(bet_id)
            .bind(bankroll_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(BancaError::NotFound(format!("bet {bet_id}")));
        }
        Ok(())
    }

    async fn delete_bets(&self, bankroll_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM bets WHERE bankroll_id = ?1")
            .bind(bankroll_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        debug!(bankroll_id, removed = result.rows_affected(), "Bets cleared");
        Ok(result.rows_affected())
    }

    async fn list_goals(&self, bankroll_id: &str) -> Result<Vec<DailyGoalRecord>> {
        let rows = sqlx::query("SELECT * FROM daily_goals WHERE bankroll_id = ?1 ORDER BY date ASC")
            .bind(bankroll_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(goal_from_row).collect()
    }

    async fn upsert_goal(&self, goal: GoalUpsert) -> Result<DailyGoalRecord> {
        let row = sqlx::query(
            "INSERT INTO daily_goals (id, bankroll_id, date, status, final_profit, final_bankroll, closed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (bankroll_id, date) DO UPDATE SET
                status = excluded.status,
                final_profit = excluded.final_profit,
                final_bankroll = excluded.final_bankroll,
                closed_at = excluded.closed_at
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&goal.bankroll_id)
        .bind(goal.date.format("%Y-%m-%d").to_string())
        .bind(goal.status.as_str())
        .bind(goal.final_profit.to_string())
        .bind(goal.final_bankroll.to_string())
        .bind(instant_text(goal.closed_at))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        goal_from_row(&row)
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
