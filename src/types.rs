//! Shared types for the BANCA dashboard.
//!
//! These types form the data model used across all modules: the bankroll,
//! individual bets, the archived daily goal records, and the explicit
//! application-state snapshot that every operation consumes and produces.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::view::format_brl;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An authenticated user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.email, self.id)
    }
}

// ---------------------------------------------------------------------------
// Bankroll
// ---------------------------------------------------------------------------

/// A user's tracked capital base and daily goal configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bankroll {
    pub id: String,
    pub owner_id: String,
    /// Bankroll at the start of the current cycle.
    pub initial_amount: Decimal,
    /// Daily profit goal as a percentage of `initial_amount`.
    pub daily_goal_percent: Decimal,
    pub label: String,
    /// When the current cycle was opened.
    #[serde(default)]
    pub cycle_started_at: DateTime<Utc>,
}

impl fmt::Display for Bankroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | inicial={} | meta={}%",
            self.label,
            format_brl(self.initial_amount),
            self.daily_goal_percent,
        )
    }
}

/// Fields for creating a bankroll; the backend assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankroll {
    pub owner_id: String,
    pub initial_amount: Decimal,
    pub daily_goal_percent: Decimal,
    pub label: String,
    pub cycle_started_at: DateTime<Utc>,
}

/// User-editable bankroll settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollSettings {
    pub label: String,
    pub initial_amount: Decimal,
    pub daily_goal_percent: Decimal,
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// How a recorded roulette bet ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// One of the covered numbers hit.
    WinOnNumber,
    /// Zero hit and only the zero stake paid out.
    WinOnZero,
    Loss,
}

impl OutcomeKind {
    pub const ALL: &'static [OutcomeKind] =
        &[OutcomeKind::WinOnNumber, OutcomeKind::WinOnZero, OutcomeKind::Loss];

    /// Stable identifier used by storage adapters.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::WinOnNumber => "win_on_number",
            OutcomeKind::WinOnZero => "win_on_zero",
            OutcomeKind::Loss => "loss",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::WinOnNumber => write!(f, "Vitória (número)"),
            OutcomeKind::WinOnZero => write!(f, "Vitória (zero)"),
            OutcomeKind::Loss => write!(f, "Derrota"),
        }
    }
}

impl std::str::FromStr for OutcomeKind {
    type Err = BancaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "win_on_number" | "vitoria_numero" => Ok(OutcomeKind::WinOnNumber),
            "win_on_zero" | "vitoria_zero" => Ok(OutcomeKind::WinOnZero),
            "loss" | "derrota" => Ok(OutcomeKind::Loss),
            _ => Err(BancaError::Validation(format!("Unknown outcome kind: {s}"))),
        }
    }
}

/// One recorded wager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub bankroll_id: String,
    pub amount_staked: Decimal,
    pub amount_returned: Decimal,
    pub outcome: OutcomeKind,
    pub timestamp: DateTime<Utc>,
}

impl Bet {
    /// Net result of this bet (returned − staked).
    pub fn profit(&self) -> Decimal {
        self.amount_returned - self.amount_staked
    }

    pub fn is_win(&self) -> bool {
        self.amount_returned > self.amount_staked
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} apostado={} retorno={} resultado={}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.outcome,
            format_brl(self.amount_staked),
            format_brl(self.amount_returned),
            format_brl(self.profit()),
        )
    }
}

/// A validated bet waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBet {
    pub bankroll_id: String,
    pub amount_staked: Decimal,
    pub amount_returned: Decimal,
    pub outcome: OutcomeKind,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Daily goal records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Open,
    Completed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Open => "open",
            GoalStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::Open => write!(f, "Aberta"),
            GoalStatus::Completed => write!(f, "Concluída"),
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = BancaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "open" | "aberta" => Ok(GoalStatus::Open),
            "completed" | "concluida" => Ok(GoalStatus::Completed),
            _ => Err(BancaError::Validation(format!("Unknown goal status: {s}"))),
        }
    }
}

/// Archived outcome of a closed cycle for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGoalRecord {
    pub id: String,
    pub bankroll_id: String,
    pub date: NaiveDate,
    pub status: GoalStatus,
    pub final_profit: Decimal,
    pub final_bankroll: Decimal,
    #[serde(default)]
    pub closed_at: DateTime<Utc>,
}

impl DailyGoalRecord {
    /// Bankroll at the start of the day this record covers.
    pub fn starting_bankroll(&self) -> Decimal {
        self.final_bankroll - self.final_profit
    }

    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }
}

impl fmt::Display for DailyGoalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] lucro={} banca={}",
            self.date,
            self.status,
            format_brl(self.final_profit),
            format_brl(self.final_bankroll),
        )
    }
}

/// Upsert payload for a daily goal record, keyed by (bankroll_id, date).
#[derive(Debug, Clone, PartialEq)]
pub struct GoalUpsert {
    pub bankroll_id: String,
    pub date: NaiveDate,
    pub status: GoalStatus,
    pub final_profit: Decimal,
    pub final_bankroll: Decimal,
    pub closed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Snapshot of everything the dashboard knows about the signed-in user.
///
/// Operations never mutate a published snapshot; they build the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub user: User,
    pub bankroll: Bankroll,
    /// Bets of the current cycle, most recent first.
    pub bets: Vec<Bet>,
    /// Goal history, ascending by date.
    pub goals: Vec<DailyGoalRecord>,
}

impl AppState {
    pub fn new(
        user: User,
        bankroll: Bankroll,
        bets: Vec<Bet>,
        mut goals: Vec<DailyGoalRecord>,
    ) -> Self {
        goals.sort_by_key(|g| g.date);
        Self { user, bankroll, bets, goals }
    }

    /// Next snapshot with `bet` at the head of the list.
    pub fn with_bet(&self, bet: Bet) -> Self {
        let mut bets = Vec::with_capacity(self.bets.len() + 1);
        bets.push(bet);
        bets.extend(self.bets.iter().cloned());
        Self { bets, ..self.clone() }
    }

    pub fn without_bet(&self, bet_id: &str) -> Self {
        let bets = self.bets.iter().filter(|b| b.id != bet_id).cloned().collect();
        Self { bets, ..self.clone() }
    }

    pub fn with_bankroll(&self, bankroll: Bankroll) -> Self {
        Self { bankroll, ..self.clone() }
    }

    /// Next snapshot with `record` replacing any record of the same date.
    pub fn with_goal(&self, record: DailyGoalRecord) -> Self {
        let mut goals: Vec<DailyGoalRecord> = self
            .goals
            .iter()
            .filter(|g| g.date != record.date)
            .cloned()
            .collect();
        goals.push(record);
        goals.sort_by_key(|g| g.date);
        Self { goals, ..self.clone() }
    }

    /// Snapshot for a fresh cycle: new bankroll, no bets.
    pub fn rolled_over(&self, bankroll: Bankroll) -> Self {
        Self {
            bankroll,
            bets: Vec::new(),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for BANCA.
#[derive(Debug, thiserror::Error)]
pub enum BancaError {
    /// Invalid user input; nothing was changed.
    #[error("{0}")]
    Validation(String),

    #[error("Backend error ({backend}): {message}")]
    Backend { backend: String, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BancaError {
    pub fn validation(message: impl Into<String>) -> Self {
        BancaError::Validation(message.into())
    }

    pub fn backend(backend: &str, err: impl fmt::Display) -> Self {
        BancaError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BancaError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, BancaError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, 0, 0).unwrap()
    }

    fn bet(id: &str, staked: Decimal, returned: Decimal) -> Bet {
        Bet {
            id: id.to_string(),
            bankroll_id: "b1".to_string(),
            amount_staked: staked,
            amount_returned: returned,
            outcome: OutcomeKind::Loss,
            timestamp: ts(12),
        }
    }

    fn record(day: u32, profit: Decimal, final_bankroll: Decimal) -> DailyGoalRecord {
        DailyGoalRecord {
            id: format!("g{day}"),
            bankroll_id: "b1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            status: GoalStatus::Completed,
            final_profit: profit,
            final_bankroll,
            closed_at: ts(20),
        }
    }

    fn state() -> AppState {
        AppState::new(
            User { id: "u1".into(), email: "ana@example.com".into() },
            Bankroll {
                id: "b1".into(),
                owner_id: "u1".into(),
                initial_amount: dec!(100),
                daily_goal_percent: dec!(25),
                label: "Banca Principal".into(),
                cycle_started_at: ts(8),
            },
            vec![bet("x", dec!(10), dec!(0))],
            vec![record(9, dec!(5), dec!(100)), record(8, dec!(10), dec!(95))],
        )
    }

    #[test]
    fn test_bet_profit_and_win() {
        let win = bet("a", dec!(15), dec!(36));
        assert_eq!(win.profit(), dec!(21));
        assert!(win.is_win());

        let even = bet("b", dec!(10), dec!(10));
        assert_eq!(even.profit(), Decimal::ZERO);
        assert!(!even.is_win());
    }

    #[test]
    fn test_outcome_serde_snake_case() {
        let json = serde_json::to_string(&OutcomeKind::WinOnNumber).unwrap();
        assert_eq!(json, "\"win_on_number\"");
        for kind in OutcomeKind::ALL {
            let json = serde_json::to_string(kind).unwrap();
            let parsed: OutcomeKind = serde_json::from_str(&json).unwrap();
            assert_eq!(*kind, parsed);
            assert_eq!(kind.as_str().parse::<OutcomeKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_outcome_from_str_rejects_unknown() {
        let err = "jackpot".parse::<OutcomeKind>().unwrap_err();
        assert!(err.is_validation());
        assert_eq!("DERROTA".parse::<OutcomeKind>().unwrap(), OutcomeKind::Loss);
    }

    #[test]
    fn test_goal_status_parse() {
        assert_eq!("concluida".parse::<GoalStatus>().unwrap(), GoalStatus::Completed);
        assert_eq!("open".parse::<GoalStatus>().unwrap(), GoalStatus::Open);
        assert!("closed".parse::<GoalStatus>().is_err());
    }

    #[test]
    fn test_record_starting_bankroll() {
        let r = record(9, dec!(25), dec!(125));
        assert_eq!(r.starting_bankroll(), dec!(100));
    }

    #[test]
    fn test_app_state_sorts_goals() {
        let s = state();
        assert_eq!(s.goals[0].date.to_string(), "2026-03-08");
        assert_eq!(s.goals[1].date.to_string(), "2026-03-09");
    }

    #[test]
    fn test_with_bet_prepends() {
        let s = state().with_bet(bet("y", dec!(5), dec!(0)));
        assert_eq!(s.bets.len(), 2);
        assert_eq!(s.bets[0].id, "y");
        assert_eq!(s.bets[1].id, "x");
    }

    #[test]
    fn test_without_bet() {
        let s = state().without_bet("x");
        assert!(s.bets.is_empty());
    }

    #[test]
    fn test_with_goal_replaces_same_date() {
        let s = state().with_goal(record(9, dec!(7), dec!(102)));
        assert_eq!(s.goals.len(), 2);
        assert_eq!(s.goals[1].final_profit, dec!(7));

        let s = s.with_goal(record(10, dec!(1), dec!(103)));
        assert_eq!(s.goals.len(), 3);
        assert_eq!(s.goals[2].date.to_string(), "2026-03-10");
    }

    #[test]
    fn test_rolled_over_clears_bets() {
        let s = state();
        let mut next = s.bankroll.clone();
        next.initial_amount = dec!(105);
        let s = s.rolled_over(next);
        assert!(s.bets.is_empty());
        assert_eq!(s.bankroll.initial_amount, dec!(105));
        assert_eq!(s.goals.len(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = BancaError::backend("sqlite", "disk full");
        assert_eq!(err.to_string(), "Backend error (sqlite): disk full");
        assert!(!err.is_validation());
        assert_eq!(BancaError::validation("Valor inválido").to_string(), "Valor inválido");
    }
}
