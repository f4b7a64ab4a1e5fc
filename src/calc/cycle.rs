//! Cycle/goal state machine.
//!
//! A cycle runs from one "new cycle" to the next. Its state is derived from
//! the snapshot, never stored:
//!
//! - `Closed`: a completed goal record was written at or after the instant the
//!   current cycle started.
//! - `GoalReached`: not closed, the target is positive and met.
//! - `Open`: everything else.
//!
//! Transitions are planned here and applied by the session, which owns the
//! backend calls.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use tracing::debug;

use super::metrics::cycle_profit;
use super::percent_of;
use crate::types::{BancaError, Bankroll, Bet, DailyGoalRecord, GoalStatus, GoalUpsert, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Open,
    GoalReached,
    Closed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Open => write!(f, "EM ANDAMENTO"),
            CycleState::GoalReached => write!(f, "META ATINGIDA"),
            CycleState::Closed => write!(f, "CICLO FECHADO"),
        }
    }
}

/// Profit needed to hit today's goal.
pub fn target_profit(bankroll: &Bankroll) -> Decimal {
    percent_of(bankroll.initial_amount, bankroll.daily_goal_percent)
}

/// The completed record that closed the current cycle, if any.
pub fn current_closure<'a>(
    bankroll: &Bankroll,
    goals: &'a [DailyGoalRecord],
) -> Option<&'a DailyGoalRecord> {
    goals
        .iter()
        .filter(|g| {
            g.bankroll_id == bankroll.id
                && g.is_completed()
                && g.closed_at >= bankroll.cycle_started_at
        })
        .max_by_key(|g| (g.date, g.closed_at))
}

pub fn evaluate(bankroll: &Bankroll, bets: &[Bet], goals: &[DailyGoalRecord]) -> CycleState {
    if current_closure(bankroll, goals).is_some() {
        return CycleState::Closed;
    }
    let target = target_profit(bankroll);
    if target > Decimal::ZERO && cycle_profit(bets) >= target {
        CycleState::GoalReached
    } else {
        CycleState::Open
    }
}

/// Progress towards the target in percent, clamped to 0..=100.
pub fn goal_progress(bankroll: &Bankroll, bets: &[Bet]) -> Decimal {
    let target = target_profit(bankroll);
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let profit = cycle_profit(bets);
    if profit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    profit
        .checked_div(target)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map_or(dec!(100), |pct| pct.min(dec!(100)))
}

/// Plan the goal record written when the cycle closes.
///
/// Re-closing a closed cycle targets that cycle's own record, so the upsert
/// overwrites instead of duplicating. If today's record belongs to an earlier
/// cycle of the same day, its profit is carried into the new figure. On a
/// re-close the carried part is whatever the record holds beyond this cycle's
/// own result, so the day still starts from the same bankroll.
pub fn plan_close(
    bankroll: &Bankroll,
    bets: &[Bet],
    goals: &[DailyGoalRecord],
    now: DateTime<Utc>,
    today: NaiveDate,
) -> GoalUpsert {
    let profit = cycle_profit(bets);

    let (date, carried) = match current_closure(bankroll, goals) {
        Some(own) => (
            own.date,
            own.final_profit - (own.final_bankroll - bankroll.initial_amount),
        ),
        None => {
            let earlier = goals
                .iter()
                .find(|g| g.bankroll_id == bankroll.id && g.date == today && g.is_completed());
            (today, earlier.map_or(Decimal::ZERO, |g| g.final_profit))
        }
    };

    debug!(%date, %profit, %carried, "Planning cycle close");

    GoalUpsert {
        bankroll_id: bankroll.id.clone(),
        date,
        status: GoalStatus::Completed,
        final_profit: carried + profit,
        final_bankroll: bankroll.initial_amount + profit,
        // A close must never sort before the cycle it closes.
        closed_at: now.max(bankroll.cycle_started_at),
    }
}

/// Plan the bankroll for a fresh cycle: it starts from the closed cycle's
/// final bankroll.
pub fn plan_new_cycle(
    bankroll: &Bankroll,
    goals: &[DailyGoalRecord],
    now: DateTime<Utc>,
) -> Result<Bankroll> {
    let closed = current_closure(bankroll, goals).ok_or_else(|| {
        BancaError::validation("Feche o ciclo atual antes de iniciar um novo.")
    })?;

    Ok(Bankroll {
        initial_amount: closed.final_bankroll,
        // Strictly after the closing record, or the cycle would read as closed.
        cycle_started_at: now.max(closed.closed_at + Duration::microseconds(1)),
        ..bankroll.clone()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
