//! View models handed to the presentation layer.
//!
//! `DashboardView::build` is the whole render input: one pure function of a
//! snapshot and the current date.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::calc::cycle::{self, CycleState};
use crate::calc::metrics::Metrics;
use crate::calc::projection::{HistoryRow, Projection, ProjectionRow};
use crate::types::{AppState, Bet, OutcomeKind};

/// Format an amount as Brazilian reais, e.g. `R$ 1.234,56`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs();
    let cents = (rounded.fract() * Decimal::ONE_HUNDRED).to_u32().unwrap_or(0);
    let units = rounded.trunc().to_string();

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}R$ {grouped},{cents:02}")
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleView {
    pub state: CycleState,
    pub label: String,
    pub target_profit: Decimal,
    pub progress_pct: Decimal,
    /// Date of the record that closed the cycle.
    pub closed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BetView {
    pub id: String,
    pub timestamp: String,
    pub outcome: OutcomeKind,
    pub outcome_label: String,
    pub amount_staked: Decimal,
    pub amount_returned: Decimal,
    pub profit: Decimal,
    pub profit_display: String,
}

impl From<&Bet> for BetView {
    fn from(bet: &Bet) -> Self {
        Self {
            id: bet.id.clone(),
            timestamp: bet.timestamp.to_rfc3339(),
            outcome: bet.outcome,
            outcome_label: bet.outcome.to_string(),
            amount_staked: bet.amount_staked,
            amount_returned: bet.amount_returned,
            profit: bet.profit(),
            profit_display: format_brl(bet.profit()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BankrollView {
    pub label: String,
    pub initial_amount: Decimal,
    pub daily_goal_percent: Decimal,
}

/// Everything the dashboard page renders.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub user_email: String,
    pub today: NaiveDate,
    pub bankroll: BankrollView,
    pub metrics: Metrics,
    pub current_bankroll_display: String,
    pub cycle: CycleView,
    pub bets: Vec<BetView>,
    pub history: Vec<HistoryRow>,
    pub projection: Vec<ProjectionRow>,
}

impl DashboardView {
    pub fn build(state: &AppState, today: NaiveDate) -> Self {
        let bankroll = &state.bankroll;
        let cycle_state = cycle::evaluate(bankroll, &state.bets, &state.goals);
        let metrics = Metrics::compute(bankroll, &state.bets, &state.goals, cycle_state);

        let open_profit = if cycle_state == CycleState::Closed {
            Decimal::ZERO
        } else {
            metrics.cycle_profit
        };
        let projection = Projection::new(bankroll, &state.goals, open_profit, today);

        Self {
            user_email: state.user.email.clone(),
            today,
            bankroll: BankrollView {
                label: bankroll.label.clone(),
                initial_amount: bankroll.initial_amount,
                daily_goal_percent: bankroll.daily_goal_percent,
            },
            current_bankroll_display: format_brl(metrics.current_bankroll),
            metrics,
            cycle: CycleView {
                state: cycle_state,
                label: cycle_state.to_string(),
                target_profit: cycle::target_profit(bankroll),
                progress_pct: cycle::goal_progress(bankroll, &state.bets),
                closed_on: cycle::current_closure(bankroll, &state.goals).map(|g| g.date),
            },
            bets: state.bets.iter().map(BetView::from).collect(),
            history: projection.history.clone(),
            projection: projection.rows().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
