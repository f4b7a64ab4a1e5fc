//! Metrics calculator: profit, ROI, win rate and bankroll.
//!
//! All functions are pure: they take snapshots and return computed values.
//! Empty inputs give zero metrics; there is no division by zero anywhere.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::calc::cycle::CycleState;
use crate::types::{Bankroll, Bet, DailyGoalRecord};

/// Σ (returned − staked) over the bets.
pub fn cycle_profit(bets: &[Bet]) -> Decimal {
    bets.iter().map(Bet::profit).sum()
}

pub fn total_staked(bets: &[Bet]) -> Decimal {
    bets.iter().map(|b| b.amount_staked).sum()
}

/// Bets that returned more than they staked.
pub fn win_count(bets: &[Bet]) -> usize {
    bets.iter().filter(|b| b.is_win()).count()
}

pub fn current_bankroll(bankroll: &Bankroll, bets: &[Bet]) -> Decimal {
    bankroll.initial_amount + cycle_profit(bets)
}

/// Open-cycle profit plus everything archived in goal records. Callers pass
/// zero for a Closed cycle, whose profit already sits in its record.
pub fn all_time_profit(open_cycle_profit: Decimal, goals: &[DailyGoalRecord]) -> Decimal {
    open_cycle_profit + goals.iter().map(|g| g.final_profit).sum::<Decimal>()
}

/// Return on stake as a percentage.
pub fn roi(bets: &[Bet]) -> Decimal {
    let staked = total_staked(bets);
    if staked > Decimal::ZERO {
        cycle_profit(bets) / staked * dec!(100)
    } else {
        Decimal::ZERO
    }
}

/// Share of winning bets as a percentage.
pub fn win_rate(bets: &[Bet]) -> Decimal {
    if bets.is_empty() {
        Decimal::ZERO
    } else {
        Decimal::from(win_count(bets)) / Decimal::from(bets.len()) * dec!(100)
    }
}

/// All dashboard metrics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub current_bankroll: Decimal,
    pub cycle_profit: Decimal,
    pub all_time_profit: Decimal,
    pub total_staked: Decimal,
    pub roi: Decimal,
    pub win_rate: Decimal,
    pub bet_count: usize,
    pub win_count: usize,
}

impl Metrics {
    /// Compute every metric. A closed cycle's profit already lives in its
    /// goal record, so it is not added to the all-time figure again.
    pub fn compute(
        bankroll: &Bankroll,
        bets: &[Bet],
        goals: &[DailyGoalRecord],
        state: CycleState,
    ) -> Self {
        let profit = cycle_profit(bets);
        let open_profit = if state == CycleState::Closed {
            Decimal::ZERO
        } else {
            profit
        };

        Self {
            current_bankroll: bankroll.initial_amount + profit,
            cycle_profit: profit,
            all_time_profit: all_time_profit(open_profit, goals),
            total_staked: total_staked(bets),
            roi: roi(bets),
            win_rate: win_rate(bets),
            bet_count: bets.len(),
            win_count: win_count(bets),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
