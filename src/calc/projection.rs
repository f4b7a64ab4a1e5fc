//! Projection engine — historical ledger plus a forward growth schedule.
//!
//! The ledger replays closed days in date order. The schedule assumes the
//! daily goal is hit every day and compounds it for a fixed horizon; it is
//! recomputed from the snapshot on demand and never stored.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::percent_of;
use crate::types::{Bankroll, DailyGoalRecord, GoalStatus};

/// Number of future days in every projection.
pub const PROJECTION_DAYS: usize = 15;

/// One closed day of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub starting_bankroll: Decimal,
    pub final_profit: Decimal,
    pub final_bankroll: Decimal,
    pub status: GoalStatus,
}

/// One projected future day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRow {
    /// 1-based offset from the last known day.
    pub day: usize,
    pub date: NaiveDate,
    pub starting_bankroll: Decimal,
    pub target_profit: Decimal,
    pub projected_bankroll: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub history: Vec<HistoryRow>,
    /// Bankroll after history and the open cycle.
    pub current_bankroll: Decimal,
    daily_goal_percent: Decimal,
    last_date: NaiveDate,
}

impl Projection {
    /// Build the ledger from goal records (sorted here by date) and the
    /// open cycle's profit.
    pub fn new(
        bankroll: &Bankroll,
        goals: &[DailyGoalRecord],
        open_cycle_profit: Decimal,
        today: NaiveDate,
    ) -> Self {
        let mut ordered: Vec<&DailyGoalRecord> = goals.iter().collect();
        ordered.sort_by_key(|g| g.date);

        let mut running = ordered
            .first()
            .map_or(bankroll.initial_amount, |g| g.starting_bankroll());

        let history = ordered
            .iter()
            .map(|g| {
                let row = HistoryRow {
                    date: g.date,
                    starting_bankroll: running,
                    final_profit: g.final_profit,
                    final_bankroll: g.final_bankroll,
                    status: g.status,
                };
                running = g.final_bankroll;
                row
            })
            .collect();

        Self {
            history,
            current_bankroll: running + open_cycle_profit,
            daily_goal_percent: bankroll.daily_goal_percent,
            last_date: ordered.last().map_or(today, |g| g.date),
        }
    }

    /// A fresh iterator over the future schedule.
    pub fn rows(&self) -> ProjectionRows {
        ProjectionRows {
            day: 0,
            date: self.last_date,
            running: self.current_bankroll,
            daily_goal_percent: self.daily_goal_percent,
        }
    }

    /// Bankroll at the end of the horizon.
    pub fn final_projected(&self) -> Decimal {
        self.rows()
            .last()
            .map_or(self.current_bankroll, |r| r.projected_bankroll)
    }
}

/// Lazy, finite schedule of [`PROJECTION_DAYS`] rows.
#[derive(Debug, Clone)]
pub struct ProjectionRows {
    day: usize,
    date: NaiveDate,
    running: Decimal,
    daily_goal_percent: Decimal,
}

impl Iterator for ProjectionRows {
    type Item = ProjectionRow;

    fn next(&mut self) -> Option<ProjectionRow> {
        if self.day >= PROJECTION_DAYS {
            return None;
        }
        let date = self.date.checked_add_days(Days::new(1))?;
        self.day += 1;
        self.date = date;

        let target = percent_of(self.running, self.daily_goal_percent);
        let row = ProjectionRow {
            day: self.day,
            date,
            starting_bankroll: self.running,
            target_profit: target,
            projected_bankroll: self.running.saturating_add(target),
        };
        self.running = row.projected_bankroll;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = PROJECTION_DAYS - self.day;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ProjectionRows {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
