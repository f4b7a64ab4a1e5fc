//! Shared fixtures: a manual clock and bet inputs with known profit.

use std::sync::Arc;

use banca::backend::Persistence;
use banca::calc::bets::BetInput;
use banca::clock::ManualClock;
use banca::config::BankrollDefaults;
use banca::engine::{snapshot_feed, Session};
use banca::types::{OutcomeKind, User};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

pub fn user() -> User {
    User {
        id: "user-ana".into(),
        email: "ana@example.com".into(),
    }
}

/// One chip on one number that hits: profit 35 per chip.
pub fn hit(chip: Decimal) -> BetInput {
    BetInput {
        outcome: OutcomeKind::WinOnNumber,
        chip_value: chip,
        numbers_covered: 1,
        zero_stake: Decimal::ZERO,
    }
}

/// A straight loss of `stake`.
pub fn miss(stake: Decimal) -> BetInput {
    BetInput {
        outcome: OutcomeKind::Loss,
        chip_value: stake,
        numbers_covered: 1,
        zero_stake: Decimal::ZERO,
    }
}

pub async fn open(store: Arc<dyn Persistence>, clock: Arc<ManualClock>) -> Session {
    let (feed, _rx) = snapshot_feed();
    Session::open(user(), store, clock, &BankrollDefaults::default(), feed)
        .await
        .unwrap()
}
