//! The same cycle flow against an in-memory SQLite database.

use std::sync::Arc;

use banca::backend::sqlite::SqliteStore;
use banca::calc::cycle::CycleState;
use banca::clock::ManualClock;
use rust_decimal_macros::dec;

use crate::common::{at, date, hit, miss, open};

#[tokio::test]
async fn test_sqlite_cycle_rollover() {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    session.record_bet(&hit(dec!(0.5))).await.unwrap();
    session.record_bet(&miss(dec!(2.5))).await.unwrap();
    assert_eq!(session.view().metrics.cycle_profit, dec!(15));

    clock.set(at(10, 21));
    let record = session.close_cycle().await.unwrap();
    assert_eq!(record.final_bankroll, dec!(115));

    // Re-close after another bet overwrites the same row.
    session.record_bet(&hit(dec!(1))).await.unwrap();
    session.close_cycle().await.unwrap();

    clock.set(at(11, 9));
    session.start_new_cycle().await.unwrap();

    let reopened = open(store, clock).await;
    let state = reopened.snapshot();
    assert!(state.bets.is_empty());
    assert_eq!(state.goals.len(), 1);
    assert_eq!(state.goals[0].date, date(10));
    assert_eq!(state.goals[0].final_profit, dec!(50));
    assert_eq!(state.bankroll.initial_amount, dec!(150));
    assert_eq!(reopened.view().cycle.state, CycleState::Open);
}
