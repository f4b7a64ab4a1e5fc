//! Multi-day cycle flows against the in-memory store.

use std::sync::Arc;

use banca::backend::memory::MemoryStore;
use banca::calc::cycle::CycleState;
use banca::clock::ManualClock;
use banca::types::GoalStatus;
use rust_decimal_macros::dec;

use crate::common::{at, date, hit, miss, open};

#[tokio::test]
async fn test_two_days_of_cycles() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    // Day 1: +35, close.
    session.record_bet(&hit(dec!(1))).await.unwrap();
    assert_eq!(session.view().cycle.state, CycleState::GoalReached);
    clock.set(at(10, 22));
    session.close_cycle().await.unwrap();

    // Day 2: roll over, lose 10, close.
    clock.set(at(11, 9));
    session.start_new_cycle().await.unwrap();
    assert_eq!(session.snapshot().bankroll.initial_amount, dec!(135));
    session.record_bet(&miss(dec!(10))).await.unwrap();
    assert_eq!(session.view().metrics.current_bankroll, dec!(125));
    clock.set(at(11, 22));
    session.close_cycle().await.unwrap();

    let view = session.view();
    assert_eq!(view.cycle.state, CycleState::Closed);
    assert_eq!(view.metrics.all_time_profit, dec!(25));

    assert_eq!(view.history.len(), 2);
    assert_eq!(view.history[0].date, date(10));
    assert_eq!(view.history[0].starting_bankroll, dec!(100));
    assert_eq!(view.history[1].starting_bankroll, dec!(135));
    assert_eq!(view.history[1].final_profit, dec!(-10));
    assert_eq!(view.history[1].final_bankroll, dec!(125));
    assert!(view.history.iter().all(|h| h.status == GoalStatus::Completed));

    // Projection continues from the last record.
    assert_eq!(view.projection.len(), 15);
    assert_eq!(view.projection[0].date, date(12));
    assert_eq!(view.projection[0].starting_bankroll, dec!(125));
    assert_eq!(view.projection[0].target_profit, dec!(31.25));
    assert_eq!(view.projection[0].projected_bankroll, dec!(156.25));
    assert_eq!(view.projection[14].date, date(26));
}

#[tokio::test]
async fn test_closed_cycle_stays_closed_next_day() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    session.record_bet(&hit(dec!(1))).await.unwrap();
    session.close_cycle().await.unwrap();

    // Nobody started a new cycle; the next morning it is still closed and
    // its profit counts once.
    clock.set(at(11, 8));
    let view = session.view();
    assert_eq!(view.cycle.state, CycleState::Closed);
    assert_eq!(view.cycle.closed_on, Some(date(10)));
    assert_eq!(view.metrics.all_time_profit, dec!(35));
    assert_eq!(view.projection[0].starting_bankroll, dec!(135));
    assert_eq!(view.projection[0].date, date(11));

    // Re-closing keeps the original date instead of writing a second record.
    session.record_bet(&miss(dec!(5))).await.unwrap();
    let record = session.close_cycle().await.unwrap();
    assert_eq!(record.date, date(10));
    assert_eq!(record.final_profit, dec!(30));
    let id = session.snapshot().bankroll.id.clone();
    assert_eq!(store.goal_count(&id).await, 1);
}

#[tokio::test]
async fn test_second_cycle_same_day_folds_into_record() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    session.record_bet(&hit(dec!(1))).await.unwrap();
    clock.set(at(10, 10));
    session.close_cycle().await.unwrap();

    clock.set(at(10, 11));
    session.start_new_cycle().await.unwrap();
    assert_eq!(session.view().cycle.state, CycleState::Open);

    session.record_bet(&miss(dec!(10))).await.unwrap();
    clock.set(at(10, 12));
    let record = session.close_cycle().await.unwrap();

    // One record for the day, covering both cycles.
    assert_eq!(record.date, date(10));
    assert_eq!(record.final_profit, dec!(25));
    assert_eq!(record.final_bankroll, dec!(125));
    assert_eq!(record.starting_bankroll(), dec!(100));

    let id = session.snapshot().bankroll.id.clone();
    assert_eq!(store.goal_count(&id).await, 1);
    assert_eq!(session.view().metrics.all_time_profit, dec!(25));
}

#[tokio::test]
async fn test_reclosing_folded_cycle_keeps_day_start() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    // Cycle A: +35, closed and rolled over.
    session.record_bet(&hit(dec!(1))).await.unwrap();
    clock.set(at(10, 10));
    session.close_cycle().await.unwrap();
    clock.set(at(10, 11));
    session.start_new_cycle().await.unwrap();

    // Cycle B: -10, closed, then +35 more and closed again.
    session.record_bet(&miss(dec!(10))).await.unwrap();
    clock.set(at(10, 12));
    session.close_cycle().await.unwrap();
    clock.set(at(10, 13));
    session.record_bet(&hit(dec!(1))).await.unwrap();
    clock.set(at(10, 14));
    let record = session.close_cycle().await.unwrap();

    assert_eq!(record.date, date(10));
    assert_eq!(record.final_profit, dec!(60));
    assert_eq!(record.final_bankroll, dec!(160));
    assert_eq!(record.starting_bankroll(), dec!(100));

    let id = session.snapshot().bankroll.id.clone();
    assert_eq!(store.goal_count(&id).await, 1);

    let view = session.view();
    assert_eq!(view.metrics.all_time_profit, dec!(60));
    assert_eq!(view.history[0].starting_bankroll, dec!(100));
    assert_eq!(view.projection[0].starting_bankroll, dec!(160));
}

#[tokio::test]
async fn test_deleting_bet_after_close_keeps_record() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    let bet = session.record_bet(&hit(dec!(1))).await.unwrap();
    session.close_cycle().await.unwrap();
    session.delete_bet(&bet.id).await.unwrap();

    let view = session.view();
    assert!(view.bets.is_empty());
    assert_eq!(view.history[0].final_profit, dec!(35));
    // The record still closes the cycle; only the live figure moved.
    assert_eq!(view.cycle.state, CycleState::Closed);
    assert_eq!(view.metrics.current_bankroll, dec!(100));
}

#[tokio::test]
async fn test_zero_goal_never_reached() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store, clock).await;

    session
        .save_settings(banca::types::BankrollSettings {
            label: "Sem meta".into(),
            initial_amount: dec!(100),
            daily_goal_percent: dec!(0),
        })
        .await
        .unwrap();
    session.record_bet(&hit(dec!(10))).await.unwrap();

    let view = session.view();
    assert_eq!(view.cycle.state, CycleState::Open);
    assert_eq!(view.cycle.progress_pct, dec!(0));
    assert!(view.projection.iter().all(|r| r.target_profit == dec!(0)));
}

#[tokio::test]
async fn test_reopen_reads_persisted_state() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(at(10, 9)));
    let mut session = open(store.clone(), clock.clone()).await;

    session.record_bet(&hit(dec!(1))).await.unwrap();
    clock.set(at(10, 10));
    session.record_bet(&miss(dec!(3))).await.unwrap();
    session.close_cycle().await.unwrap();

    let reopened = open(store, clock).await;
    assert_eq!(reopened.snapshot().as_ref(), session.snapshot().as_ref());
    assert_eq!(reopened.snapshot().bets[0].profit(), dec!(-3));
}
