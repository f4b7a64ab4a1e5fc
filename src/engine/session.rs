//! The signed-in user's session: one snapshot, one writer.
//!
//! Each operation computes the next snapshot with the pure `calc` functions,
//! performs the backend calls, and commits only after every call succeeded.
//! Committed snapshots are published on a `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::Persistence;
use crate::calc::bets::BetInput;
use crate::calc::cycle;
use crate::calc::{MAX_AMOUNT, MAX_GOAL_PERCENT};
use crate::clock::Clock;
use crate::config::BankrollDefaults;
use crate::types::{
    AppState, BancaError, Bankroll, BankrollSettings, Bet, DailyGoalRecord, NewBankroll, Result,
    User,
};
use crate::view::DashboardView;

/// Publishes every committed snapshot; `None` while nobody is signed in.
pub type SnapshotFeed = watch::Sender<Option<Arc<AppState>>>;

pub fn snapshot_feed() -> (Arc<SnapshotFeed>, watch::Receiver<Option<Arc<AppState>>>) {
    let (tx, rx) = watch::channel(None);
    (Arc::new(tx), rx)
}

pub struct Session {
    store: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
    feed: Arc<SnapshotFeed>,
    state: Arc<AppState>,
}

impl Session {
    /// Load the user's bankroll, creating it from `defaults` on first use.
    pub async fn open(
        user: User,
        store: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
        defaults: &BankrollDefaults,
        feed: Arc<SnapshotFeed>,
    ) -> Result<Self> {
        let bankroll = match store.fetch_bankroll(&user.id).await? {
            Some(existing) => existing,
            None => {
                info!(user = %user.email, "No bankroll yet, creating from defaults");
                store
                    .insert_bankroll(NewBankroll {
                        owner_id: user.id.clone(),
                        initial_amount: defaults.initial_amount,
                        daily_goal_percent: defaults.daily_goal_percent,
                        label: defaults.label.clone(),
                        cycle_started_at: clock.now(),
                    })
                    .await?
            }
        };

        let (bets, goals) = load_records(store.as_ref(), &bankroll.id).await?;
        let state = Arc::new(AppState::new(user, bankroll, bets, goals));

        info!(
            bankroll = %state.bankroll,
            bets = state.bets.len(),
            goals = state.goals.len(),
            "Session opened"
        );

        let session = Self { store, clock, feed, state };
        session.publish();
        Ok(session)
    }

    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn user(&self) -> &User {
        &self.state.user
    }

    pub fn view(&self) -> DashboardView {
        DashboardView::build(&self.state, self.clock.today())
    }

    /// Re-read bets and goals of the current bankroll from the backend.
    pub async fn reload(&mut self) -> Result<Arc<AppState>> {
        let bankroll = self
            .store
            .fetch_bankroll(&self.state.user.id)
            .await?
            .ok_or_else(|| BancaError::NotFound(format!("bankroll of {}", self.state.user.id)))?;
        let (bets, goals) = load_records(self.store.as_ref(), &bankroll.id).await?;
        Ok(self.commit(AppState::new(self.state.user.clone(), bankroll, bets, goals)))
    }

    pub async fn record_bet(&mut self, input: &BetInput) -> Result<Bet> {
        let new_bet = input.to_new_bet(&self.state.bankroll.id, self.clock.now())?;
        let bet = self.store.insert_bet(new_bet).await?;
        info!(bet = %bet, "Bet recorded");
        self.commit(self.state.with_bet(bet.clone()));
        Ok(bet)
    }

    pub async fn delete_bet(&mut self, bet_id: &str) -> Result<()> {
        if !self.state.bets.iter().any(|b| b.id == bet_id) {
            return Err(BancaError::NotFound(format!("bet {bet_id}")));
        }
        self.store.delete_bet(&self.state.bankroll.id, bet_id).await?;
        info!(bet_id, "Bet deleted");
        self.commit(self.state.without_bet(bet_id));
        Ok(())
    }

    pub async fn save_settings(&mut self, settings: BankrollSettings) -> Result<Bankroll> {
        let label = settings.label.trim();
        if label.is_empty() {
            return Err(BancaError::validation("Informe o nome da banca."));
        }
        if settings.initial_amount.is_sign_negative() {
            return Err(BancaError::validation("O valor inicial não pode ser negativo."));
        }
        if settings.daily_goal_percent.is_sign_negative() {
            return Err(BancaError::validation("A meta diária não pode ser negativa."));
        }
        if settings.initial_amount > MAX_AMOUNT {
            return Err(BancaError::validation("O valor inicial está acima do limite permitido."));
        }
        if settings.daily_goal_percent > MAX_GOAL_PERCENT {
            return Err(BancaError::validation("A meta diária não pode passar de 1000%."));
        }

        let next = Bankroll {
            label: label.to_string(),
            initial_amount: settings.initial_amount,
            daily_goal_percent: settings.daily_goal_percent,
            ..self.state.bankroll.clone()
        };
        let saved = self.store.update_bankroll(&next).await?;
        info!(bankroll = %saved, "Settings saved");
        self.commit(self.state.with_bankroll(saved.clone()));
        Ok(saved)
    }

    /// Archive the cycle's result as today's completed goal record.
    pub async fn close_cycle(&mut self) -> Result<DailyGoalRecord> {
        let state = &self.state;
        let upsert = cycle::plan_close(
            &state.bankroll,
            &state.bets,
            &state.goals,
            self.clock.now(),
            self.clock.today(),
        );
        let record = self.store.upsert_goal(upsert).await?;
        info!(record = %record, "Cycle closed");
        self.commit(self.state.with_goal(record.clone()));
        Ok(record)
    }

    /// Roll the closed cycle over: the bankroll restarts from its final value
    /// and the bet list is cleared.
    pub async fn start_new_cycle(&mut self) -> Result<Bankroll> {
        let next = cycle::plan_new_cycle(&self.state.bankroll, &self.state.goals, self.clock.now())?;
        let saved = self.store.update_bankroll(&next).await?;

        match self.store.delete_bets(&saved.id).await {
            Ok(removed) => {
                info!(initial = %saved.initial_amount, removed, "New cycle started");
                self.commit(self.state.rolled_over(saved.clone()));
                Ok(saved)
            }
            Err(e) => {
                // The bankroll row already moved on; resync so the snapshot
                // matches whatever the backend now holds.
                warn!(error = %e, "Clearing bets failed after bankroll update");
                if let Err(reload_err) = self.reload().await {
                    warn!(error = %reload_err, "Resync after failed rollover also failed");
                }
                Err(e)
            }
        }
    }

    fn commit(&mut self, next: AppState) -> Arc<AppState> {
        self.state = Arc::new(next);
        self.publish();
        self.snapshot()
    }

    fn publish(&self) {
        self.feed.send_replace(Some(self.snapshot()));
    }
}

async fn load_records(
    store: &dyn Persistence,
    bankroll_id: &str,
) -> Result<(Vec<Bet>, Vec<DailyGoalRecord>)> {
    futures::try_join!(store.list_bets(bankroll_id), store.list_goals(bankroll_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
