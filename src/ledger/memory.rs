//! In-memory ledger backend.
//!
//! All tables live behind one [`tokio::sync::RwLock`]. A draw commit is
//! applied to a staged copy of the tables and swapped in only when every
//! step succeeds, giving the same all-or-nothing visibility as a database
//! transaction. Failure points and commit latency can be injected to
//! exercise rollback and timeout paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{
    CommitOutcome, DrawCommit, DrawRecord, GrantOutcome, LedgerStore, NewTicketGrant,
};
use crate::domain::{
    DrawConfiguration, DrawHistory, DrawWinner, Notification, TicketGrant, TicketHolder, User,
    UserId,
};
use crate::error::LotteryError;

/// Sub-step of a draw commit, used as a fault injection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    /// Inserting the history row.
    History,
    /// Inserting winner rows.
    Winners,
    /// Inserting notification rows.
    Notifications,
    /// Zeroing ticket balances.
    ResetBalances,
    /// Deleting ticket grants.
    PurgeGrants,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    grants: Vec<TicketGrant>,
    converted_awards: BTreeSet<String>,
    config: Option<DrawConfiguration>,
    history: Vec<DrawHistory>,
    winners: Vec<DrawWinner>,
    notifications: Vec<Notification>,
    next_id: i64,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    fn apply_draw(
        &mut self,
        commit: DrawCommit,
        fail_at: Option<CommitStep>,
    ) -> Result<DrawHistory, LotteryError> {
        let check = |step: CommitStep| {
            if fail_at == Some(step) {
                Err(LotteryError::Store(format!("injected failure at {step:?}")))
            } else {
                Ok(())
            }
        };

        check(CommitStep::History)?;
        let history = DrawHistory {
            id: self.allocate_id(),
            draw_date: commit.draw_date,
            period_start: commit.period_start,
            period_end: commit.period_end,
            winners_count: commit.winners_count,
            min_ticket_threshold_snapshot: commit.min_ticket_threshold_snapshot,
        };
        self.history.push(history.clone());

        check(CommitStep::Winners)?;
        self.winners
            .extend(commit.winners.iter().map(|w| DrawWinner {
                history_id: history.id,
                user_id: w.user_id,
                ticket_balance_at_draw: w.ticket_balance_at_draw,
            }));

        check(CommitStep::Notifications)?;
        for n in commit.notifications {
            let id = self.allocate_id();
            self.notifications.push(Notification {
                id,
                user_id: n.user_id,
                kind: n.kind,
                message: n.message,
                read: false,
            });
        }

        check(CommitStep::ResetBalances)?;
        for user in self.users.values_mut() {
            user.ticket_balance = 0;
        }

        check(CommitStep::PurgeGrants)?;
        self.grants.clear();

        Ok(history)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_at: Option<CommitStep>,
    commit_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    faults: Faults,
}

/// Process-local [`LedgerStore`] implementation.
///
/// Cheap to clone; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger with no draw configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    pub async fn register_user(&self, user: User) {
        self.inner.write().await.tables.users.insert(user.id, user);
    }

    /// Replaces the draw configuration.
    pub async fn set_draw_config(&self, config: DrawConfiguration) {
        self.inner.write().await.tables.config = Some(config);
    }

    /// Makes every following draw commit fail at `step` until cleared.
    pub async fn inject_commit_failure(&self, step: CommitStep) {
        self.inner.write().await.faults.fail_at = Some(step);
    }

    /// Delays every following draw commit by `delay` until cleared.
    pub async fn set_commit_delay(&self, delay: Duration) {
        self.inner.write().await.faults.commit_delay = Some(delay);
    }

    /// Removes all injected faults.
    pub async fn clear_faults(&self) {
        self.inner.write().await.faults = Faults::default();
    }

    /// Returns a user by ID.
    pub async fn user(&self, user_id: UserId) -> Option<User> {
        self.inner.read().await.tables.users.get(&user_id).cloned()
    }

    /// Returns every user.
    pub async fn users(&self) -> Vec<User> {
        self.inner.read().await.tables.users.values().cloned().collect()
    }

    /// Returns the open period's ticket grants.
    pub async fn ticket_grants(&self) -> Vec<TicketGrant> {
        self.inner.read().await.tables.grants.clone()
    }

    /// Returns all draw history rows in commit order.
    pub async fn draw_history(&self) -> Vec<DrawHistory> {
        self.inner.read().await.tables.history.clone()
    }

    /// Returns all winner rows.
    pub async fn draw_winners(&self) -> Vec<DrawWinner> {
        self.inner.read().await.tables.winners.clone()
    }

    /// Returns all notifications.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.read().await.tables.notifications.clone()
    }
}

impl LedgerStore for InMemoryLedger {
    async fn load_draw_config(&self) -> Result<Option<DrawConfiguration>, LotteryError> {
        Ok(self.inner.read().await.tables.config.clone())
    }

    async fn draw_exists_for(&self, draw_date: NaiveDate) -> Result<bool, LotteryError> {
        let inner = self.inner.read().await;
        Ok(inner.tables.history.iter().any(|h| h.draw_date == draw_date))
    }

    async fn ticket_holders(
        &self,
        min_ticket_threshold: i64,
    ) -> Result<Vec<TicketHolder>, LotteryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tables
            .users
            .values()
            .filter(|u| u.ticket_balance > min_ticket_threshold)
            .map(TicketHolder::from)
            .collect())
    }

    async fn commit_draw(&self, commit: DrawCommit) -> Result<CommitOutcome, LotteryError> {
        let delay = self.inner.read().await.faults.commit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.write().await;
        if inner
            .tables
            .history
            .iter()
            .any(|h| h.draw_date == commit.draw_date)
        {
            return Ok(CommitOutcome::AlreadyDrawn);
        }

        let mut staged = inner.tables.clone();
        let history = staged.apply_draw(commit, inner.faults.fail_at)?;
        inner.tables = staged;
        Ok(CommitOutcome::Committed(history))
    }

    async fn record_ticket_grant(
        &self,
        grant: NewTicketGrant,
    ) -> Result<GrantOutcome, LotteryError> {
        let mut inner = self.inner.write().await;
        let tables = &mut inner.tables;
        if !tables.users.contains_key(&grant.user_id) {
            return Err(LotteryError::UserNotFound(grant.user_id));
        }
        if !tables.converted_awards.insert(grant.source_ref.clone()) {
            return Ok(GrantOutcome::Duplicate);
        }

        let id = tables.allocate_id();
        if let Some(user) = tables.users.get_mut(&grant.user_id) {
            user.ticket_balance = user.ticket_balance.saturating_add(grant.amount);
        }
        tables.grants.push(TicketGrant {
            id,
            user_id: grant.user_id,
            amount: grant.amount,
            source_ref: grant.source_ref,
            created_at: grant.created_at,
        });
        Ok(GrantOutcome::Minted {
            tickets: grant.amount,
        })
    }

    async fn reset_weekly_points(&self) -> Result<u64, LotteryError> {
        let mut inner = self.inner.write().await;
        let mut changed = 0u64;
        for user in inner.tables.users.values_mut() {
            if user.weekly_point_balance != 0 {
                user.weekly_point_balance = 0;
                changed = changed.saturating_add(1);
            }
        }
        Ok(changed)
    }

    async fn latest_draw(&self) -> Result<Option<DrawRecord>, LotteryError> {
        let inner = self.inner.read().await;
        let Some(history) = inner
            .tables
            .history
            .iter()
            .max_by_key(|h| (h.period_end, h.id))
            .cloned()
        else {
            return Ok(None);
        };
        let winners = inner
            .tables
            .winners
            .iter()
            .filter(|w| w.history_id == history.id)
            .cloned()
            .collect();
        Ok(Some(DrawRecord { history, winners }))
    }
}
