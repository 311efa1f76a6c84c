//! Ledger store: durable state for balances, grants and draw records.
//!
//! [`LedgerStore`] is the seam between the draw engine and storage. The
//! production backend is [`PostgresLedger`]; [`InMemoryLedger`] backs tests
//! and runs with persistence disabled. [`Ledger`] dispatches to either.

pub mod memory;
pub mod postgres;

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{
    DrawConfiguration, DrawHistory, DrawWinner, NotificationKind, TicketHolder, UserId,
};
use crate::error::LotteryError;

pub use memory::{CommitStep, InMemoryLedger};
pub use postgres::PostgresLedger;

/// A winner captured for commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WinnerEntry {
    /// Winning user.
    pub user_id: UserId,
    /// Ticket balance at resolve time.
    pub ticket_balance_at_draw: i64,
}

/// A notification to create as part of a draw commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Recipient.
    pub user_id: UserId,
    /// Category.
    pub kind: NotificationKind,
    /// Message body.
    pub message: String,
}

/// Everything a draw writes, applied as one atomic unit.
///
/// Committing inserts the history row, its winners and notifications,
/// zeroes every ticket balance and purges all ticket grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommit {
    /// Idempotency key: the UTC day being drawn.
    pub draw_date: NaiveDate,
    /// Start of the closed period.
    pub period_start: DateTime<Utc>,
    /// End of the closed period.
    pub period_end: DateTime<Utc>,
    /// Configured winner count snapshot.
    pub winners_count: i32,
    /// Configured ticket threshold snapshot.
    pub min_ticket_threshold_snapshot: i64,
    /// Selected winners.
    pub winners: Vec<WinnerEntry>,
    /// One notification per winner.
    pub notifications: Vec<NewNotification>,
}

/// Result of [`LedgerStore::commit_draw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The draw was committed.
    Committed(DrawHistory),
    /// A draw for this date already exists; nothing was written.
    AlreadyDrawn,
}

/// A ticket increment to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicketGrant {
    /// Recipient.
    pub user_id: UserId,
    /// Tickets to mint (positive).
    pub amount: i64,
    /// Source award reference.
    pub source_ref: String,
    /// Grant timestamp.
    pub created_at: DateTime<Utc>,
}

/// Result of recording a ticket grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GrantOutcome {
    /// Tickets were minted and the balance incremented.
    Minted {
        /// Tickets minted.
        tickets: i64,
    },
    /// A grant for this source reference already exists.
    Duplicate,
    /// The award was too small to mint any ticket.
    BelowThreshold,
}

/// A committed draw with its winners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawRecord {
    /// The history row.
    pub history: DrawHistory,
    /// Its winners.
    pub winners: Vec<DrawWinner>,
}

/// Storage operations used by the draw engine.
///
/// Every method is a single atomic unit: it either fully applies or leaves
/// the ledger untouched.
pub trait LedgerStore: Clone + Send + Sync + 'static {
    /// Loads the singleton draw configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] on read failure.
    fn load_draw_config(
        &self,
    ) -> impl Future<Output = Result<Option<DrawConfiguration>, LotteryError>> + Send;

    /// Returns `true` if a draw has been committed for `draw_date`.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] on read failure.
    fn draw_exists_for(
        &self,
        draw_date: NaiveDate,
    ) -> impl Future<Output = Result<bool, LotteryError>> + Send;

    /// Lists users whose ticket balance exceeds `min_ticket_threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] on read failure.
    fn ticket_holders(
        &self,
        min_ticket_threshold: i64,
    ) -> impl Future<Output = Result<Vec<TicketHolder>, LotteryError>> + Send;

    /// Applies a full draw commit in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] if any step fails; nothing is written.
    fn commit_draw(
        &self,
        commit: DrawCommit,
    ) -> impl Future<Output = Result<CommitOutcome, LotteryError>> + Send;

    /// Records a ticket grant and increments the user's ticket balance.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::UserNotFound`] for unknown users and
    /// [`LotteryError::Store`] on write failure.
    fn record_ticket_grant(
        &self,
        grant: NewTicketGrant,
    ) -> impl Future<Output = Result<GrantOutcome, LotteryError>> + Send;

    /// Zeroes every user's weekly point balance, returning rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] on write failure.
    fn reset_weekly_points(&self) -> impl Future<Output = Result<u64, LotteryError>> + Send;

    /// Loads the most recent committed draw.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] on read failure.
    fn latest_draw(&self) -> impl Future<Output = Result<Option<DrawRecord>, LotteryError>> + Send;
}

/// Runtime-selected ledger backend.
#[derive(Debug, Clone)]
pub enum Ledger {
    /// PostgreSQL via `sqlx`.
    Postgres(PostgresLedger),
    /// Process-local tables.
    Memory(InMemoryLedger),
}

impl LedgerStore for Ledger {
    async fn load_draw_config(&self) -> Result<Option<DrawConfiguration>, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.load_draw_config().await,
            Self::Memory(mem) => mem.load_draw_config().await,
        }
    }

    async fn draw_exists_for(&self, draw_date: NaiveDate) -> Result<bool, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.draw_exists_for(draw_date).await,
            Self::Memory(mem) => mem.draw_exists_for(draw_date).await,
        }
    }

    async fn ticket_holders(
        &self,
        min_ticket_threshold: i64,
    ) -> Result<Vec<TicketHolder>, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.ticket_holders(min_ticket_threshold).await,
            Self::Memory(mem) => mem.ticket_holders(min_ticket_threshold).await,
        }
    }

    async fn commit_draw(&self, commit: DrawCommit) -> Result<CommitOutcome, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.commit_draw(commit).await,
            Self::Memory(mem) => mem.commit_draw(commit).await,
        }
    }

    async fn record_ticket_grant(
        &self,
        grant: NewTicketGrant,
    ) -> Result<GrantOutcome, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.record_ticket_grant(grant).await,
            Self::Memory(mem) => mem.record_ticket_grant(grant).await,
        }
    }

    async fn reset_weekly_points(&self) -> Result<u64, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.reset_weekly_points().await,
            Self::Memory(mem) => mem.reset_weekly_points().await,
        }
    }

    async fn latest_draw(&self) -> Result<Option<DrawRecord>, LotteryError> {
        match self {
            Self::Postgres(pg) => pg.latest_draw().await,
            Self::Memory(mem) => mem.latest_draw().await,
        }
    }
}
