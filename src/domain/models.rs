//! Ledger entities: users, ticket grants, draw configuration and draw records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::LotteryError;

/// A payout destination registered by a user on some chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    /// Chain identifier (e.g. `"solana"`, `"evm"`).
    pub chain: String,
    /// Address on that chain. May be empty when the user cleared it.
    pub address: String,
}

/// A platform user with the balances the draw engine reads and resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Lifetime points.
    pub point_balance: i64,
    /// Points earned in the current weekly period.
    pub weekly_point_balance: i64,
    /// Tickets accrued in the current draw period. Never negative.
    pub ticket_balance: i64,
    /// Registered wallet addresses across chains.
    pub wallets: Vec<WalletAddress>,
}

impl User {
    /// Creates a user with zero balances and no wallets.
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self {
            id,
            point_balance: 0,
            weekly_point_balance: 0,
            ticket_balance: 0,
            wallets: Vec::new(),
        }
    }

    /// Adds a wallet address.
    #[must_use]
    pub fn with_wallet(mut self, chain: &str, address: &str) -> Self {
        self.wallets.push(WalletAddress {
            chain: chain.to_string(),
            address: address.to_string(),
        });
        self
    }

    /// Sets the ticket balance.
    #[must_use]
    pub const fn with_tickets(mut self, ticket_balance: i64) -> Self {
        self.ticket_balance = ticket_balance;
        self
    }

    /// Returns `true` if at least one wallet has a non-blank address.
    #[must_use]
    pub fn has_payout_wallet(&self) -> bool {
        self.wallets.iter().any(|w| !w.address.trim().is_empty())
    }
}

/// A committed point award that may mint tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAward {
    /// Recipient of the points.
    pub user_id: UserId,
    /// Points awarded.
    pub value: i64,
    /// Reference to the originating award; doubles as the idempotency key.
    pub source_ref: String,
    /// When the award was committed.
    pub created_at: DateTime<Utc>,
}

/// A ticket increment recorded for the current period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketGrant {
    /// Row ID.
    pub id: i64,
    /// Recipient of the tickets.
    pub user_id: UserId,
    /// Tickets minted.
    pub amount: i64,
    /// Source award reference (unique).
    pub source_ref: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Operator-controlled parameters for the next draw.
///
/// Stored as a singleton row and loaded fresh for every draw cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawConfiguration {
    /// Users need strictly more tickets than this to be eligible.
    pub min_ticket_threshold: i64,
    /// How many winners to draw.
    pub winners_count: i32,
    /// Minimum points parameter exposed to operator tooling.
    pub min_points: i64,
    /// Instant whose UTC calendar day is the next draw day.
    pub next_deadline: DateTime<Utc>,
}

impl DrawConfiguration {
    /// Checks that every numeric parameter is non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), LotteryError> {
        if self.min_ticket_threshold < 0 {
            return Err(LotteryError::Configuration(format!(
                "min_ticket_threshold must be non-negative, got {}",
                self.min_ticket_threshold
            )));
        }
        if self.winners_count < 0 {
            return Err(LotteryError::Configuration(format!(
                "winners_count must be non-negative, got {}",
                self.winners_count
            )));
        }
        if self.min_points < 0 {
            return Err(LotteryError::Configuration(format!(
                "min_points must be non-negative, got {}",
                self.min_points
            )));
        }
        Ok(())
    }

    /// UTC calendar day of the configured deadline.
    #[must_use]
    pub fn deadline_date(&self) -> NaiveDate {
        self.next_deadline.date_naive()
    }

    /// Winners to draw as a `usize`. Negative values count as zero.
    #[must_use]
    pub fn winners_limit(&self) -> usize {
        usize::try_from(self.winners_count).unwrap_or(0)
    }
}

/// A completed draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawHistory {
    /// Row ID.
    pub id: i64,
    /// UTC calendar day the draw closed. Unique across history.
    pub draw_date: NaiveDate,
    /// Start of the closed period.
    pub period_start: DateTime<Utc>,
    /// End of the closed period (the draw instant).
    pub period_end: DateTime<Utc>,
    /// Configured winner count at draw time.
    pub winners_count: i32,
    /// Configured ticket threshold at draw time.
    pub min_ticket_threshold_snapshot: i64,
}

/// One selected winner of a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawWinner {
    /// Parent draw.
    pub history_id: i64,
    /// Winning user.
    pub user_id: UserId,
    /// Ticket balance the user held when weights were resolved.
    pub ticket_balance_at_draw: i64,
}

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The user won a prize draw.
    LotteryWin,
}

impl NotificationKind {
    /// Storage discriminator string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LotteryWin => "lottery_win",
        }
    }
}

/// A message queued for a user. Delivery happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Row ID.
    pub id: i64,
    /// Recipient.
    pub user_id: UserId,
    /// Category.
    pub kind: NotificationKind,
    /// Human-readable body.
    pub message: String,
    /// Whether the recipient has read it.
    pub read: bool,
}

/// Ledger projection consumed by the eligibility resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketHolder {
    /// User identifier.
    pub user_id: UserId,
    /// Current ticket balance.
    pub ticket_balance: i64,
    /// Whether the user has a non-blank wallet address on any chain.
    pub has_wallet: bool,
}

impl From<&User> for TicketHolder {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            ticket_balance: user.ticket_balance,
            has_wallet: user.has_payout_wallet(),
        }
    }
}
