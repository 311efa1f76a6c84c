//! Ticket accrual: converts committed point awards into ticket grants.

use crate::domain::PointAward;
use crate::error::LotteryError;
use crate::ledger::{GrantOutcome, LedgerStore, NewTicketGrant};

/// Default number of points per ticket.
pub const DEFAULT_CONVERSION_POINTS: i64 = 100;

/// Mints tickets for point awards.
///
/// Each award mints `value / conversion_points` tickets (rounded down); an
/// award below one full unit mints nothing and touches no ledger state.
/// Grants are keyed by the award's `source_ref`, so a retried award never
/// mints twice.
#[derive(Debug, Clone)]
pub struct TicketAccrualService<S> {
    store: S,
    conversion_points: i64,
}

impl<S: LedgerStore> TicketAccrualService<S> {
    /// Creates a new accrual service.
    #[must_use]
    pub const fn new(store: S, conversion_points: i64) -> Self {
        Self {
            store,
            conversion_points,
        }
    }

    /// Number of tickets an award of `points` is worth.
    #[must_use]
    pub fn tickets_for(&self, points: i64) -> i64 {
        points.checked_div(self.conversion_points).unwrap_or(0).max(0)
    }

    /// Grants tickets for a committed point award.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::InvalidRequest`] for non-positive awards or a
    /// blank source reference, [`LotteryError::UserNotFound`] for unknown
    /// users, and [`LotteryError::Store`] if the ledger write fails. A failed
    /// write leaves the balance untouched and can be retried as-is.
    pub async fn grant_tickets_on_award(
        &self,
        award: &PointAward,
    ) -> Result<GrantOutcome, LotteryError> {
        if award.value <= 0 {
            return Err(LotteryError::InvalidRequest(format!(
                "points awarded must be positive, got {}",
                award.value
            )));
        }
        if award.source_ref.trim().is_empty() {
            return Err(LotteryError::InvalidRequest(
                "source_ref must not be empty".to_string(),
            ));
        }

        let tickets = self.tickets_for(award.value);
        if tickets == 0 {
            tracing::debug!(user_id = %award.user_id, points = award.value, "award below ticket threshold");
            return Ok(GrantOutcome::BelowThreshold);
        }

        let outcome = self
            .store
            .record_ticket_grant(NewTicketGrant {
                user_id: award.user_id,
                amount: tickets,
                source_ref: award.source_ref.clone(),
                created_at: award.created_at,
            })
            .await?;

        match outcome {
            GrantOutcome::Minted { tickets } => {
                tracing::info!(user_id = %award.user_id, source_ref = %award.source_ref, tickets, "tickets minted");
            }
            GrantOutcome::Duplicate => {
                tracing::info!(user_id = %award.user_id, source_ref = %award.source_ref, "award already converted");
            }
            GrantOutcome::BelowThreshold => {}
        }
        Ok(outcome)
    }
}
