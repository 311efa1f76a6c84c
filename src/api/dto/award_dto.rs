//! Point-award trigger DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::ledger::GrantOutcome;

/// Request body for `POST /api/v1/awards`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PointAwardRequest {
    /// Recipient of the points.
    pub user_id: UserId,
    /// Points awarded (must be positive).
    pub points_awarded: i64,
    /// Reference to the award; retries must reuse it.
    pub source_ref: String,
}

/// Outcome label for a ticket grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Tickets were minted.
    Minted,
    /// The award was already converted earlier.
    Duplicate,
    /// The award was too small to mint a ticket.
    BelowThreshold,
}

/// Response body for `POST /api/v1/awards`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PointAwardResponse {
    /// Recipient of the points.
    pub user_id: UserId,
    /// What happened.
    pub status: GrantStatus,
    /// Tickets minted by this call.
    pub tickets_minted: i64,
}

impl PointAwardResponse {
    /// Builds the response for a grant outcome.
    #[must_use]
    pub const fn new(user_id: UserId, outcome: GrantOutcome) -> Self {
        let (status, tickets_minted) = match outcome {
            GrantOutcome::Minted { tickets } => (GrantStatus::Minted, tickets),
            GrantOutcome::Duplicate => (GrantStatus::Duplicate, 0),
            GrantOutcome::BelowThreshold => (GrantStatus::BelowThreshold, 0),
        };
        Self {
            user_id,
            status,
            tickets_minted,
        }
    }
}
