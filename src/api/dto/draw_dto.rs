//! Draw history DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::ledger::DrawRecord;

/// One winner in a draw response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawWinnerDto {
    /// Winning user.
    pub user_id: UserId,
    /// Tickets held at draw time.
    pub ticket_balance_at_draw: i64,
}

/// Response body for `GET /api/v1/draws/latest`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawResponse {
    /// Draw history ID.
    pub id: i64,
    /// UTC day the draw closed.
    pub draw_date: NaiveDate,
    /// Start of the closed period.
    pub period_start: DateTime<Utc>,
    /// End of the closed period.
    pub period_end: DateTime<Utc>,
    /// Configured winner count at draw time.
    pub winners_count: i32,
    /// Configured ticket threshold at draw time.
    pub min_ticket_threshold: i64,
    /// Selected winners.
    pub winners: Vec<DrawWinnerDto>,
}

impl From<DrawRecord> for DrawResponse {
    fn from(record: DrawRecord) -> Self {
        let DrawRecord { history, winners } = record;
        Self {
            id: history.id,
            draw_date: history.draw_date,
            period_start: history.period_start,
            period_end: history.period_end,
            winners_count: history.winners_count,
            min_ticket_threshold: history.min_ticket_threshold_snapshot,
            winners: winners
                .into_iter()
                .map(|w| DrawWinnerDto {
                    user_id: w.user_id,
                    ticket_balance_at_draw: w.ticket_balance_at_draw,
                })
                .collect(),
        }
    }
}
