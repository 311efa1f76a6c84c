//! Point-award trigger: converts an award into tickets.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{GrantStatus, PointAwardRequest, PointAwardResponse};
use crate::app_state::AppState;
use crate::domain::PointAward;
use crate::error::{ErrorResponse, LotteryError};

/// `POST /awards`: Mint tickets for a committed point award.
///
/// # Errors
///
/// Returns [`LotteryError`] on invalid input, unknown user or ledger failure.
#[utoipa::path(
    post,
    path = "/api/v1/awards",
    tag = "Awards",
    summary = "Convert a point award into tickets",
    description = "Called after a point award is durably committed. Mints one ticket per full conversion unit. Retries with the same `source_ref` are no-ops.",
    request_body = PointAwardRequest,
    responses(
        (status = 201, description = "Tickets minted", body = PointAwardResponse),
        (status = 200, description = "Already converted or below threshold", body = PointAwardResponse),
        (status = 400, description = "Invalid award", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn grant_tickets(
    State(state): State<AppState>,
    Json(req): Json<PointAwardRequest>,
) -> Result<impl IntoResponse, LotteryError> {
    let award = PointAward {
        user_id: req.user_id,
        value: req.points_awarded,
        source_ref: req.source_ref,
        created_at: Utc::now(),
    };
    let outcome = state.accrual.grant_tickets_on_award(&award).await?;

    let response = PointAwardResponse::new(award.user_id, outcome);
    let status = if response.status == GrantStatus::Minted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

/// Award routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/awards", post(grant_tickets))
}
