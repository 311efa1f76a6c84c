//! Draw history read endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::DrawResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LotteryError};
use crate::ledger::LedgerStore;

/// `GET /draws/latest`: Most recent committed draw.
///
/// # Errors
///
/// Returns [`LotteryError::DrawNotFound`] before the first draw.
#[utoipa::path(
    get,
    path = "/api/v1/draws/latest",
    tag = "Draws",
    summary = "Latest committed draw",
    description = "Returns the most recent draw with its period, parameter snapshot and winners.",
    responses(
        (status = 200, description = "Latest draw", body = DrawResponse),
        (status = 404, description = "No draw committed yet", body = ErrorResponse),
    )
)]
pub async fn latest_draw(State(state): State<AppState>) -> Result<impl IntoResponse, LotteryError> {
    let record = state
        .ledger
        .latest_draw()
        .await?
        .ok_or(LotteryError::DrawNotFound)?;
    Ok(Json(DrawResponse::from(record)))
}

/// Draw routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/draws/latest", get(latest_draw))
}
