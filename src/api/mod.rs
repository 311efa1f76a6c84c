//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the HTTP surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::award::grant_tickets,
        handlers::draw::latest_draw,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::PointAwardRequest,
        dto::PointAwardResponse,
        dto::GrantStatus,
        dto::DrawResponse,
        dto::DrawWinnerDto,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Awards", description = "Point-award trigger"),
        (name = "Draws", description = "Committed draw history"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::{DrawConfiguration, User, UserId};
    use crate::ledger::{InMemoryLedger, Ledger};
    use crate::service::{DrawCoordinator, DrawSettings, TicketAccrualService};

    fn app(memory: &InMemoryLedger) -> Router {
        let ledger = Ledger::Memory(memory.clone());
        let state = AppState {
            accrual: Arc::new(TicketAccrualService::new(ledger.clone(), 100)),
            ledger,
        };
        build_router().with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("failed to read body");
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|_| panic!("body is not JSON"))
    }

    fn award_request(user_id: UserId, points: i64, source_ref: &str) -> Request<Body> {
        let body = serde_json::json!({
            "user_id": user_id,
            "points_awarded": points,
            "source_ref": source_ref,
        });
        Request::post("/api/v1/awards")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| panic!("invalid request"))
    }

    #[tokio::test]
    async fn health_reports_memory_ledger() {
        let memory = InMemoryLedger::new();
        let request = Request::get("/health")
            .body(Body::empty())
            .unwrap_or_else(|_| panic!("invalid request"));
        let Ok(response) = app(&memory).oneshot(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ledger"], "memory");
    }

    #[tokio::test]
    async fn award_mints_tickets_then_dedupes() {
        let memory = InMemoryLedger::new();
        let user = User::new(UserId::new());
        let id = user.id;
        memory.register_user(user).await;

        let Ok(first) = app(&memory).oneshot(award_request(id, 250, "quiz-9")).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let json = body_json(first).await;
        assert_eq!(json["status"], "minted");
        assert_eq!(json["tickets_minted"], 2);

        let Ok(retry) = app(&memory).oneshot(award_request(id, 250, "quiz-9")).await;
        assert_eq!(retry.status(), StatusCode::OK);
        assert_eq!(body_json(retry).await["status"], "duplicate");
    }

    #[tokio::test]
    async fn award_for_unknown_user_is_404() {
        let memory = InMemoryLedger::new();
        let Ok(response) = app(&memory)
            .oneshot(award_request(UserId::new(), 500, "quiz-1"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn latest_draw_is_404_until_a_draw_commits() {
        let memory = InMemoryLedger::new();
        let request = || {
            Request::get("/api/v1/draws/latest")
                .body(Body::empty())
                .unwrap_or_else(|_| panic!("invalid request"))
        };
        let Ok(before) = app(&memory).oneshot(request()).await;
        assert_eq!(before.status(), StatusCode::NOT_FOUND);

        let winner = User::new(UserId::new())
            .with_tickets(200)
            .with_wallet("evm", "0xwin");
        memory.register_user(winner.clone()).await;
        let now = Utc::now();
        memory
            .set_draw_config(DrawConfiguration {
                min_ticket_threshold: 0,
                winners_count: 1,
                min_points: 0,
                next_deadline: now,
            })
            .await;
        let coordinator =
            DrawCoordinator::new(memory.clone(), DrawSettings::default(), StdRng::seed_from_u64(1));
        let Ok(outcome) = coordinator.run_draw_cycle(now).await else {
            panic!("draw failed");
        };
        assert!(outcome.is_committed());

        let Ok(after) = app(&memory).oneshot(request()).await;
        assert_eq!(after.status(), StatusCode::OK);
        let json = body_json(after).await;
        assert_eq!(json["winners"][0]["user_id"], winner.id.to_string());
        assert_eq!(json["winners"][0]["ticket_balance_at_draw"], 200);
    }

    #[test]
    fn openapi_lists_every_path() {
        let doc = ApiDoc::openapi();
        for path in ["/api/v1/awards", "/api/v1/draws/latest", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
