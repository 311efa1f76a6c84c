//! lottery-draw-engine entry point.
//!
//! Connects the ledger, starts the draw and counter-reset jobs, and serves
//! the point-award trigger and read endpoints over HTTP.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lottery_draw_engine::api;
use lottery_draw_engine::app_state::AppState;
use lottery_draw_engine::config::EngineConfig;
use lottery_draw_engine::ledger::{InMemoryLedger, Ledger, PostgresLedger};
use lottery_draw_engine::scheduler::Scheduler;
use lottery_draw_engine::service::{DrawCoordinator, TicketAccrualService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = EngineConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting lottery-draw-engine");

    // Build ledger
    let ledger = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connecting to PostgreSQL")?;
        let pg = PostgresLedger::new(pool);
        pg.migrate().await.context("running migrations")?;
        Ledger::Postgres(pg)
    } else {
        tracing::warn!("persistence disabled; ledger state is kept in memory only");
        Ledger::Memory(InMemoryLedger::new())
    };

    // Build service layer
    let rng = config
        .draw_rng_seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let coordinator = Arc::new(DrawCoordinator::new(
        ledger.clone(),
        config.draw_settings(),
        rng,
    ));
    let accrual = Arc::new(TicketAccrualService::new(
        ledger.clone(),
        config.ticket_conversion_points,
    ));

    // Start scheduled jobs
    let scheduler = Scheduler::new(config.scheduler_config());
    let jobs = scheduler.start(coordinator, ledger.clone());
    tracing::warn!(
        "draw scheduler assumes a single engine process per ledger; \
         multi-process deployments need a lock keyed on the draw date"
    );

    // Build router
    let app_state = AppState { accrual, ledger };
    let app = Router::new().merge(api::build_router());
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    jobs.shutdown().await;
    tracing::info!("lottery-draw-engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
