//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::ledger::Ledger;
use crate::service::TicketAccrualService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ticket accrual for incoming point awards.
    pub accrual: Arc<TicketAccrualService<Ledger>>,
    /// Ledger for read endpoints.
    pub ledger: Ledger,
}
