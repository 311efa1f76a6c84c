//! Service layer: ticket accrual and draw orchestration.
//!
//! [`TicketAccrualService`] handles per-award ticket minting and
//! [`DrawCoordinator`] runs scheduled draw cycles. Both are generic over
//! the [`crate::ledger::LedgerStore`] they write to.

pub mod accrual;
pub mod draw_coordinator;

pub use accrual::TicketAccrualService;
pub use draw_coordinator::{DrawCoordinator, DrawOutcome, DrawReport, DrawSettings};
