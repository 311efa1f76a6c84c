//! # lottery-draw-engine
//!
//! Periodic weighted lottery draw engine for a points-based learning
//! platform. Point awards mint lottery tickets; a scheduled, idempotent draw
//! samples winners weighted by tickets, then records history, winners and
//! notifications and resets ticket state for the next period in one
//! transaction.
//!
//! ## Architecture
//!
//! ```text
//! Point-award trigger (HTTP)        Scheduler (draw hourly, reset weekly)
//!     │                                  │
//!     ├── TicketAccrualService           ├── DrawCoordinator
//!     │                                  │     ├── EligibilityResolver
//!     │                                  │     └── sample_winners
//!     │                                  │
//!     └────────────── LedgerStore ───────┘
//!                 (PostgreSQL / in-memory)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod scheduler;
pub mod service;
