//! Domain layer: identifiers, ledger entities, eligibility and sampling.
//!
//! Everything in here except [`EligibilityResolver`] is pure: no I/O and no
//! clock reads, so draws can be reproduced from a seed.

pub mod eligibility;
pub mod models;
pub mod sampler;
pub mod user_id;

pub use eligibility::{EligibilityResolver, EligibleEntry, EligibleSet, resolve_eligible_weights};
pub use models::{
    DrawConfiguration, DrawHistory, DrawWinner, Notification, NotificationKind, PointAward,
    TicketGrant, TicketHolder, User, WalletAddress,
};
pub use sampler::sample_winners;
pub use user_id::UserId;
