//! Eligibility and weight resolution.
//!
//! A user is eligible when their ticket balance is strictly above the
//! configured threshold, they have a usable wallet, and their balance is
//! worth at least one weighted unit. Weight is `ticket_balance / weight_unit`
//! rounded down.

use std::collections::BTreeMap;

use super::UserId;
use super::models::{DrawConfiguration, TicketHolder};
use crate::error::LotteryError;
use crate::ledger::LedgerStore;

/// Default number of tickets per weighted unit.
pub const DEFAULT_WEIGHT_UNIT: i64 = 100;

/// Resolved weight for one eligible user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibleEntry {
    /// Integer lottery weight (always at least 1).
    pub weight: u32,
    /// Ticket balance observed when the weight was resolved.
    pub ticket_balance: i64,
}

/// Snapshot of eligible users and their weights for one draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleSet {
    entries: BTreeMap<UserId, EligibleEntry>,
}

impl EligibleSet {
    /// Sampler input: weight per eligible user.
    #[must_use]
    pub fn weights(&self) -> BTreeMap<UserId, u32> {
        self.entries
            .iter()
            .map(|(user, entry)| (*user, entry.weight))
            .collect()
    }

    /// Looks up one eligible user.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<&EligibleEntry> {
        self.entries.get(user_id)
    }

    /// Number of eligible users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nobody qualified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies the eligibility predicate and weight formula to ledger rows.
///
/// Holders that do not qualify are dropped; an empty result is a valid
/// outcome and closes the period with zero winners.
#[must_use]
pub fn resolve_eligible_weights(
    holders: &[TicketHolder],
    config: &DrawConfiguration,
    weight_unit: i64,
) -> EligibleSet {
    let entries = holders
        .iter()
        .filter(|h| h.ticket_balance > config.min_ticket_threshold && h.has_wallet)
        .filter_map(|h| {
            let units = h.ticket_balance.checked_div(weight_unit).unwrap_or(0);
            let weight = u32::try_from(units).ok().filter(|w| *w > 0)?;
            Some((
                h.user_id,
                EligibleEntry {
                    weight,
                    ticket_balance: h.ticket_balance,
                },
            ))
        })
        .collect();
    EligibleSet { entries }
}

/// Reads ticket holders from the ledger and resolves their weights.
#[derive(Debug, Clone)]
pub struct EligibilityResolver<S> {
    store: S,
    weight_unit: i64,
}

impl<S: LedgerStore> EligibilityResolver<S> {
    /// Creates a resolver over the given ledger.
    #[must_use]
    pub const fn new(store: S, weight_unit: i64) -> Self {
        Self { store, weight_unit }
    }

    /// Resolves the eligible weight set for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::Store`] if the ledger read fails.
    pub async fn resolve(&self, config: &DrawConfiguration) -> Result<EligibleSet, LotteryError> {
        let holders = self
            .store
            .ticket_holders(config.min_ticket_threshold)
            .await?;
        let set = resolve_eligible_weights(&holders, config, self.weight_unit);
        tracing::debug!(
            candidates = holders.len(),
            eligible = set.len(),
            "resolved eligible weights"
        );
        Ok(set)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::User;
    use crate::ledger::InMemoryLedger;

    fn config(min_ticket_threshold: i64) -> DrawConfiguration {
        DrawConfiguration {
            min_ticket_threshold,
            winners_count: 1,
            min_points: 0,
            next_deadline: Utc::now(),
        }
    }

    fn holder(ticket_balance: i64, has_wallet: bool) -> TicketHolder {
        TicketHolder {
            user_id: UserId::new(),
            ticket_balance,
            has_wallet,
        }
    }

    #[test]
    fn weight_is_floor_of_balance_over_unit() {
        let h = holder(250, true);
        let set = resolve_eligible_weights(&[h], &config(0), DEFAULT_WEIGHT_UNIT);
        let Some(entry) = set.get(&h.user_id) else {
            panic!("holder should be eligible");
        };
        assert_eq!(entry.weight, 2);
        assert_eq!(entry.ticket_balance, 250);
    }

    #[test]
    fn balances_below_one_unit_are_excluded() {
        let set = resolve_eligible_weights(&[holder(99, true)], &config(0), DEFAULT_WEIGHT_UNIT);
        assert!(set.is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        let at = holder(300, true);
        let above = holder(301, true);
        let set = resolve_eligible_weights(&[at, above], &config(300), DEFAULT_WEIGHT_UNIT);
        assert!(set.get(&at.user_id).is_none());
        assert!(set.get(&above.user_id).is_some());
    }

    #[test]
    fn users_without_wallet_are_excluded() {
        let set = resolve_eligible_weights(&[holder(5_000, false)], &config(0), DEFAULT_WEIGHT_UNIT);
        assert!(set.is_empty());
    }

    #[test]
    fn zero_weight_unit_yields_empty_set() {
        let set = resolve_eligible_weights(&[holder(5_000, true)], &config(0), 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn resolver_reads_from_ledger() {
        let ledger = InMemoryLedger::new();
        let rich = User::new(UserId::new())
            .with_tickets(700)
            .with_wallet("solana", "So1Addr");
        let walletless = User::new(UserId::new()).with_tickets(900);
        ledger.register_user(rich.clone()).await;
        ledger.register_user(walletless).await;

        let resolver = EligibilityResolver::new(ledger, DEFAULT_WEIGHT_UNIT);
        let Ok(set) = resolver.resolve(&config(0)).await else {
            panic!("resolve failed");
        };
        assert_eq!(set.len(), 1);
        assert_eq!(set.weights().get(&rich.id), Some(&7));
    }
}
