//! Weighted sampling without replacement over eligible users.
//!
//! Conceptually every user holds `weight` entries in one shuffled list and
//! ranks by their earliest entry. That earliest position is the minimum of
//! `weight` uniform draws, which is exponentially distributed with rate
//! `weight`, so each user draws a single key `-ln(u) / weight` instead of
//! materialising the entries. The `winners_count` smallest keys win, and the
//! winner list is shuffled once more so its order carries no rank
//! information.
//!
//! Memory is linear in the number of users regardless of weight. Selection
//! probability grows with weight but is not exactly proportional to it when
//! more than one winner is drawn.

use std::collections::BTreeMap;

use rand::Rng;
use rand::distributions::{Distribution, Open01};
use rand::seq::SliceRandom;

use super::UserId;

/// Draws up to `winners_count` distinct users from `weights`.
///
/// Users with weight zero never appear in the result. The result length is
/// `min(winners_count, users with non-zero weight)`. Given the same weights
/// and an identically seeded `rng`, the result is identical.
pub fn sample_winners<R: Rng + ?Sized>(
    weights: &BTreeMap<UserId, u32>,
    winners_count: usize,
    rng: &mut R,
) -> Vec<UserId> {
    let mut ranked: Vec<(f64, UserId)> = weights
        .iter()
        .filter(|(_, weight)| **weight > 0)
        .map(|(user, weight)| {
            let u: f64 = Open01.sample(rng);
            (-u.ln() / f64::from(*weight), *user)
        })
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut winners: Vec<UserId> = ranked
        .into_iter()
        .take(winners_count)
        .map(|(_, user)| user)
        .collect();
    winners.shuffle(rng);
    winners
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn users(n: u128) -> Vec<UserId> {
        (1..=n).map(|i| UserId::from_uuid(uuid::Uuid::from_u128(i))).collect()
    }

    #[test]
    fn never_returns_duplicates_or_strangers() {
        let ids = users(6);
        let weights: BTreeMap<UserId, u32> =
            ids.iter().zip([5, 1, 3, 8, 2, 1]).map(|(u, w)| (*u, w)).collect();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let winners = sample_winners(&weights, 4, &mut rng);
            let unique: HashSet<_> = winners.iter().collect();
            assert_eq!(unique.len(), winners.len());
            assert!(winners.iter().all(|w| weights.contains_key(w)));
        }
    }

    #[test]
    fn winner_count_is_bounded_by_positive_weights() {
        let ids = users(4);
        let weights: BTreeMap<UserId, u32> =
            ids.iter().zip([2, 0, 7, 1]).map(|(u, w)| (*u, w)).collect();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(sample_winners(&weights, 2, &mut rng).len(), 2);
        assert_eq!(sample_winners(&weights, 3, &mut rng).len(), 3);
        assert_eq!(sample_winners(&weights, 10, &mut rng).len(), 3);
        assert!(sample_winners(&weights, 0, &mut rng).is_empty());
    }

    #[test]
    fn empty_weights_yield_no_winners() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_winners(&BTreeMap::new(), 5, &mut rng).is_empty());
    }

    #[test]
    fn zero_weight_user_is_never_selected() {
        let ids = users(3);
        let (a, b, c) = match ids.as_slice() {
            [a, b, c] => (*a, *b, *c),
            _ => return,
        };
        let weights = BTreeMap::from([(a, 3), (b, 1), (c, 0)]);

        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let winners = sample_winners(&weights, 2, &mut rng);
            assert_eq!(winners.len(), 2);
            assert!(!winners.contains(&c));
            assert!(winners.contains(&a) && winners.contains(&b));
        }
    }

    #[test]
    fn heavier_user_wins_more_often() {
        let ids = users(2);
        let (heavy, light) = match ids.as_slice() {
            [h, l] => (*h, *l),
            _ => return,
        };
        let weights = BTreeMap::from([(heavy, 10), (light, 1)]);

        let mut heavy_wins = 0u32;
        let mut light_wins = 0u32;
        for seed in 0..2_000 {
            let mut rng = StdRng::seed_from_u64(seed);
            match sample_winners(&weights, 1, &mut rng).first() {
                Some(w) if *w == heavy => heavy_wins += 1,
                Some(_) => light_wins += 1,
                None => {}
            }
        }
        assert_eq!(heavy_wins + light_wins, 2_000);
        assert!(heavy_wins > light_wins * 3, "heavy={heavy_wins} light={light_wins}");
    }

    #[test]
    fn same_seed_gives_same_winners() {
        let ids = users(20);
        let weights: BTreeMap<UserId, u32> = ids
            .iter()
            .enumerate()
            .map(|(i, u)| (*u, u32::try_from(i % 5 + 1).unwrap_or(1)))
            .collect();

        let first = sample_winners(&weights, 5, &mut StdRng::seed_from_u64(42));
        let second = sample_winners(&weights, 5, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn huge_weights_are_sampled_without_expansion() {
        let ids = users(3);
        let (whale, minnow, other) = match ids.as_slice() {
            [a, b, c] => (*a, *b, *c),
            _ => return,
        };
        let weights = BTreeMap::from([(whale, u32::MAX), (minnow, 1), (other, u32::MAX - 1)]);
        let mut rng = StdRng::seed_from_u64(1);

        let single = sample_winners(&weights, 1, &mut rng);
        assert_eq!(single.len(), 1);
        assert_ne!(single.first(), Some(&minnow));

        let all = sample_winners(&weights, 3, &mut rng);
        assert_eq!(all.len(), 3);
        assert!(all.contains(&whale) && all.contains(&minnow) && all.contains(&other));
    }
}
