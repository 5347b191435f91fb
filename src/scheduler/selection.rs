//! Weighted least-recently-used banner selection
//!
//! Entries are ranked by `last_used_at` ascending (ties keep catalog order).
//! Rank `i` of `N` gets weight `N - i`, so the stalest banner has weight `N`
//! and the freshest weight `1`. A uniform draw in `[0, N(N+1)/2)` walks the
//! ranking until the cumulative weight exceeds the draw.
//!
//! Every banner keeps a non-zero chance each cycle, while stale banners are
//! favored. Selection never mutates the catalog.

use rand::Rng;

use super::error::{SchedulerError, SchedulerResult};
use crate::catalog::{BannerEntry, Catalog};

/// A catalog entry with its lottery weight
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedBanner<'a> {
    pub entry: &'a BannerEntry,
    /// Lottery weight, `N` for the stalest banner down to `1`
    pub weight: u64,
}

impl WeightedBanner<'_> {
    /// Probability of this banner being drawn
    pub fn probability(&self, total_weight: u64) -> f64 {
        if total_weight == 0 {
            return 0.0;
        }
        self.weight as f64 / total_weight as f64
    }
}

/// Sum of weights for a catalog of `n` entries
pub fn total_weight(n: usize) -> u64 {
    let n = n as u64;
    n * (n + 1) / 2
}

/// Rank the catalog least-recently-used first and attach lottery weights
pub fn weighted_order(catalog: &Catalog) -> Vec<WeightedBanner<'_>> {
    let mut ranked: Vec<&BannerEntry> = catalog.iter().collect();
    // Stable sort keeps catalog order among equal timestamps
    ranked.sort_by_key(|e| e.last_used_at);

    let n = ranked.len() as u64;
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, entry)| WeightedBanner {
            entry,
            weight: n - i as u64,
        })
        .collect()
}

/// Pick the banner for a given draw in `[0, total_weight)`
///
/// Deterministic counterpart of [`select_next`], used directly by tests.
/// Draws outside the range fall back to the least-recently-used banner.
pub fn select_with_draw(catalog: &Catalog, draw: f64) -> SchedulerResult<&BannerEntry> {
    let ranked = weighted_order(catalog);
    let first = ranked.first().ok_or(SchedulerError::EmptyCatalog)?.entry;

    let mut cumulative = 0.0;
    for banner in &ranked {
        cumulative += banner.weight as f64;
        if cumulative > draw {
            return Ok(banner.entry);
        }
    }

    tracing::warn!(draw, "Draw outside lottery range, using least recently used banner");
    Ok(first)
}

/// Pick the next banner to publish
pub fn select_next<'a, R: Rng>(
    catalog: &'a Catalog,
    rng: &mut R,
) -> SchedulerResult<&'a BannerEntry> {
    if catalog.is_empty() {
        return Err(SchedulerError::EmptyCatalog);
    }

    let total = total_weight(catalog.len()) as f64;
    let draw = rng.gen_range(0.0..total);
    let selected = select_with_draw(catalog, draw)?;

    tracing::debug!(
        identity = %selected.identity,
        draw,
        total_weight = total,
        "Banner selected"
    );
    Ok(selected)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn catalog(entries: &[(&str, i64)]) -> Catalog {
        Catalog::from_entries(
            entries
                .iter()
                .map(|(id, ts)| BannerEntry::with_last_used(*id, *ts))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_total_weight() {
        assert_eq!(total_weight(0), 0);
        assert_eq!(total_weight(1), 1);
        assert_eq!(total_weight(3), 6);
        assert_eq!(total_weight(10), 55);
    }

    #[test]
    fn test_weighted_order() {
        let cat = catalog(&[("A", 100), ("B", 200), ("C", 0)]);
        let order = weighted_order(&cat);

        let ids: Vec<_> = order.iter().map(|w| w.entry.identity.as_str()).collect();
        let weights: Vec<_> = order.iter().map(|w| w.weight).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(weights, vec![3, 2, 1]);
    }

    #[test]
    fn test_weighted_order_ties_keep_catalog_order() {
        let cat = catalog(&[("X", 0), ("Y", 0), ("Z", 0)]);
        let ids: Vec<_> = weighted_order(&cat)
            .iter()
            .map(|w| w.entry.identity.clone())
            .collect();
        assert_eq!(ids, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_select_with_draw() {
        let cat = catalog(&[("A", 100), ("B", 200), ("C", 0)]);

        assert_eq!(select_with_draw(&cat, 0.0).unwrap().identity, "C");
        assert_eq!(select_with_draw(&cat, 2.5).unwrap().identity, "C");
        assert_eq!(select_with_draw(&cat, 3.0).unwrap().identity, "A");
        assert_eq!(select_with_draw(&cat, 4.5).unwrap().identity, "A");
        assert_eq!(select_with_draw(&cat, 5.0).unwrap().identity, "B");
        assert_eq!(select_with_draw(&cat, 5.99).unwrap().identity, "B");
    }

    #[test]
    fn test_select_with_draw_out_of_range_falls_back() {
        let cat = catalog(&[("A", 100), ("B", 0)]);
        assert_eq!(select_with_draw(&cat, 99.0).unwrap().identity, "B");
    }

    #[test]
    fn test_select_empty_catalog() {
        let empty = Catalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(matches!(
            select_next(&empty, &mut rng),
            Err(SchedulerError::EmptyCatalog)
        ));
        assert!(matches!(
            select_with_draw(&empty, 0.0),
            Err(SchedulerError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_single_entry_always_selected() {
        let cat = catalog(&[("only", 12345)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(select_next(&cat, &mut rng).unwrap().identity, "only");
        }
    }

    #[test]
    fn test_select_next_is_reproducible_with_seed() {
        let cat = catalog(&[("A", 10), ("B", 20), ("C", 30), ("D", 0)]);

        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let picks1: Vec<_> = (0..20)
            .map(|_| select_next(&cat, &mut rng1).unwrap().identity.clone())
            .collect();
        let picks2: Vec<_> = (0..20)
            .map(|_| select_next(&cat, &mut rng2).unwrap().identity.clone())
            .collect();

        assert_eq!(picks1, picks2);
    }

    #[test]
    fn test_select_does_not_mutate() {
        let cat = catalog(&[("A", 100), ("B", 200), ("C", 0)]);
        let before = cat.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let _ = select_next(&cat, &mut rng).unwrap();
        assert_eq!(cat, before);
        assert_eq!(cat.entries()[0].identity, "A");
    }

    #[test]
    fn test_probability() {
        let cat = catalog(&[("A", 100), ("B", 200), ("C", 0)]);
        let order = weighted_order(&cat);
        let total = total_weight(cat.len());
        assert!((order[0].probability(total) - 0.5).abs() < 1e-9);
        assert!((order[2].probability(total) - 1.0 / 6.0).abs() < 1e-9);
    }
}
