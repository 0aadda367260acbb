//! Backfill page planning.
//!
//! Turns a count of missing records into the ordered sequence of
//! `(offset, size)` page requests used to fetch them.
//!
//! Offsets are relative to the *missing* count, not to the remote
//! collection's absolute index space. That only covers the right items when
//! the missing records are exactly the ones the remote serves first for these
//! offsets. The cache relies on this exact, deterministic sequence, so the
//! scheme is kept as-is.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

/// Default maximum number of items requested per page.
pub const DEFAULT_MAX_PAGE_SIZE: NonZeroU64 = match NonZeroU64::new(10) {
    Some(size) => size,
    None => panic!("page size must be non-zero"),
};

/// One bounded page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u64,
    pub size: u64,
}

/// Lazy iterator over the pages needed to backfill `missing` items.
#[derive(Debug, Clone)]
pub struct BackfillPlan {
    missing: i64,
    remaining: i64,
    max_page_size: i64,
}

impl BackfillPlan {
    /// A non-positive `missing` yields an empty plan.
    pub fn new(missing: i64, max_page_size: NonZeroU64) -> Self {
        let max_page_size = i64::try_from(max_page_size.get()).unwrap_or(i64::MAX);
        Self {
            missing,
            remaining: missing,
            max_page_size,
        }
    }

    pub fn missing(&self) -> i64 {
        self.missing
    }
}

impl Iterator for BackfillPlan {
    type Item = PageRequest;

    fn next(&mut self) -> Option<PageRequest> {
        if self.remaining <= 0 {
            return None;
        }

        let max = self.max_page_size;
        let offset = ((self.missing - self.remaining) / max) * max;
        let rem = self.remaining % max;
        let size = if rem == 0 || self.remaining > max {
            max
        } else {
            rem
        };

        self.remaining = self.remaining.saturating_sub(max);

        Some(PageRequest {
            offset: offset as u64,
            size: size as u64,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining <= 0 {
            return (0, Some(0));
        }
        let pages = (self.remaining - 1) / self.max_page_size + 1;
        let pages = usize::try_from(pages).unwrap_or(usize::MAX);
        (pages, Some(pages))
    }
}

/// Collect the full plan for `missing` items.
pub fn plan_backfill(missing: i64, max_page_size: NonZeroU64) -> Vec<PageRequest> {
    BackfillPlan::new(missing, max_page_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn page(offset: u64, size: u64) -> PageRequest {
        PageRequest { offset, size }
    }

    fn max(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[test]
    fn test_twenty_five_missing() {
        assert_eq!(
            plan_backfill(25, DEFAULT_MAX_PAGE_SIZE),
            vec![page(0, 10), page(10, 10), page(20, 5)]
        );
    }

    #[test]
    fn test_nothing_missing() {
        assert!(plan_backfill(0, DEFAULT_MAX_PAGE_SIZE).is_empty());
    }

    #[test]
    fn test_negative_missing_is_empty() {
        // local cache larger than the remote total
        assert!(plan_backfill(-3, DEFAULT_MAX_PAGE_SIZE).is_empty());
    }

    #[test]
    fn test_exact_multiple_uses_full_pages() {
        assert_eq!(
            plan_backfill(30, DEFAULT_MAX_PAGE_SIZE),
            vec![page(0, 10), page(10, 10), page(20, 10)]
        );
    }

    #[test]
    fn test_less_than_one_page() {
        assert_eq!(plan_backfill(7, DEFAULT_MAX_PAGE_SIZE), vec![page(0, 7)]);
    }

    #[test]
    fn test_exactly_one_page() {
        assert_eq!(plan_backfill(10, DEFAULT_MAX_PAGE_SIZE), vec![page(0, 10)]);
    }

    #[test]
    fn test_page_size_one() {
        assert_eq!(
            plan_backfill(3, max(1)),
            vec![page(0, 1), page(1, 1), page(2, 1)]
        );
    }

    #[test]
    fn test_size_hint_matches_len() {
        let plan = BackfillPlan::new(41, DEFAULT_MAX_PAGE_SIZE);
        assert_eq!(plan.size_hint(), (5, Some(5)));
        assert_eq!(plan.count(), 5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Sizes sum to the missing count and every page is within bounds.
        #[test]
        fn prop_plan_covers_missing_exactly(missing in 0i64..5_000, page_size in 1u64..64) {
            let plan = plan_backfill(missing, max(page_size));
            let total: u64 = plan.iter().map(|p| p.size).sum();
            prop_assert_eq!(total, missing as u64);
            for p in &plan {
                prop_assert!(p.size >= 1 && p.size <= page_size);
            }
        }

        /// Offsets start at zero and never decrease.
        #[test]
        fn prop_offsets_start_at_zero_and_are_monotonic(missing in 1i64..5_000, page_size in 1u64..64) {
            let plan = plan_backfill(missing, max(page_size));
            prop_assert_eq!(plan[0].offset, 0);
            for pair in plan.windows(2) {
                prop_assert!(pair[0].offset <= pair[1].offset);
            }
        }

        /// Only the last page may be short.
        #[test]
        fn prop_only_last_page_short(missing in 1i64..5_000, page_size in 1u64..64) {
            let plan = plan_backfill(missing, max(page_size));
            let (last, full) = plan.split_last().unwrap();
            prop_assert!(full.iter().all(|p| p.size == page_size));
            prop_assert!(last.size <= page_size);
        }

        #[test]
        fn prop_plan_is_deterministic(missing in -100i64..5_000, page_size in 1u64..64) {
            prop_assert_eq!(
                plan_backfill(missing, max(page_size)),
                plan_backfill(missing, max(page_size))
            );
        }
    }
}
