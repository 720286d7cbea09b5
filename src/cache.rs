//! Memoizes per-period aggregates so repeated dashboard and analytics requests
//! do not rescan a user's transactions.
//!
//! Entries are keyed by user and period and are dropped wholesale for a user
//! whenever one of their transactions changes. The cache holds at most a fixed
//! number of entries and evicts the oldest one when it is full.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{aggregation::Aggregate, period::Period, user::UserId};

/// How many aggregates the cache holds unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

type CacheKey = (UserId, Period);

#[derive(Debug, Default)]
struct CacheEntries {
    aggregates: HashMap<CacheKey, Aggregate>,
    /// Keys of `aggregates`, oldest first.
    insertion_order: VecDeque<CacheKey>,
}

/// A shared cache of aggregates keyed by user and period.
#[derive(Debug, Clone)]
pub struct AggregateCache {
    entries: Arc<Mutex<CacheEntries>>,
    capacity: usize,
}

impl Default for AggregateCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl AggregateCache {
    /// Create a cache that holds at most `capacity` aggregates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(CacheEntries::default())),
            capacity,
        }
    }

    /// Get the cached aggregate for `user_id` and `period`, if there is one.
    pub fn get(&self, user_id: &UserId, period: Period) -> Option<Aggregate> {
        self.entries()
            .aggregates
            .get(&(user_id.clone(), period))
            .cloned()
    }

    /// Get the cached aggregate for `user_id` and `period`, computing and
    /// storing it with `compute` on a miss.
    pub fn get_or_compute<F>(&self, user_id: &UserId, period: Period, compute: F) -> Aggregate
    where
        F: FnOnce() -> Aggregate,
    {
        let key = (user_id.clone(), period);
        let mut entries = self.entries();

        if let Some(aggregate) = entries.aggregates.get(&key) {
            return aggregate.clone();
        }

        let aggregate = compute();
        entries.aggregates.insert(key.clone(), aggregate.clone());
        entries.insertion_order.push_back(key);

        while entries.aggregates.len() > self.capacity {
            let Some(oldest) = entries.insertion_order.pop_front() else {
                break;
            };
            entries.aggregates.remove(&oldest);
        }

        aggregate
    }

    /// Drop every cached aggregate belonging to `user_id`.
    pub fn invalidate_user(&self, user_id: &UserId) {
        let mut entries = self.entries();
        let before = entries.aggregates.len();
        entries
            .aggregates
            .retain(|(cached_user, _), _| cached_user != user_id);
        entries
            .insertion_order
            .retain(|(cached_user, _)| cached_user != user_id);

        tracing::debug!(
            "invalidated {} cached aggregate(s) for {user_id}",
            before - entries.aggregates.len()
        );
    }

    // Entries are never left half-written, so a poisoned map is still usable.
    fn entries(&self) -> MutexGuard<'_, CacheEntries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::Month;

    use crate::{
        aggregation::Aggregate,
        cache::{AggregateCache, DEFAULT_CACHE_CAPACITY},
        period::Period,
        user::UserId,
    };

    fn aggregate_with_income(amount: rust_decimal::Decimal) -> Aggregate {
        Aggregate {
            total_income: amount,
            ..Default::default()
        }
    }

    #[test]
    fn computes_once_per_key() {
        let cache = AggregateCache::default();
        let user = UserId::new("user-1");
        let period = Period::Year(2024);

        let first = cache.get_or_compute(&user, period, || aggregate_with_income(dec!(10)));
        let second = cache.get_or_compute(&user, period, || aggregate_with_income(dec!(99)));

        assert_eq!(first, second);
        assert_eq!(second.total_income, dec!(10));
    }

    #[test]
    fn keys_are_separated_by_period() {
        let cache = AggregateCache::default();
        let user = UserId::new("user-1");
        let july = Period::Month {
            year: 2024,
            month: Month::July,
        };

        cache.get_or_compute(&user, july, || aggregate_with_income(dec!(10)));

        assert_eq!(cache.get(&user, Period::Year(2024)), None);
    }

    #[test]
    fn invalidate_only_drops_that_user() {
        let cache = AggregateCache::default();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let period = Period::Year(2024);
        cache.get_or_compute(&alice, period, || aggregate_with_income(dec!(1)));
        cache.get_or_compute(&bob, period, || aggregate_with_income(dec!(2)));

        cache.invalidate_user(&alice);

        assert_eq!(cache.get(&alice, period), None);
        assert_eq!(
            cache.get(&bob, period),
            Some(aggregate_with_income(dec!(2)))
        );
    }

    #[test]
    fn clones_share_entries() {
        let cache = AggregateCache::default();
        let clone = cache.clone();
        let user = UserId::new("user-1");

        clone.get_or_compute(&user, Period::Year(2024), Aggregate::default);

        assert_eq!(
            cache.get(&user, Period::Year(2024)),
            Some(Aggregate::default())
        );
    }

    #[test]
    fn evicts_the_oldest_entry_when_full() {
        let cache = AggregateCache::with_capacity(2);
        let user = UserId::new("user-1");
        cache.get_or_compute(&user, Period::Year(2022), || aggregate_with_income(dec!(22)));
        cache.get_or_compute(&user, Period::Year(2023), || aggregate_with_income(dec!(23)));

        cache.get_or_compute(&user, Period::Year(2024), || aggregate_with_income(dec!(24)));

        assert_eq!(cache.get(&user, Period::Year(2022)), None);
        assert_eq!(
            cache.get(&user, Period::Year(2023)),
            Some(aggregate_with_income(dec!(23)))
        );
        assert_eq!(
            cache.get(&user, Period::Year(2024)),
            Some(aggregate_with_income(dec!(24)))
        );
    }

    #[test]
    fn walking_many_periods_stays_within_capacity() {
        let cache = AggregateCache::default();
        let user = UserId::new("user-1");

        for year in 0..5000 {
            cache.get_or_compute(&user, Period::Year(year), Aggregate::default);
        }

        let entries = cache.entries();
        assert_eq!(entries.aggregates.len(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(entries.insertion_order.len(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn invalidated_keys_do_not_count_towards_capacity() {
        let cache = AggregateCache::with_capacity(2);
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        cache.get_or_compute(&alice, Period::Year(2024), || aggregate_with_income(dec!(1)));
        cache.get_or_compute(&bob, Period::Year(2024), || aggregate_with_income(dec!(2)));
        cache.invalidate_user(&alice);

        cache.get_or_compute(&alice, Period::Year(2023), || aggregate_with_income(dec!(3)));

        assert_eq!(
            cache.get(&bob, Period::Year(2024)),
            Some(aggregate_with_income(dec!(2)))
        );
        assert_eq!(
            cache.get(&alice, Period::Year(2023)),
            Some(aggregate_with_income(dec!(3)))
        );
    }
}
