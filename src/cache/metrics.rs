//! Lookup counters shared by every handle of a cache.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for cache lookups.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	joins: AtomicU64,
	fetches: AtomicU64,
	rehydrations: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Lookups answered from a valid in-memory record.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Lookups that attached to a fetch already in flight.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	/// Fetcher invocations.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Records restored from the persistent store.
	pub fn rehydrations(&self) -> u64 {
		self.rehydrations.load(Ordering::Relaxed)
	}

	/// Fetch attempts that ended in an error (counted once per flight).
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_join(&self) {
		self.joins.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rehydration(&self) {
		self.rehydrations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_start_at_zero_and_count_independently() {
		let metrics = CacheMetrics::default();

		metrics.record_hit();
		metrics.record_hit();
		metrics.record_join();
		metrics.record_fetch();
		metrics.record_failure();

		assert_eq!(
			(metrics.hits(), metrics.joins(), metrics.fetches(), metrics.rehydrations(), metrics.failures()),
			(2, 1, 1, 0, 1)
		);
	}
}
