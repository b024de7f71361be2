// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::CacheEvent;

/// Thread-safe counters for token cache activity.
#[derive(Debug, Default)]
pub struct CacheStats {
	hits: AtomicU64,
	misses: AtomicU64,
	loads: AtomicU64,
	load_failures: AtomicU64,
	evictions: AtomicU64,
}
impl CacheStats {
	/// Lookups served from a live entry.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Lookups that found no live entry (including callers that joined a flight).
	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}

	/// Remote fetches started.
	pub fn loads(&self) -> u64 {
		self.loads.load(Ordering::Relaxed)
	}

	/// Remote fetches that failed.
	pub fn load_failures(&self) -> u64 {
		self.load_failures.load(Ordering::Relaxed)
	}

	/// Live entries evicted by the capacity bound.
	pub fn evictions(&self) -> u64 {
		self.evictions.load(Ordering::Relaxed)
	}

	/// Fraction of lookups served from the cache, or `None` before the first lookup.
	pub fn hit_rate(&self) -> Option<f64> {
		let hits = self.hits();
		let total = hits + self.misses();

		(total > 0).then(|| hits as f64 / total as f64)
	}

	pub(crate) fn record(&self, event: CacheEvent) {
		let counter = match event {
			CacheEvent::Hit => &self.hits,
			CacheEvent::Miss => &self.misses,
			CacheEvent::Load => &self.loads,
			CacheEvent::LoadFailure => &self.load_failures,
			CacheEvent::Eviction => &self.evictions,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}
