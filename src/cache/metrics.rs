// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how a [`TokenCache`](crate::cache::TokenCache) serves callers.
#[derive(Debug, Default)]
pub struct FetchMetrics {
	lookups: AtomicU64,
	cache_hits: AtomicU64,
	fetches: AtomicU64,
	fetch_successes: AtomicU64,
	fetch_failures: AtomicU64,
}
impl FetchMetrics {
	/// Total number of token lookups.
	pub fn lookups(&self) -> u64 {
		self.lookups.load(Ordering::Relaxed)
	}

	/// Lookups answered from the cached token without touching the issuer.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Physical issuer fetches started (joined callers are not counted).
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Fetches that produced a usable token.
	pub fn fetch_successes(&self) -> u64 {
		self.fetch_successes.load(Ordering::Relaxed)
	}

	/// Fetches that failed (transport, status, or malformed token).
	pub fn fetch_failures(&self) -> u64 {
		self.fetch_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_lookup(&self) {
		self.lookups.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch_success(&self) {
		self.fetch_successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch_failure(&self) {
		self.fetch_failures.fetch_add(1, Ordering::Relaxed);
	}
}
