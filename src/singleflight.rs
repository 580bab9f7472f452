//! Keyed single-flight coordination for asynchronous operations.
//!
//! [`SingleFlight::consolidate`] guarantees that at most one execution of an operation is in
//! flight per key. Callers that arrive while an execution is pending attach to it and receive a
//! clone of the same outcome, success or failure. The pending entry is removed as soon as the
//! operation settles, so the next call after settlement starts a fresh execution; outcomes are
//! never memoized across time.
//!
//! The coordinator does not spawn anything. The shared future is driven by whichever attached
//! caller polls it, which keeps the primitive runtime agnostic. Dropping one handle leaves the
//! execution pending for the remaining callers to drive. The registry only keeps a weak handle, so
//! once every caller has dropped out the operation is dropped and its key is freed.

// std
use std::{
	collections::HashMap,
	sync::{
		Weak,
		atomic::{AtomicU64, Ordering},
	},
};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
// self
use crate::_prelude::*;

/// Handle to a (possibly shared) in-flight outcome returned by [`SingleFlight::consolidate`].
pub type Consolidated<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

type Registry<T, E> = Mutex<HashMap<String, InFlight<T, E>>>;

struct InFlight<T, E> {
	id: u64,
	outcome: WeakShared<BoxFuture<'static, Result<T, E>>>,
}

/// Collapses concurrent calls sharing a key into a single execution.
///
/// Instances are meant to be owned by whatever composes the application and injected (behind an
/// [`Arc`]) into the components that need consolidation. Several components may share one
/// coordinator as long as each picks keys from its own namespace.
pub struct SingleFlight<T, E> {
	pending: Arc<Registry<T, E>>,
	next_id: AtomicU64,
}
impl<T, E> SingleFlight<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	/// Creates an empty coordinator.
	pub fn new() -> Self {
		Self { pending: Default::default(), next_id: AtomicU64::new(0) }
	}

	/// Runs `operation` under `key` unless an execution for `key` is already in flight, in which
	/// case the caller is attached to that execution instead.
	///
	/// The key must identify everything that influences the result; the coordinator has no
	/// visibility into what `operation` captures. `operation` is invoked when the returned handle
	/// is first polled, outside the registry lock, so it may call back into the coordinator.
	pub fn consolidate<F, Fut>(&self, key: impl Into<String>, operation: F) -> Consolidated<T, E>
	where
		F: 'static + Send + FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<T, E>>,
	{
		let key = key.into();
		let mut pending = self.pending.lock();
		let joined = pending.get(&key).and_then(|in_flight| in_flight.outcome.upgrade());

		if let Some(outcome) = joined {
			#[cfg(feature = "tracing")]
			tracing::debug!(key = key.as_str(), "joining in-flight operation");

			return outcome;
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let release = Release { registry: Arc::downgrade(&self.pending), key: key.clone(), id };
		let outcome = async move {
			let result = operation().await;

			// Waiters observe the outcome only after the slot is free again.
			drop(release);

			result
		}
		.boxed()
		.shared();

		// An entry whose handles were all dropped is replaced; its `Release` sees a newer id.
		if let Some(weak) = outcome.downgrade() {
			pending.insert(key, InFlight { id, outcome: weak });
		}

		outcome
	}

	/// Returns `true` while an execution for `key` is pending.
	pub fn in_flight(&self, key: &str) -> bool {
		self.pending.lock().contains_key(key)
	}

	/// Number of keys with a pending execution.
	pub fn len(&self) -> usize {
		self.pending.lock().len()
	}

	/// Returns `true` when nothing is in flight.
	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}
}
impl<T, E> Default for SingleFlight<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<T, E> Debug for SingleFlight<T, E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SingleFlight").field("pending", &self.pending.lock().len()).finish()
	}
}

/// Frees the pending slot once the owning execution settles or is dropped with its last handle.
struct Release<T, E> {
	registry: Weak<Registry<T, E>>,
	key: String,
	id: u64,
}
impl<T, E> Drop for Release<T, E> {
	fn drop(&mut self) {
		let Some(registry) = self.registry.upgrade() else {
			return;
		};
		let removed = {
			let mut pending = registry.lock();

			match pending.get(&self.key) {
				Some(in_flight) if in_flight.id == self.id => pending.remove(&self.key),
				_ => None,
			}
		};

		// Drop the registry's handle outside the lock.
		drop(removed);
	}
}
