//! Observability helpers for token operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `tokenflight.fetch` with the `operation` and
//!   `stage` fields, and to route fetch failures through [`TracingSink`].
//! - Enable `metrics` to increment the `tokenflight_operation_total` counter for every
//!   attempt/success/failure/cache hit, labeled by `operation` + `outcome`.

mod metrics;
mod sink;
mod tracing;

pub use metrics::*;
pub use sink::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Caller-facing token lookup (cache hit or fetch).
	TokenLookup,
	/// Network fetch against the issuer.
	TokenFetch,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::TokenLookup => "token_lookup",
			OperationKind::TokenFetch => "token_fetch",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to the operation.
	Attempt,
	/// Answered from the cached token without I/O.
	CacheHit,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::CacheHit => "cache_hit",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
