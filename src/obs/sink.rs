// self
use crate::_prelude::*;

/// Destination for token failures that are downgraded before reaching the caller.
///
/// [`TokenCache`](crate::cache::TokenCache) reports every failure here before its
/// authorization-client boundary turns it into an empty token, so the sink is the only place those
/// errors remain visible.
pub trait FailureSink
where
	Self: Send + Sync,
{
	/// Records a failure observed while obtaining a token from `issuer`.
	fn token_failure(&self, issuer: &Url, error: &Error);
}

/// Default sink that emits `tracing` error events (a no-op without the `tracing` feature).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;
impl FailureSink for TracingSink {
	fn token_failure(&self, issuer: &Url, error: &Error) {
		#[cfg(feature = "tracing")]
		tracing::error!(issuer = issuer.as_str(), error = %error, "failed to get access token");

		#[cfg(not(feature = "tracing"))]
		{
			let _ = (issuer, error);
		}
	}
}

/// Sink that keeps rendered failures in memory, for hosts that surface them elsewhere.
#[derive(Clone, Debug, Default)]
pub struct MemorySink(Arc<Mutex<Vec<String>>>);
impl MemorySink {
	/// Returns the failures recorded so far, formatted as `<issuer>: <error>`.
	pub fn entries(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	/// Drains the recorded failures.
	pub fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.0.lock())
	}
}
impl FailureSink for MemorySink {
	fn token_failure(&self, issuer: &Url, error: &Error) {
		self.0.lock().push(format!("{issuer}: {error}"));
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn memory_sink_renders_issuer_and_reason() {
		let sink = MemorySink::default();
		let issuer = Url::parse("https://example/getToken").expect("Fixture URL should parse.");

		TracingSink.token_failure(&issuer, &Error::IdentityMissing);
		sink.token_failure(&issuer, &Error::IdentityMissing);

		assert_eq!(
			sink.take(),
			vec![
				"https://example/getToken: No identity token is available for the token issuer."
					.to_string()
			]
		);
		assert!(sink.entries().is_empty());
	}
}
