// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use url::Host;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::{CacheState, TokenCache, TokenFlight},
	clock::{Clock, SystemClock},
	error::ConfigError,
	http::IssuerTransport,
	obs::{FailureSink, TracingSink},
};

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(0);

/// Builder for [`TokenCache`] values.
pub struct TokenCacheBuilder {
	issuer: Url,
	identity: Option<TokenSecret>,
	safety_margin: Duration,
	key: Option<String>,
	transport: Option<Arc<dyn IssuerTransport>>,
	coordinator: Option<Arc<TokenFlight>>,
	clock: Arc<dyn Clock>,
	failure_sink: Arc<dyn FailureSink>,
}
impl TokenCacheBuilder {
	/// One second under the issuer's 60-second reuse window, so a refresh always yields a new
	/// token.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(59);

	pub(crate) fn new(issuer: Url) -> Self {
		Self {
			issuer,
			identity: None,
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			key: None,
			transport: None,
			coordinator: None,
			clock: Arc::new(SystemClock),
			failure_sink: Arc::new(TracingSink),
		}
	}

	/// Seeds the identity token presented to the issuer.
	pub fn identity_token(mut self, identity: impl Into<TokenSecret>) -> Self {
		self.identity = Some(identity.into());

		self
	}

	/// Overrides the early-refresh window (defaults to 59 seconds; negative values clamp to zero).
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the single-flight key namespace.
	///
	/// Caches sharing a coordinator must use distinct keys; the default is unique per cache.
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());

		self
	}

	/// Uses a caller-provided transport instead of the default reqwest client.
	pub fn transport(mut self, transport: Arc<dyn IssuerTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Shares an existing coordinator instead of creating a private one.
	pub fn coordinator(mut self, coordinator: Arc<TokenFlight>) -> Self {
		self.coordinator = Some(coordinator);

		self
	}

	/// Overrides the time source used for expiry checks.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides where downgraded failures are reported (defaults to [`TracingSink`]).
	pub fn failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
		self.failure_sink = sink;

		self
	}

	/// Validates the configuration and produces a [`TokenCache`].
	pub fn build(self) -> Result<TokenCache, ConfigError> {
		validate_issuer(&self.issuer)?;

		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let key = self.key.unwrap_or_else(|| {
			format!(
				"TokenCache.fetch_access_token:{}:{}",
				self.issuer,
				NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)
			)
		});

		Ok(TokenCache {
			issuer: self.issuer,
			safety_margin: self.safety_margin,
			key,
			transport,
			coordinator: self.coordinator.unwrap_or_default(),
			clock: self.clock,
			failure_sink: self.failure_sink,
			state: Arc::new(RwLock::new(CacheState::new(self.identity))),
			listeners: Default::default(),
			metrics: Default::default(),
		})
	}
}
impl Debug for TokenCacheBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCacheBuilder")
			.field("issuer", &self.issuer.as_str())
			.field("identity_set", &self.identity.is_some())
			.field("safety_margin", &self.safety_margin)
			.field("key", &self.key)
			.field("transport_set", &self.transport.is_some())
			.field("coordinator_set", &self.coordinator.is_some())
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn IssuerTransport>, ConfigError> {
	Ok(Arc::new(ReqwestTransport::new()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn IssuerTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}

/// HTTPS is required, except for loopback issuers used in development.
fn validate_issuer(url: &Url) -> Result<(), ConfigError> {
	let loopback = match url.host() {
		None => return Err(ConfigError::IssuerWithoutHost { url: url.to_string() }),
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
	};

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(ConfigError::InsecureIssuer { url: url.to_string() }),
	}
}
