//! Expiry-aware access token cache with single-flight fetches.
//!
//! [`TokenCache`] hands out the issuer-minted access token for the current identity token. A
//! cached token is reused while more than the safety margin (59 seconds by default) remains
//! before its `exp` claim; otherwise the issuer is asked again through a shared
//! [`SingleFlight`] coordinator, so any number of concurrent callers trigger one request.
//!
//! Replacing the identity token bumps an internal epoch. The epoch is part of the single-flight
//! key and is re-checked before a fetched token is stored, so a token minted for a previous
//! identity is never cached or joined by callers using the new one.

mod builder;
mod metrics;

pub use builder::TokenCacheBuilder;
pub use metrics::FetchMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret},
	clock::Clock,
	error::IssuerError,
	http::IssuerTransport,
	obs::{self, FailureSink, OperationKind, OperationOutcome, OperationSpan},
	singleflight::SingleFlight,
};

/// Coordinator type shared by token caches.
pub type TokenFlight = SingleFlight<AccessToken, Error>;

/// Callback invoked whenever the cached token changes; `None` means the token was cleared.
pub type AccessTokenListener = Arc<dyn Fn(Option<&AccessToken>) + Send + Sync>;

/// Refreshable bearer token bound to one issuer and one (replaceable) identity.
///
/// Clones share state, so a cache can be handed to several bridge handlers or tasks.
#[derive(Clone)]
pub struct TokenCache {
	issuer: Url,
	safety_margin: Duration,
	key: String,
	transport: Arc<dyn IssuerTransport>,
	coordinator: Arc<TokenFlight>,
	clock: Arc<dyn Clock>,
	failure_sink: Arc<dyn FailureSink>,
	state: Arc<RwLock<CacheState>>,
	listeners: Arc<Mutex<Vec<AccessTokenListener>>>,
	metrics: Arc<FetchMetrics>,
}
impl TokenCache {
	/// Starts configuring a cache for the given issuer URL.
	pub fn builder(issuer: Url) -> TokenCacheBuilder {
		TokenCacheBuilder::new(issuer)
	}

	/// Returns the issuer URL.
	pub fn issuer(&self) -> &Url {
		&self.issuer
	}

	/// Returns the early-refresh window.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Returns the coordinator used for fetches.
	pub fn coordinator(&self) -> &Arc<TokenFlight> {
		&self.coordinator
	}

	/// Returns the fetch counters.
	pub fn metrics(&self) -> &FetchMetrics {
		&self.metrics
	}

	/// Returns `true` if an identity token is configured.
	pub fn has_identity_token(&self) -> bool {
		self.state.read().identity.is_some()
	}

	/// Replaces the identity token (`None` signs out).
	///
	/// The cached access token is dropped unconditionally and listeners are told the token was
	/// cleared. Fetches already in flight for the previous identity still complete for their own
	/// waiters but never populate the cache.
	pub fn set_identity_token(&self, identity: Option<TokenSecret>) {
		let cleared = {
			let mut state = self.state.write();

			state.identity = identity;
			state.epoch += 1;

			state.token.take().is_some()
		};

		if cleared {
			self.notify(None);
		}
	}

	/// Snapshot of the cached token, stale or not.
	pub fn cached(&self) -> Option<AccessToken> {
		self.state.read().token.clone()
	}

	/// Returns `true` if the next lookup has to contact the issuer.
	pub fn needs_access_token(&self) -> bool {
		self.needs_access_token_at(self.clock.now())
	}

	/// Same as [`TokenCache::needs_access_token`] but evaluated at `now`.
	pub fn needs_access_token_at(&self, now: OffsetDateTime) -> bool {
		self.state
			.read()
			.token
			.as_ref()
			.is_none_or(|token| token.needs_refresh_at(now, self.safety_margin))
	}

	/// Registers a listener for token changes.
	pub fn on_access_token_changed<F>(&self, listener: F)
	where
		F: 'static + Send + Sync + Fn(Option<&AccessToken>),
	{
		self.listeners.lock().push(Arc::new(listener));
	}

	/// Returns a valid access token, fetching one if the cached token is missing or stale.
	///
	/// Errors are returned as-is; [`AuthorizationClient`](crate::client::AuthorizationClient)
	/// is the lenient variant that downgrades them to an empty token.
	pub async fn access_token(&self) -> Result<AccessToken> {
		const KIND: OperationKind = OperationKind::TokenLookup;

		let span = OperationSpan::new(KIND, "access_token", &self.issuer);

		obs::record_operation(KIND, OperationOutcome::Attempt);
		self.metrics.record_lookup();

		let result = span.instrument(self.lookup()).await;

		match &result {
			Ok(_) => obs::record_operation(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation(KIND, OperationOutcome::Failure),
		}

		result
	}

	async fn lookup(&self) -> Result<AccessToken> {
		let (identity, epoch) = {
			let state = self.state.read();

			if let Some(token) = self.fresh(&state, None) {
				return Ok(token);
			}

			(state.identity.clone().ok_or(Error::IdentityMissing)?, state.epoch)
		};
		let cache = self.clone();

		self.coordinator
			.consolidate(format!("{}#{epoch}", self.key), move || async move {
				cache.fetch_if_stale(identity, epoch).await
			})
			.await
	}

	/// Returns the cached token if it is still fresh (and, when `epoch` is given, was fetched for
	/// that identity epoch), recording the hit.
	fn fresh(&self, state: &CacheState, epoch: Option<u64>) -> Option<AccessToken> {
		if epoch.is_some_and(|epoch| epoch != state.epoch) {
			return None;
		}

		let token = state
			.token
			.as_ref()
			.filter(|token| !token.needs_refresh_at(self.clock.now(), self.safety_margin))?;

		obs::record_operation(OperationKind::TokenLookup, OperationOutcome::CacheHit);
		self.metrics.record_cache_hit();

		#[cfg(feature = "tracing")]
		tracing::debug!(expires_at = %token.expires_at, "serving cached access token");

		Some(token.clone())
	}

	/// Re-checks the cache once the fetch slot is held; a fetch that settled between the caller's
	/// lookup and this point has already stored a usable token.
	async fn fetch_if_stale(&self, identity: TokenSecret, epoch: u64) -> Result<AccessToken> {
		let fresh = self.fresh(&self.state.read(), Some(epoch));

		match fresh {
			Some(token) => Ok(token),
			None => self.fetch(identity, epoch).await,
		}
	}

	async fn fetch(&self, identity: TokenSecret, epoch: u64) -> Result<AccessToken> {
		const KIND: OperationKind = OperationKind::TokenFetch;

		let span = OperationSpan::new(KIND, "fetch", &self.issuer);

		obs::record_operation(KIND, OperationOutcome::Attempt);
		self.metrics.record_fetch();

		let result = span.instrument(self.request(&identity)).await;

		match result {
			Ok(token) => {
				obs::record_operation(KIND, OperationOutcome::Success);
				self.metrics.record_fetch_success();
				self.store(epoch, Some(token.clone()));

				Ok(token)
			},
			Err(err) => {
				obs::record_operation(KIND, OperationOutcome::Failure);
				self.metrics.record_fetch_failure();
				self.store(epoch, None);

				Err(err)
			},
		}
	}

	async fn request(&self, identity: &TokenSecret) -> Result<AccessToken> {
		let response = self.transport.get_token(&self.issuer, identity).await?;

		if !response.is_ok() {
			return Err(IssuerError::UnexpectedStatus {
				status: response.status,
				body_preview: response.body_preview(),
			}
			.into());
		}

		Ok(AccessToken::from_issuer_body(&response.body)?)
	}

	/// Replaces the cached pair if the identity has not changed since the fetch started.
	fn store(&self, epoch: u64, token: Option<AccessToken>) {
		let changed = {
			let mut state = self.state.write();

			if state.epoch != epoch || state.token == token {
				false
			} else {
				state.token = token.clone();

				true
			}
		};

		if !changed {
			return;
		}

		#[cfg(feature = "tracing")]
		{
			if let Some(token) = &token {
				tracing::info!(
					issuer = self.issuer.as_str(),
					expires_at = %token.expires_at,
					"fetched access token"
				);
			}
		}

		self.notify(token.as_ref());
	}

	fn notify(&self, token: Option<&AccessToken>) {
		let listeners = self.listeners.lock().clone();

		for listener in listeners {
			listener(token);
		}
	}

	pub(crate) fn report_failure(&self, err: &Error) {
		self.failure_sink.token_failure(&self.issuer, err);
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("TokenCache")
			.field("issuer", &self.issuer.as_str())
			.field("safety_margin", &self.safety_margin)
			.field("key", &self.key)
			.field("identity_set", &state.identity.is_some())
			.field("expires_at", &state.token.as_ref().map(|token| token.expires_at))
			.finish()
	}
}

/// Identity, its epoch, and the token fetched for it; always updated under one write lock.
#[derive(Debug)]
pub(crate) struct CacheState {
	identity: Option<TokenSecret>,
	epoch: u64,
	token: Option<AccessToken>,
}
impl CacheState {
	pub(crate) fn new(identity: Option<TokenSecret>) -> Self {
		Self { identity, epoch: 0, token: None }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::{TokenClaims, token::claims::encode_unsigned_jwt},
		clock::ManualClock,
		http::{IssuerResponse, TransportFuture},
	};

	const NOW: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	#[derive(Default)]
	struct EchoTransport {
		calls: AtomicUsize,
	}
	impl IssuerTransport for EchoTransport {
		fn get_token<'a>(
			&'a self,
			_issuer: &'a Url,
			identity: &'a TokenSecret,
		) -> TransportFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let claims = TokenClaims {
				exp: Some((NOW + Duration::hours(1)).unix_timestamp() as f64),
				sub: Some(identity.expose().to_owned()),
				..Default::default()
			};
			let body = encode_unsigned_jwt(&claims);

			Box::pin(async move { Ok(IssuerResponse { status: 200, body }) })
		}
	}

	fn cache(transport: Arc<EchoTransport>) -> TokenCache {
		TokenCache::builder(Url::parse("https://example/getToken").expect("URL should parse."))
			.identity_token("id123")
			.transport(transport)
			.clock(Arc::new(ManualClock::new(NOW)))
			.build()
			.expect("Cache should build with a custom transport.")
	}

	#[test]
	fn expiry_margin_is_applied_to_the_cached_pair() {
		let cache = cache(Default::default());

		assert!(cache.needs_access_token_at(NOW));

		cache.state.write().token = Some(AccessToken::new("a", NOW + Duration::seconds(59)));

		assert!(cache.needs_access_token_at(NOW));

		cache.state.write().token = Some(AccessToken::new("b", NOW + Duration::seconds(60)));

		assert!(!cache.needs_access_token_at(NOW));
	}

	#[tokio::test]
	async fn identity_reset_clears_and_notifies() {
		let transport = Arc::new(EchoTransport::default());
		let cache = cache(transport.clone());
		let changes = Arc::new(Mutex::new(Vec::new()));
		let sink = changes.clone();

		cache.on_access_token_changed(move |token| {
			sink.lock().push(token.map(|token| token.expose().to_owned()));
		});

		let first = cache.access_token().await.expect("First lookup should fetch a token.");

		assert!(!cache.needs_access_token());

		cache.set_identity_token(Some("id456".into()));

		assert!(cache.cached().is_none());
		assert!(cache.needs_access_token());

		let second = cache.access_token().await.expect("Second lookup should fetch again.");

		assert_ne!(first, second);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
		assert_eq!(
			*changes.lock(),
			vec![Some(first.expose().to_owned()), None, Some(second.expose().to_owned())]
		);
	}

	#[tokio::test]
	async fn token_stored_before_the_slot_is_taken_is_reused() {
		let transport = Arc::new(EchoTransport::default());
		let cache = cache(transport.clone());
		let stored = AccessToken::new("stored", NOW + Duration::hours(1));

		// A fetch finished between this caller's lookup and its consolidated run.
		cache.state.write().token = Some(stored.clone());

		let token = cache
			.fetch_if_stale("id123".into(), 0)
			.await
			.expect("Fresh token for the same epoch should be served.");

		assert_eq!(token, stored);
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
		assert_eq!(cache.metrics().cache_hits(), 1);

		cache
			.fetch_if_stale("id123".into(), 1)
			.await
			.expect("Token from another epoch should trigger a fetch.");

		assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

		cache.state.write().token = Some(AccessToken::new("stale", NOW + Duration::seconds(30)));
		cache
			.fetch_if_stale("id123".into(), 0)
			.await
			.expect("Stale token should trigger a fetch.");

		assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
		assert_eq!(cache.metrics().fetches(), 2);
	}

	#[tokio::test]
	async fn missing_identity_never_reaches_the_issuer() {
		let transport = Arc::new(EchoTransport::default());
		let cache = cache(transport.clone());

		cache.set_identity_token(None);

		assert!(matches!(cache.access_token().await, Err(Error::IdentityMissing)));
		assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
		assert_eq!(cache.metrics().lookups(), 1);
		assert_eq!(cache.metrics().fetches(), 0);
	}
}
