//! Named query dispatch with single-flight semantics.
//!
//! A [`MessageBridge`] maps query names to asynchronous handlers, mirroring the request/response
//! channel a native shell exposes to an embedded web frontend. Identical queries (same name and
//! same JSON payload) that arrive while one is being handled share that execution and its
//! outcome. Payloads are keyed by their compact JSON rendering with object keys sorted, so equal
//! payloads share a key even when `serde_json` preserves insertion order.
//!
//! [`register_token_queries`] wires a [`TokenCache`] into a bridge under the
//! [`GET_ACCESS_TOKEN_QUERY`] and [`SET_IDENTITY_TOKEN_QUERY`] names.

// std
use std::collections::HashMap;
// crates.io
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
// self
use crate::{
	_prelude::*, auth::TokenSecret, cache::TokenCache, client::AuthorizationClient,
	singleflight::SingleFlight,
};

/// Query answered with the current access token (or `""`).
pub const GET_ACCESS_TOKEN_QUERY: &str = "getAccessToken";
/// Query that replaces the identity token; payload `{"token": string | null}`.
pub const SET_IDENTITY_TOKEN_QUERY: &str = "setIdentityToken";

/// Future returned by bridge handlers.
pub type HandlerFuture = BoxFuture<'static, Result<Value, BridgeError>>;

type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Failures reported back to the querying side.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum BridgeError {
	/// No handler is registered under the name.
	#[error("No handler is registered for query `{name}`.")]
	UnknownQuery {
		/// Query name that was dispatched.
		name: String,
	},
	/// Payload does not match what the handler expects.
	#[error("Query `{name}` received an invalid payload: {reason}.")]
	InvalidPayload {
		/// Query name that was dispatched.
		name: String,
		/// Decoder message.
		reason: String,
	},
	/// Handler ran and failed.
	#[error("Query `{name}` failed: {reason}.")]
	Handler {
		/// Query name that was dispatched.
		name: String,
		/// Handler-supplied reason.
		reason: String,
	},
}

/// Registry of named asynchronous handlers with per-query single-flight dispatch.
pub struct MessageBridge {
	handlers: RwLock<HashMap<String, Handler>>,
	flight: SingleFlight<Value, BridgeError>,
}
impl MessageBridge {
	/// Creates a bridge with no handlers.
	pub fn new() -> Self {
		Self { handlers: Default::default(), flight: SingleFlight::new() }
	}

	/// Registers `handler` under `name`, returning `true` if it replaced an existing handler.
	pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F) -> bool
	where
		F: 'static + Send + Sync + Fn(Value) -> Fut,
		Fut: 'static + Send + Future<Output = Result<Value, BridgeError>>,
	{
		let handler: Handler = Arc::new(move |payload| handler(payload).boxed());

		self.handlers.write().insert(name.into(), handler).is_some()
	}

	/// Removes the handler registered under `name`.
	pub fn unregister(&self, name: &str) -> bool {
		self.handlers.write().remove(name).is_some()
	}

	/// Returns `true` if a handler is registered under `name`.
	pub fn has_handler(&self, name: &str) -> bool {
		self.handlers.read().contains_key(name)
	}

	/// Dispatches a query, joining an identical in-flight query if there is one.
	pub async fn query(&self, name: &str, payload: Value) -> Result<Value, BridgeError> {
		let handler = self
			.handlers
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| BridgeError::UnknownQuery { name: name.to_owned() })?;
		let key = query_key(name, &payload);

		self.flight.consolidate(key, move || handler(payload)).await
	}
}
impl Default for MessageBridge {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for MessageBridge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut names = self.handlers.read().keys().cloned().collect::<Vec<_>>();

		names.sort();

		f.debug_struct("MessageBridge")
			.field("handlers", &names)
			.field("flight", &self.flight)
			.finish()
	}
}

fn query_key(name: &str, payload: &Value) -> String {
	format!("{name}:{}", sorted_keys(payload))
}

fn sorted_keys(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries = map.iter().collect::<Vec<_>>();

			entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

			Value::Object(
				entries.into_iter().map(|(key, value)| (key.clone(), sorted_keys(value))).collect(),
			)
		},
		Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
		other => other.clone(),
	}
}

#[derive(Debug, Deserialize)]
struct SetIdentityToken {
	token: Option<String>,
}

/// Registers the token queries for `cache` on `bridge`.
pub fn register_token_queries(bridge: &MessageBridge, cache: TokenCache) {
	let getter = cache.clone();

	bridge.register(GET_ACCESS_TOKEN_QUERY, move |_| {
		let cache = getter.clone();

		async move { Ok(Value::String(cache.get_access_token().await)) }
	});
	bridge.register(SET_IDENTITY_TOKEN_QUERY, move |payload| {
		let cache = cache.clone();

		async move {
			let request = serde_json::from_value::<SetIdentityToken>(payload).map_err(|e| {
				BridgeError::InvalidPayload {
					name: SET_IDENTITY_TOKEN_QUERY.into(),
					reason: e.to_string(),
				}
			})?;

			cache.set_identity_token(request.token.map(TokenSecret::new));

			Ok(Value::Null)
		}
	});
}
