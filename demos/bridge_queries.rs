//! Demonstrates exposing a token cache through the message bridge with a custom transport.
//!
//! 1. Implement [`IssuerTransport`] for whatever HTTP stack the host already runs.
//! 2. Build a [`TokenCache`] with that transport.
//! 3. Register the token queries on a [`MessageBridge`] and dispatch them as a frontend would.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use tokenflight::{
	auth::TokenSecret,
	bridge::{self, MessageBridge},
	cache::TokenCache,
	http::{IssuerResponse, IssuerTransport, TransportFuture},
};

/// Issuer stand-in that mints a token per identity and counts its calls.
#[derive(Default)]
struct LocalIssuer {
	calls: AtomicUsize,
}
impl IssuerTransport for LocalIssuer {
	fn get_token<'a>(&'a self, _issuer: &'a Url, identity: &'a TokenSecret) -> TransportFuture<'a> {
		let serial = self.calls.fetch_add(1, Ordering::SeqCst);
		let claims = json!({
			"sub": identity.expose(),
			"jti": serial,
			"exp": (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp(),
		});
		let body = format!(
			"{}.{}.local",
			URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
			URL_SAFE_NO_PAD.encode(claims.to_string())
		);

		Box::pin(async move {
			tokio::time::sleep(std::time::Duration::from_millis(25)).await;

			Ok(IssuerResponse { status: 200, body })
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let issuer = Arc::new(LocalIssuer::default());
	let cache = TokenCache::builder(Url::parse("https://issuer.invalid/getToken")?)
		.transport(issuer.clone())
		.build()?;
	let bridge = MessageBridge::new();

	bridge::register_token_queries(&bridge, cache.clone());

	let signed_out = bridge.query(bridge::GET_ACCESS_TOKEN_QUERY, Value::Null).await?;

	println!("Signed out token: {signed_out}.");

	bridge.query(bridge::SET_IDENTITY_TOKEN_QUERY, json!({ "token": "frontend-user" })).await?;

	let (a, b, c) = tokio::join!(
		bridge.query(bridge::GET_ACCESS_TOKEN_QUERY, Value::Null),
		bridge.query(bridge::GET_ACCESS_TOKEN_QUERY, Value::Null),
		bridge.query(bridge::GET_ACCESS_TOKEN_QUERY, Value::Null),
	);

	let (a, b, c) = (a?, b?, c?);

	println!(
		"Three queries answered identically: {}; issuer calls: {}.",
		a == b && b == c,
		issuer.calls.load(Ordering::SeqCst)
	);
	println!("{bridge:?}");

	Ok(())
}
