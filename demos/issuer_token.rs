//! Demonstrates the token cache against a mock issuer with the default reqwest transport.
//!
//! Eight concurrent lookups share one issuer call, and the follow-up lookup is answered from the
//! cache without touching the network.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use futures::future;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use tokenflight::cache::TokenCache;

fn mint_jwt(subject: &str, expires_at: OffsetDateTime) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
	let claims = serde_json::json!({ "sub": subject, "exp": expires_at.unix_timestamp() });
	let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

	format!("{header}.{payload}.demo")
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let issuer_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/getToken").header("authorization", "Bearer demo-identity");
			then.status(200)
				.header("content-type", "text/plain")
				.body(mint_jwt("demo-user", OffsetDateTime::now_utc() + Duration::minutes(10)));
		})
		.await;
	let cache = TokenCache::builder(Url::parse(&server.url("/getToken"))?)
		.identity_token("demo-identity")
		.build()?;

	cache.on_access_token_changed(|token| match token {
		Some(token) => println!("Token changed; expires at {:?}.", token.expires_at_rfc3339()),
		None => println!("Token cleared."),
	});

	let tokens = future::try_join_all((0..8).map(|_| cache.access_token())).await?;
	let again = cache.access_token().await?;

	issuer_mock.assert_calls_async(1).await;

	println!(
		"{} concurrent lookups shared one issuer call; cached token reused: {}.",
		tokens.len(),
		tokens.iter().all(|token| token == &again)
	);
	println!(
		"Lookups: {}, cache hits: {}, fetches: {}.",
		cache.metrics().lookups(),
		cache.metrics().cache_hits(),
		cache.metrics().fetches()
	);

	cache.set_identity_token(None);

	Ok(())
}
