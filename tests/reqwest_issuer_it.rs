#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use tokenflight::{
	cache::TokenCache,
	client::AuthorizationClient,
	error::{Error, IssuerError},
	url::Url,
};

fn build_cache(issuer: &str) -> TokenCache {
	TokenCache::builder(Url::parse(issuer).expect("Mock issuer URL should parse."))
		.identity_token("id123")
		.build()
		.expect("Cache should build with the default reqwest transport.")
}

#[tokio::test]
async fn issuer_is_called_once_with_the_identity_bearer() {
	let server = MockServer::start_async().await;
	let token = common::jwt("tok-A", OffsetDateTime::now_utc() + Duration::hours(1));
	let body = token.clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/getToken").header("authorization", "Bearer id123");
			then.status(200).header("content-type", "text/plain").body(format!("{body}\n"));
		})
		.await;
	let cache = build_cache(&server.url("/getToken"));
	let first = cache.access_token().await.expect("Issuer should mint a token.");
	let second = cache.access_token().await.expect("Cached token should be reused.");

	mock.assert_calls_async(1).await;

	assert_eq!(first.expose(), token);
	assert_eq!(first, second);
}

#[tokio::test]
async fn rejected_identity_surfaces_the_status() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/getToken");
			then.status(401).body("identity token expired");
		})
		.await;
	let cache = build_cache(&server.url("/getToken"));
	let err = cache.access_token().await.expect_err("A 401 answer should fail the lookup.");

	mock.assert_async().await;

	assert_eq!(
		err.to_string(),
		"Token issuer responded with HTTP 401.",
		"Status error should render without the body."
	);
	assert!(matches!(
		err,
		Error::Issuer(IssuerError::UnexpectedStatus { status: 401, body_preview: Some(ref preview) })
			if preview == "identity token expired"
	));
	assert!(cache.cached().is_none());
	assert_eq!(cache.get_access_token().await, "");
}

#[tokio::test]
async fn redirects_are_not_followed() {
	let server = MockServer::start_async().await;
	let redirect = server
		.mock_async(|when, then| {
			when.method(GET).path("/getToken");
			then.status(302).header("location", "https://example/elsewhere");
		})
		.await;
	let cache = build_cache(&server.url("/getToken"));

	assert!(matches!(
		cache.access_token().await,
		Err(Error::Issuer(IssuerError::UnexpectedStatus { status: 302, .. }))
	));

	redirect.assert_async().await;
}

#[tokio::test]
async fn unreachable_issuer_is_a_transport_error() {
	let cache = build_cache("http://127.0.0.1:1/getToken");

	assert!(matches!(cache.access_token().await, Err(Error::Transport(_))));
}
