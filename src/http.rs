//! Transport primitives for talking to the token issuer.
//!
//! The issuer protocol is a single request: `GET <issuer>` with
//! `Authorization: Bearer <identity token>`, answered by a `200 OK` whose body is the access
//! token. [`IssuerTransport`] is the crate's only dependency on an HTTP stack so hosts can plug
//! in their own client (or a scripted fake in tests); [`ReqwestTransport`] is the default.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::{header::AUTHORIZATION, redirect::Policy};
// self
use crate::{_prelude::*, auth::TokenSecret, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Boxed future returned by [`IssuerTransport::get_token`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IssuerResponse, TransportError>> + 'a + Send>>;

/// Raw issuer answer; status interpretation is left to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuerResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body decoded as text.
	pub body: String,
}
impl IssuerResponse {
	/// Returns `true` for `200 OK`, the only status that carries a token.
	pub fn is_ok(&self) -> bool {
		self.status == 200
	}

	/// Leading characters of the body for error reports.
	pub fn body_preview(&self) -> Option<String> {
		const PREVIEW_LEN: usize = 256;

		let trimmed = self.body.trim();

		if trimmed.is_empty() {
			return None;
		}

		Some(trimmed.chars().take(PREVIEW_LEN).collect())
	}
}

/// Abstraction over HTTP transports able to call the token issuer.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// fetch a cache performs, and the returned future must be `Send` so consolidated fetches can be
/// driven from any executor thread. Network failures map to [`TransportError`]; non-200 answers
/// are returned as regular [`IssuerResponse`] values.
pub trait IssuerTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `GET issuer` authenticated with the bearer `identity` token.
	fn get_token<'a>(&'a self, issuer: &'a Url, identity: &'a TokenSecret) -> TransportFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`].
///
/// The issuer answers directly, so redirects are not followed by clients built through
/// [`ReqwestTransport::new`]; configure any custom client passed to
/// [`ReqwestTransport::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a client that refuses to follow redirects.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl IssuerTransport for ReqwestTransport {
	fn get_token<'a>(&'a self, issuer: &'a Url, identity: &'a TokenSecret) -> TransportFuture<'a> {
		Box::pin(async move {
			let response = self
				.0
				.get(issuer.clone())
				.header(AUTHORIZATION, identity.bearer_header())
				.send()
				.await?;
			let status = response.status().as_u16();
			let body = response.text().await?;

			Ok(IssuerResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn body_preview_is_trimmed_and_bounded() {
		let empty = IssuerResponse { status: 500, body: " \n".into() };
		let long = IssuerResponse { status: 502, body: format!("  {}", "x".repeat(1_000)) };

		assert_eq!(empty.body_preview(), None);
		assert_eq!(long.body_preview().map(|preview| preview.len()), Some(256));
		assert!(!long.is_ok());
	}
}
