//! Host-facing authorization contract.
//!
//! Hosting SDKs expect an object that resolves to a token string and treat an empty string as
//! "no credential right now". [`AuthorizationClient`] models that contract; the [`TokenCache`]
//! implementation reports failures to its [`FailureSink`](crate::obs::FailureSink) and then
//! resolves to `""` instead of surfacing the error.

// self
use crate::{_prelude::*, cache::TokenCache};

/// Boxed future returned by [`AuthorizationClient::get_access_token`].
pub type AuthorizationFuture<'a> = Pin<Box<dyn Future<Output = String> + 'a + Send>>;

/// Contract for objects that can authorize requests on behalf of the host.
pub trait AuthorizationClient
where
	Self: Send + Sync,
{
	/// Resolves to the current access token, or an empty string when none is available.
	fn get_access_token(&self) -> AuthorizationFuture<'_>;
}
impl AuthorizationClient for TokenCache {
	fn get_access_token(&self) -> AuthorizationFuture<'_> {
		Box::pin(async move {
			match self.access_token().await {
				Ok(token) => token.token.into_inner(),
				Err(Error::IdentityMissing) => {
					#[cfg(feature = "tracing")]
					tracing::debug!(issuer = self.issuer().as_str(), "no identity token configured");

					String::new()
				},
				Err(err) => {
					self.report_failure(&err);

					String::new()
				},
			}
		})
	}
}
