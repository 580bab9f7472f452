//! Access token plus the expiry it was issued with, stored and replaced as one value.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::token::{claims::TokenClaims, secret::TokenSecret},
	error::MalformedTokenError,
};

/// Freshness of an [`AccessToken`] relative to a safety margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// More than the safety margin remains before expiry.
	Valid,
	/// Not expired yet, but within the safety margin; a new token should be fetched.
	Stale,
	/// Expiry instant has passed.
	Expired,
}

/// Issuer-minted access token and its absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Token value exactly as returned by the issuer; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant decoded from the token's `exp` claim.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Wraps an already-decoded token/expiry pair.
	pub fn new(token: impl Into<TokenSecret>, expires_at: OffsetDateTime) -> Self {
		Self { token: token.into(), expires_at }
	}

	/// Builds a token from a raw issuer response body.
	///
	/// The trimmed body is kept verbatim as the token value (including a leading `Bearer`
	/// scheme, if the issuer sends one) and its `exp` claim becomes the expiry.
	pub fn from_issuer_body(body: &str) -> Result<Self, MalformedTokenError> {
		let token = body.trim();

		if token.is_empty() {
			return Err(MalformedTokenError::EmptyBody);
		}

		let expires_at = TokenClaims::decode(token)?.expires_at()?;

		Ok(Self::new(token, expires_at))
	}

	/// Returns the raw token value.
	pub fn expose(&self) -> &str {
		self.token.expose()
	}

	/// Time left before expiry at `now` (negative once expired).
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Classifies the token at `now` using `margin` as the early-refresh window.
	pub fn status_at(&self, now: OffsetDateTime, margin: Duration) -> TokenStatus {
		let remaining = self.remaining_at(now);

		if remaining <= Duration::ZERO {
			TokenStatus::Expired
		} else if remaining <= margin {
			TokenStatus::Stale
		} else {
			TokenStatus::Valid
		}
	}

	/// Returns `true` unless more than `margin` remains before expiry.
	pub fn needs_refresh_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		!matches!(self.status_at(now, margin), TokenStatus::Valid)
	}

	/// Renders the expiry as an RFC 3339 timestamp for hosts that pass it alongside the token.
	pub fn expires_at_rfc3339(&self) -> Option<String> {
		self.expires_at.format(&Rfc3339).ok()
	}
}
