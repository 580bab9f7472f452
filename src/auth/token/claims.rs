//! Unverified JWT claim decoding.
//!
//! Signatures are never checked here: the issuer vouches for its own tokens, and the client only
//! needs the `exp` claim to schedule refreshes.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, error::MalformedTokenError};

/// Registered claims the cache cares about.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Expiry as seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<f64>,
	/// Issued-at as seconds since the Unix epoch.
	#[serde(default)]
	pub iat: Option<f64>,
	/// Subject the token was minted for.
	#[serde(default)]
	pub sub: Option<String>,
}
impl TokenClaims {
	/// Decodes the payload of `token`, accepting either a bare JWT or `<scheme> <jwt>`.
	pub fn decode(token: &str) -> Result<Self, MalformedTokenError> {
		let jwt = strip_scheme(token.trim());

		if jwt.is_empty() {
			return Err(MalformedTokenError::EmptyBody);
		}

		let segments = jwt.split('.').collect::<Vec<_>>();
		let [_, payload, _] = segments.as_slice() else {
			return Err(MalformedTokenError::NotJwt { segments: segments.len() });
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
		let claims = serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(
			&bytes,
		))?;

		Ok(claims)
	}

	/// Converts the `exp` claim into an absolute instant.
	pub fn expires_at(&self) -> Result<OffsetDateTime, MalformedTokenError> {
		let exp = self.exp.ok_or(MalformedTokenError::MissingExpiry)?;

		if !exp.is_finite() || exp < i64::MIN as f64 || exp > i64::MAX as f64 {
			return Err(MalformedTokenError::ExpiryOutOfRange { exp });
		}

		OffsetDateTime::from_unix_timestamp(exp.floor() as i64)
			.map_err(|_| MalformedTokenError::ExpiryOutOfRange { exp })
	}
}

/// Drops a leading auth scheme (`Bearer <jwt>`) if present.
fn strip_scheme(token: &str) -> &str {
	match token.split_once(' ') {
		Some((_, rest)) => rest.trim_start(),
		None => token,
	}
}

#[cfg(test)]
pub(crate) fn encode_unsigned_jwt(claims: &TokenClaims) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD
		.encode(serde_json::to_vec(claims).expect("Claims fixture should serialize to JSON."));

	format!("{header}.{payload}.sig")
}
