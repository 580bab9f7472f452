//! Crate-level error types shared by the coordinator, the token cache, and transports.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant is cheap to clone so a single fetch failure can be handed to every caller that
/// joined the same in-flight operation.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) while calling the issuer.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Issuer answered with something other than a token.
	#[error(transparent)]
	Issuer(#[from] IssuerError),
	/// Issuer body could not be decoded into a usable token.
	#[error(transparent)]
	MalformedToken(#[from] MalformedTokenError),

	/// No identity token is configured, so the issuer cannot be asked for an access token.
	#[error("No identity token is available for the token issuer.")]
	IdentityMissing,
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// Issuer URL must use HTTPS unless it points at a loopback host.
	#[error("The token issuer must use HTTPS: {url}.")]
	InsecureIssuer {
		/// Issuer URL that failed validation.
		url: String,
	},
	/// No transport was supplied and the default reqwest transport is compiled out.
	#[error("No issuer transport is configured.")]
	MissingTransport,
	/// Issuer URL has no host component.
	#[error("The token issuer URL has no host: {url}.")]
	IssuerWithoutHost {
		/// Issuer URL that failed validation.
		url: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token issuer.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Issuer responses that do not carry a token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IssuerError {
	/// Issuer returned a status other than `200 OK`.
	#[error("Token issuer responded with HTTP {status}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the issuer.
		status: u16,
		/// Leading bytes of the response body, if any.
		body_preview: Option<String>,
	},
}

/// Failures raised while decoding an issuer-minted token.
#[derive(Clone, Debug, ThisError)]
pub enum MalformedTokenError {
	/// Issuer returned an empty body.
	#[error("Token issuer returned an empty body.")]
	EmptyBody,
	/// Token is not a three-segment JWT.
	#[error("Token is not a JWT: expected 3 segments, found {segments}.")]
	NotJwt {
		/// Number of `.`-separated segments found.
		segments: usize,
	},
	/// JWT payload segment is not valid base64url.
	#[error("JWT payload is not valid base64url.")]
	PayloadEncoding(#[from] base64::DecodeError),
	/// JWT payload is not a JSON claims object.
	#[error("JWT claims could not be parsed.")]
	Claims(#[source] Arc<serde_path_to_error::Error<serde_json::Error>>),
	/// Claims carry no `exp` value.
	#[error("JWT claims do not include an expiry.")]
	MissingExpiry,
	/// `exp` does not map to a representable instant.
	#[error("JWT expiry {exp} is out of range.")]
	ExpiryOutOfRange {
		/// Raw `exp` claim value.
		exp: f64,
	},
}
impl From<serde_path_to_error::Error<serde_json::Error>> for MalformedTokenError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Claims(Arc::new(e))
	}
}
