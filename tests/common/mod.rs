#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use time::{OffsetDateTime, macros};
// self
use tokenflight::{
	auth::TokenSecret,
	error::TransportError,
	http::{IssuerResponse, IssuerTransport, TransportFuture},
	url::Url,
};

pub const ISSUER: &str = "https://example/getToken";
pub const START: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

pub fn issuer() -> Url {
	Url::parse(ISSUER).expect("Issuer fixture URL should parse.")
}

/// Builds an unsigned JWT whose `jti` carries `label` so distinct tokens stay distinguishable.
pub fn jwt(label: &str, exp: OffsetDateTime) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
	let claims = serde_json::json!({ "jti": label, "exp": exp.unix_timestamp() });
	let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

	format!("{header}.{payload}.sig")
}

pub enum Reply {
	Body(String),
	Status(u16, String),
	Network,
}
impl Reply {
	pub fn token(label: &str, exp: OffsetDateTime) -> Self {
		Self::Body(jwt(label, exp))
	}
}

/// Issuer fake that plays back scripted replies and counts physical calls.
pub struct ScriptedTransport {
	replies: Mutex<VecDeque<Reply>>,
	calls: AtomicUsize,
	identities: Mutex<Vec<String>>,
	delay: std::time::Duration,
}
impl ScriptedTransport {
	pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
		Self::with_delay(replies, std::time::Duration::ZERO)
	}

	pub fn with_delay(
		replies: impl IntoIterator<Item = Reply>,
		delay: std::time::Duration,
	) -> Arc<Self> {
		Arc::new(Self {
			replies: Mutex::new(replies.into_iter().collect()),
			calls: AtomicUsize::new(0),
			identities: Mutex::new(Vec::new()),
			delay,
		})
	}

	pub fn push(&self, reply: Reply) {
		self.replies.lock().push_back(reply);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn identities(&self) -> Vec<String> {
		self.identities.lock().clone()
	}
}
impl IssuerTransport for ScriptedTransport {
	fn get_token<'a>(&'a self, _issuer: &'a Url, identity: &'a TokenSecret) -> TransportFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.identities.lock().push(identity.expose().to_owned());

		let reply = self.replies.lock().pop_front().unwrap_or(Reply::Network);
		let delay = self.delay;

		Box::pin(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}

			match reply {
				Reply::Body(body) => Ok(IssuerResponse { status: 200, body }),
				Reply::Status(status, body) => Ok(IssuerResponse { status, body }),
				Reply::Network => Err(TransportError::network(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"issuer unreachable",
				))),
			}
		})
	}
}
