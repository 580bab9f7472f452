//! Single-flight call consolidation plus an expiry-aware bearer token cache.
//!
//! [`singleflight::SingleFlight`] collapses concurrent calls that share a key into one execution
//! whose outcome is fanned out to every caller. [`cache::TokenCache`] builds on it to hand out
//! issuer-minted access tokens, refetching only when the cached token is about to expire and never
//! running two fetches for the same identity at once.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod bridge;
pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod http;
pub mod obs;
pub mod singleflight;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
