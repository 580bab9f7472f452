//! Credential models: redacted secrets, JWT expiry claims, and cached access tokens.

pub mod token;

pub use token::{claims::*, record::*, secret::*};
