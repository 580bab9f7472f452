//! Token primitives shared by the cache and the transports.

pub mod claims;
pub mod record;
pub mod secret;
