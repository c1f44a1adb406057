//! Token models: redacted secrets, cached records, and unverified claim peeks.

pub mod claims;
pub mod record;
pub mod secret;
