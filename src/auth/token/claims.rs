//! Unverified JWT claim peeking for diagnostics.
//!
//! Token endpoints commonly mint JWTs whose `sub` claim names the domain the token was
//! issued for. The cache never trusts these claims; it only surfaces them in logs so
//! cross-domain mixups are visible.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Subset of registered JWT claims, decoded without signature verification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
	/// Subject claim.
	#[serde(default)]
	pub sub: Option<String>,
	/// Issued-at claim, seconds since the Unix epoch.
	#[serde(default)]
	pub iat: Option<i64>,
	/// Expiry claim, seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<i64>,
}
impl TokenClaims {
	/// Decodes the payload segment of a JWT-shaped credential.
	///
	/// Returns `None` for opaque credentials or payloads that are not JSON objects.
	pub fn peek(token: &TokenSecret) -> Option<Self> {
		let mut segments = token.expose().split('.');
		let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

		if segments.next().is_some() {
			return None;
		}

		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;

		serde_json::from_slice(&bytes).ok()
	}

	/// Expiry claim as an absolute instant.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
	}
}
