//! Cached token records.

// self
use crate::{
	_prelude::*,
	auth::{
		DomainId,
		token::{claims::TokenClaims, secret::TokenSecret},
	},
};

/// Cached credential for a single domain.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Domain the credential was issued for.
	pub domain: DomainId,
	/// Bearer credential; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant the cache accepted the credential.
	pub issued_at: OffsetDateTime,
	/// Instant from which the credential is considered stale.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Builds a record that expires `ttl` after `issued_at`.
	pub fn issue(
		domain: DomainId,
		token: TokenSecret,
		issued_at: OffsetDateTime,
		ttl: Duration,
	) -> Self {
		Self { domain, token, issued_at, expires_at: issued_at + ttl }
	}

	/// Returns `true` if the record may be returned to callers at `instant`.
	///
	/// A record issued "in the future" by a skewed clock is still usable until it
	/// expires, so only the expiry bound is checked.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Decodes the unverified claims of a JWT-shaped credential.
	pub fn claims(&self) -> Option<TokenClaims> {
		TokenClaims::peek(&self.token)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("domain", &self.domain)
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record() -> TokenRecord {
		TokenRecord::issue(
			DomainId::new("tenant-a").expect("Domain fixture should be valid."),
			TokenSecret::new("access"),
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::hours(3),
		)
	}

	#[test]
	fn issue_adds_ttl_to_issued_at() {
		assert_eq!(record().expires_at, macros::datetime!(2025-01-01 03:00 UTC));
	}

	#[test]
	fn validity_is_strictly_before_expiry() {
		let record = record();

		assert!(record.is_valid_at(macros::datetime!(2024-12-31 23:00 UTC)));
		assert!(record.is_valid_at(macros::datetime!(2025-01-01 02:59:59.999 UTC)));
		assert!(!record.is_valid_at(macros::datetime!(2025-01-01 03:00 UTC)));
	}

	#[test]
	fn debug_redacts_the_token() {
		let rendered = format!("{:?}", record());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("access\""));
	}
}
