//! Lookup parameters for [`CredentialCache::token`](crate::cache::CredentialCache::token).

// self
use crate::{
	_prelude::*,
	auth::{DomainId, TokenRecord},
};

/// Describes a single token lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
	/// Domain whose token is requested.
	pub domain: DomainId,
	/// Bypasses the cached record when true.
	pub force: bool,
}
impl TokenRequest {
	/// Creates a request that reuses a valid cached record.
	pub fn new(domain: DomainId) -> Self {
		Self { domain, force: false }
	}

	/// Parses `domain` and creates a request for it.
	pub fn for_domain(domain: impl AsRef<str>) -> Result<Self> {
		Ok(Self::new(DomainId::new(domain)?))
	}

	/// Forces a fetch even if a valid record is cached.
	///
	/// A forced request still attaches to a fetch that is already in flight for the
	/// domain instead of starting a second one.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Returns `true` if `record` may satisfy this request at `now`.
	pub fn accepts(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		!self.force && record.is_valid_at(now)
	}
}
