//! Token fetcher contract and the reference HTTP implementation.
//!
//! The cache never talks to the network itself. It hands a domain to a
//! [`TokenFetcher`], which performs exactly one exchange and returns either a raw
//! credential or a [`FetchError`]. Timeouts, authentication towards the token endpoint,
//! and response decoding all belong to the fetcher.

#[cfg(feature = "reqwest")] pub mod http;

#[cfg(feature = "reqwest")] pub use http::HttpTokenFetcher;

// self
use crate::{
	_prelude::*,
	auth::{DomainId, TokenSecret},
	error::FetchError,
};

/// Boxed future returned by [`TokenFetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<FetchedToken, FetchError>> + 'a + Send>>;

/// Performs one network exchange that yields a credential for a domain.
pub trait TokenFetcher
where
	Self: Send + Sync,
{
	/// Fetches a fresh credential for `domain`.
	fn fetch<'a>(&'a self, domain: &'a DomainId) -> FetchFuture<'a>;
}

/// Raw credential produced by a [`TokenFetcher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedToken {
	/// Bearer credential.
	pub token: TokenSecret,
	/// Instant the fetcher received the credential.
	pub issued_at: OffsetDateTime,
}
impl FetchedToken {
	/// Wraps a credential received at `issued_at`.
	pub fn new(token: impl Into<TokenSecret>, issued_at: OffsetDateTime) -> Self {
		Self { token: token.into(), issued_at }
	}
}
