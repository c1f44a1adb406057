//! Cache-level error types shared across fetchers, stores, and configuration.

// self
use crate::{_prelude::*, auth::IdentifierError, store::StoreError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical cache error exposed by public APIs.
///
/// The error is `Clone` because a single fetch outcome is handed to every caller that
/// attached to the same in-flight request.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// The token fetcher could not produce a token for the domain.
	#[error("Token fetch for domain `{domain}` failed.")]
	FetchFailed {
		/// Domain whose fetch failed.
		domain: String,
		/// Fetcher-reported failure.
		#[source]
		source: FetchError,
	},
	/// The domain identifier was rejected before any lookup happened.
	#[error("Domain identifier is invalid.")]
	InvalidDomain(#[from] IdentifierError),
	/// Persistent store failure during write-through or clearing.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns the underlying fetch failure, if this error came from the fetcher.
	pub fn as_fetch_error(&self) -> Option<&FetchError> {
		match self {
			Self::FetchFailed { source, .. } => Some(source),
			_ => None,
		}
	}
}

/// Failures reported by a [`TokenFetcher`](crate::fetch::TokenFetcher).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum FetchError {
	/// Transport failure (DNS, TCP, TLS).
	#[error("Network error occurred while calling the token endpoint: {message}.")]
	Network {
		/// Transport-supplied message.
		message: String,
	},
	/// The request did not complete within the configured timeout.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout,
	/// The endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, truncated for diagnostics.
		body: String,
	},
	/// The endpoint answered with a body that does not carry a usable token.
	#[error("Token endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// Field path at which decoding failed, when known.
		path: Option<String>,
		/// Decoder-supplied message.
		message: String,
	},
	/// Any other fetcher-specific failure.
	#[error("{message}")]
	Other {
		/// Fetcher-supplied message.
		message: String,
	},
}
impl FetchError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl Display) -> Self {
		Self::Network { message: src.to_string() }
	}

	/// Builds a malformed-response error without a field path.
	pub fn malformed(message: impl Into<String>) -> Self {
		Self::MalformedResponse { path: None, message: message.into() }
	}

	/// Builds a fetcher-specific failure.
	pub fn other(message: impl Into<String>) -> Self {
		Self::Other { message: message.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for FetchError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			return Self::Timeout;
		}
		if e.is_decode() {
			return Self::malformed(e.to_string());
		}

		Self::network(e)
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be decoded.
	#[error("Configuration is invalid at `{path}`: {message}.")]
	Parse {
		/// Field path at which decoding failed.
		path: String,
		/// Decoder-supplied message.
		message: String,
	},
	/// The configured time-to-live is zero or negative.
	#[error("The token ttl must be positive.")]
	NonPositiveTtl,
	/// The configured fetch timeout is zero.
	#[error("The fetch timeout must be positive.")]
	NonPositiveTimeout,
	/// Both store key prefixes are identical, so token and expiry keys would collide.
	#[error("Token and expiry key prefixes must differ.")]
	CollidingKeyPrefixes,
	/// Token endpoint URL cannot be used.
	#[error("Token endpoint `{endpoint}` is invalid: {reason}.")]
	InvalidEndpoint {
		/// Offending endpoint as configured.
		endpoint: String,
		/// Human-readable reason.
		reason: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed: {message}.")]
	HttpClientBuild {
		/// Builder-supplied message.
		message: String,
	},
}
impl ConfigError {
	/// Converts a path-aware serde failure into [`ConfigError::Parse`].
	pub fn parse(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = err.path().to_string();

		Self::Parse { path, message: err.into_inner().to_string() }
	}
}
