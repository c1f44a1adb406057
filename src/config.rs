//! Serde-backed configuration for the cache and the reference HTTP fetcher.
//!
//! Every field has a default, so an empty JSON object (`{}`) is a valid cache
//! configuration. Decoding goes through `serde_path_to_error` so failures name the
//! offending field.

// crates.io
use serde::{Deserializer, de::Error as _};
// self
use crate::{_prelude::*, auth::DomainId, error::ConfigError};

/// Cache behavior and persistent key layout.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
	/// Lifetime granted to every fetched token.
	#[serde(rename = "ttl_seconds", deserialize_with = "duration_from_seconds")]
	pub ttl: Duration,
	/// Prefix of the store key holding a domain's token.
	pub token_key_prefix: String,
	/// Prefix of the store key holding a domain's expiry (Unix milliseconds).
	pub expiry_key_prefix: String,
	/// Reuse still-valid tokens found in the persistent store after a restart.
	pub rehydrate: bool,
}
impl CacheConfig {
	/// Token lifetime used when none is configured.
	pub const DEFAULT_TTL: Duration = Duration::hours(3);

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(json);
		let config: Self = serde_path_to_error::deserialize(de).map_err(ConfigError::parse)?;

		config.validate()?;

		Ok(config)
	}

	/// Overrides the token lifetime.
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Enables or disables store rehydration.
	pub fn with_rehydrate(mut self, rehydrate: bool) -> Self {
		self.rehydrate = rehydrate;

		self
	}

	/// Checks invariants that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl);
		}
		if self.token_key_prefix == self.expiry_key_prefix {
			return Err(ConfigError::CollidingKeyPrefixes);
		}

		Ok(())
	}

	/// Store key holding the token for `domain`.
	pub fn token_key(&self, domain: &DomainId) -> String {
		format!("{}{domain}", self.token_key_prefix)
	}

	/// Store key holding the expiry for `domain`.
	pub fn expiry_key(&self, domain: &DomainId) -> String {
		format!("{}{domain}", self.expiry_key_prefix)
	}

	/// Returns `true` if `key` belongs to the cache's key layout.
	pub fn owns_key(&self, key: &str) -> bool {
		key.starts_with(&self.token_key_prefix) || key.starts_with(&self.expiry_key_prefix)
	}
}
impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			ttl: Self::DEFAULT_TTL,
			token_key_prefix: "access_token_".into(),
			expiry_key_prefix: "access_expiry_".into(),
			rehydrate: true,
		}
	}
}

/// Settings for [`HttpTokenFetcher`](crate::fetch::HttpTokenFetcher).
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherConfig {
	/// Token endpoint receiving the POST request.
	#[serde(deserialize_with = "url_from_str")]
	pub endpoint: Url,
	/// Basic-auth user name.
	pub client_id: String,
	/// Basic-auth password.
	pub client_secret: String,
	/// Request timeout; an elapsed timeout is reported as a fetch failure.
	#[serde(
		rename = "timeout_seconds",
		default = "FetcherConfig::default_timeout",
		deserialize_with = "duration_from_seconds"
	)]
	pub timeout: Duration,
	/// JSON body field carrying the domain identifier.
	#[serde(default = "FetcherConfig::default_domain_field")]
	pub domain_field: String,
}
impl FetcherConfig {
	/// Creates a configuration with default timeout and body layout.
	pub fn new(
		endpoint: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			endpoint,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			timeout: Self::default_timeout(),
			domain_field: Self::default_domain_field(),
		}
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(json);
		let config: Self = serde_path_to_error::deserialize(de).map_err(ConfigError::parse)?;

		config.validate()?;

		Ok(config)
	}

	/// Overrides the request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Checks invariants that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.endpoint.scheme(), "http" | "https") {
			return Err(ConfigError::InvalidEndpoint {
				endpoint: self.endpoint.to_string(),
				reason: "scheme must be http or https".into(),
			});
		}
		if !self.timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		Ok(())
	}

	fn default_timeout() -> Duration {
		Duration::seconds(30)
	}

	fn default_domain_field() -> String {
		"domainid".into()
	}
}
impl Debug for FetcherConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FetcherConfig")
			.field("endpoint", &self.endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("timeout", &self.timeout)
			.field("domain_field", &self.domain_field)
			.finish()
	}
}

fn duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
	D: Deserializer<'de>,
{
	let secs = u32::deserialize(deserializer)?;

	Ok(Duration::seconds(i64::from(secs)))
}

fn url_from_str<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	Url::parse(&raw).map_err(D::Error::custom)
}
