//! Reqwest-backed [`TokenFetcher`] for JSON token endpoints guarded by basic auth.
//!
//! Each fetch sends `POST <endpoint>` with `Authorization: Basic ...` and a JSON body
//! `{"<domain_field>": "<domain>"}`, then expects a JSON object carrying a non-empty
//! string `access_token`. Redirects are not followed: a token endpoint answers directly
//! or not at all.

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{
	StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
	redirect::Policy,
};
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{DomainId, TokenSecret},
	config::FetcherConfig,
	error::{ConfigError, FetchError},
	fetch::{FetchFuture, FetchedToken, TokenFetcher},
	obs,
};

const BODY_SNIPPET_LEN: usize = 512;

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
}

/// Fetches credentials from an HTTP token endpoint.
#[derive(Clone)]
pub struct HttpTokenFetcher {
	client: ReqwestClient,
	config: FetcherConfig,
	authorization: String,
	timeout: StdDuration,
}
impl HttpTokenFetcher {
	/// Builds a fetcher with its own reqwest client (no redirects, configured timeout).
	pub fn new(config: FetcherConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		let timeout = Self::std_timeout(&config)?;
		let client = ReqwestClient::builder()
			.redirect(Policy::none())
			.timeout(timeout)
			.build()
			.map_err(|e| ConfigError::HttpClientBuild { message: e.to_string() })?;

		Self::with_client(client, config)
	}

	/// Wraps an existing reqwest client. The configured timeout is applied per request.
	pub fn with_client(client: ReqwestClient, config: FetcherConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		let timeout = Self::std_timeout(&config)?;
		let authorization = basic_authorization(&config.client_id, &config.client_secret);

		Ok(Self { client, config, authorization, timeout })
	}

	/// Configuration the fetcher was built with.
	pub fn config(&self) -> &FetcherConfig {
		&self.config
	}

	fn std_timeout(config: &FetcherConfig) -> Result<StdDuration, ConfigError> {
		StdDuration::try_from(config.timeout).map_err(|_| ConfigError::NonPositiveTimeout)
	}

	fn request_body(&self, domain: &DomainId) -> Result<Vec<u8>, FetchError> {
		let mut body = Map::new();

		body.insert(self.config.domain_field.clone(), Value::String(domain.to_string()));

		serde_json::to_vec(&body).map_err(|e| FetchError::other(e.to_string()))
	}

	async fn exchange(&self, domain: &DomainId) -> Result<FetchedToken, FetchError> {
		let response = self
			.client
			.post(self.config.endpoint.clone())
			.timeout(self.timeout)
			.header(AUTHORIZATION, &self.authorization)
			.header(CONTENT_TYPE, "application/json")
			.body(self.request_body(domain)?)
			.send()
			.await?;
		let status = response.status();
		let bytes = response.bytes().await?;

		obs::trace_event!(debug, domain = %domain, status = status.as_u16(), "token endpoint responded");

		parse_token_response(status, &bytes)
	}
}
impl TokenFetcher for HttpTokenFetcher {
	fn fetch<'a>(&'a self, domain: &'a DomainId) -> FetchFuture<'a> {
		Box::pin(self.exchange(domain))
	}
}
impl Debug for HttpTokenFetcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpTokenFetcher").field("config", &self.config).finish()
	}
}

fn basic_authorization(client_id: &str, client_secret: &str) -> String {
	format!("Basic {}", STANDARD.encode(format!("{client_id}:{client_secret}")))
}

fn parse_token_response(status: StatusCode, bytes: &[u8]) -> Result<FetchedToken, FetchError> {
	if !status.is_success() {
		return Err(FetchError::Status { status: status.as_u16(), body: body_snippet(bytes) });
	}

	let de = &mut serde_json::Deserializer::from_slice(bytes);
	let response: TokenResponse = serde_path_to_error::deserialize(de).map_err(|e| {
		FetchError::MalformedResponse {
			path: Some(e.path().to_string()),
			message: e.into_inner().to_string(),
		}
	})?;

	if response.access_token.is_empty() {
		return Err(FetchError::MalformedResponse {
			path: Some("access_token".into()),
			message: "access_token is empty".into(),
		});
	}

	Ok(FetchedToken::new(TokenSecret::new(response.access_token), OffsetDateTime::now_utc()))
}

fn body_snippet(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).chars().take(BODY_SNIPPET_LEN).collect()
}
