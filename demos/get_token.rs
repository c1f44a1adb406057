//! Demonstrates fetching a per-domain token over HTTP once and serving repeat lookups from
//! the in-memory cache, with the persistent store kept in sync.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use credential_cache::{
	CredentialCache,
	config::FetcherConfig,
	fetch::HttpTokenFetcher,
	store::{KeyValueStore, MemoryStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"token_type\":\"bearer\"}");
		})
		.await;
	let config = FetcherConfig::new(Url::parse(&server.url("/token"))?, "demo-client", "super-secret");
	let store = MemoryStore::default();
	let cache = <CredentialCache<HttpTokenFetcher>>::new(
		HttpTokenFetcher::new(config)?,
		Arc::new(store.clone()),
	);
	let (first, second) =
		tokio::join!(cache.get_token("tenant-acme"), cache.get_token("tenant-acme"));
	let third = cache.get_token("tenant-acme").await?;

	println!("Concurrent lookups: {} / {}.", first?.expose(), second?.expose());
	println!("Cached lookup: {}.", third.expose());
	println!("Persisted expiry: {:?}.", store.get("access_expiry_tenant-acme")?);

	token_mock.assert_async().await;

	Ok(())
}
