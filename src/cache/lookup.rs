//! Token lookups with single-flight fetches, rehydration, and write-through.
//!
//! [`CredentialCache::token`] answers from a valid in-memory record when it can. On a
//! miss it joins the domain's pending flight or registers a new one. A flight first tries
//! to restore the record from the persistent store (when rehydration is enabled),
//! otherwise calls the fetcher once, writes the result through to the store, inserts it
//! in memory, unregisters itself, and publishes the result to every attached caller.
//! Failures are published the same way and leave no state behind, so the next call
//! starts from scratch.

// self
use crate::{
	_prelude::*,
	auth::{DomainId, TokenRecord, TokenSecret},
	cache::{
		CredentialCache, TokenRequest,
		flight::{Landing, Lookup},
	},
	error::FetchError,
	fetch::TokenFetcher,
	obs::{self, CacheOp, CacheOutcome, CacheSpan},
};

impl<F> CredentialCache<F>
where
	F: 'static + ?Sized + TokenFetcher,
{
	/// Returns a valid token for `domain`, fetching it at most once across concurrent
	/// callers.
	pub async fn get_token(&self, domain: impl AsRef<str>) -> Result<TokenSecret> {
		let request = TokenRequest::for_domain(domain)?;

		self.token(request).await.map(|record| record.token)
	}

	/// Resolves `request` to a valid record.
	pub async fn token(&self, request: TokenRequest) -> Result<TokenRecord> {
		const OP: CacheOp = CacheOp::GetToken;

		let span = CacheSpan::new(OP, "token", &request.domain);
		let result = span.instrument(self.resolve(&request)).await;

		match result {
			Ok(landing) => {
				obs::record_outcome(OP, landing.outcome);

				Ok(landing.record)
			},
			Err(err) => {
				obs::record_outcome(OP, CacheOutcome::Failure);
				obs::trace_event!(
					warn,
					domain = %request.domain,
					error = %err,
					"token lookup failed"
				);

				Err(err)
			},
		}
	}

	async fn resolve(&self, request: &TokenRequest) -> Result<Landing> {
		let (mut ticket, joined) = match self.lookup(request, self.clock.now()) {
			Lookup::Hit(record) => {
				self.metrics.record_hit();
				obs::trace_event!(trace, domain = %request.domain, "reused cached token");

				return Ok(Landing { record, outcome: CacheOutcome::Hit });
			},
			Lookup::Join(ticket) => {
				self.metrics.record_join();
				obs::trace_event!(debug, domain = %request.domain, "joined in-flight fetch");

				(ticket, true)
			},
			Lookup::Lead(ticket) => (ticket, false),
		};
		let landing = ticket.wait().await?;

		if joined { Ok(Landing { outcome: CacheOutcome::Joined, ..landing }) } else { Ok(landing) }
	}

	/// Body of flight `id`, polled by whichever attached caller is awaiting it.
	pub(crate) async fn fly(self, request: TokenRequest, id: u64) -> Result<Landing> {
		let result = self.load(&request).await;

		if result.is_err() {
			self.metrics.record_failure();
		}

		// Unregister before publishing: a caller arriving afterwards either sees the new
		// record or starts a fresh flight, never a stale failure.
		self.land(&request.domain, id);

		result
	}

	async fn load(&self, request: &TokenRequest) -> Result<Landing> {
		let domain = &request.domain;

		if self.config.rehydrate && !request.force {
			if let Some(record) = self.rehydrate(domain) {
				self.metrics.record_rehydration();
				self.records.write().insert(domain.clone(), record.clone());
				obs::trace_event!(
					info,
					domain = %domain,
					expires_at = %record.expires_at,
					"restored token from persistent store"
				);

				return Ok(Landing { record, outcome: CacheOutcome::Rehydrated });
			}
		}

		self.metrics.record_fetch();

		let fetched = self
			.fetcher
			.fetch(domain)
			.await
			.map_err(|source| Self::fetch_failed(domain, source))?;

		if fetched.token.is_empty() {
			return Err(Self::fetch_failed(
				domain,
				FetchError::malformed("fetcher returned an empty token"),
			));
		}

		let record =
			TokenRecord::issue(domain.clone(), fetched.token, self.clock.now(), self.config.ttl);

		self.write_through(&record)?;
		self.records.write().insert(domain.clone(), record.clone());
		obs::trace_event!(
			info,
			domain = %domain,
			expires_at = %record.expires_at,
			fetcher_issued_at = %fetched.issued_at,
			subject = ?record.claims().and_then(|claims| claims.sub),
			"fetched token"
		);

		Ok(Landing { record, outcome: CacheOutcome::Fetched })
	}

	/// Mirrors `record` to the store: token first, then expiry in Unix milliseconds.
	///
	/// If the expiry write fails the previous token is put back, so the stored pair never
	/// mixes a new token with an old expiry.
	fn write_through(&self, record: &TokenRecord) -> Result<()> {
		let token_key = self.config.token_key(&record.domain);
		let expiry_key = self.config.expiry_key(&record.domain);
		let expiry_millis = record.expires_at.unix_timestamp_nanos() / 1_000_000;
		let previous = self.store.get(&token_key)?;

		self.store.set(&token_key, record.token.expose())?;

		if let Err(err) = self.store.set(&expiry_key, &expiry_millis.to_string()) {
			let rollback = match previous {
				Some(token) => self.store.set(&token_key, &token),
				None => self.store.remove(&token_key).map(|_| ()),
			};

			// A failed rollback leaves the new token unpaired; report that instead.
			return Err(rollback.err().unwrap_or(err).into());
		}

		Ok(())
	}

	/// Rebuilds a still-valid record from the store. Unreadable entries are ignored.
	fn rehydrate(&self, domain: &DomainId) -> Option<TokenRecord> {
		let read = |key: String| {
			let value = self.store.get(&key);

			#[cfg(feature = "tracing")]
			if let Err(err) = &value {
				::tracing::warn!(key = %key, error = %err, "persistent store read failed");
			}

			value.ok().flatten().filter(|value| !value.is_empty())
		};
		let token = read(self.config.token_key(domain))?;
		let expiry_millis = read(self.config.expiry_key(domain))?.trim().parse::<i64>().ok()?;
		let expires_at =
			OffsetDateTime::from_unix_timestamp_nanos(i128::from(expiry_millis) * 1_000_000).ok()?;

		if self.clock.now() >= expires_at {
			return None;
		}

		Some(TokenRecord {
			domain: domain.clone(),
			token: TokenSecret::new(token),
			issued_at: expires_at - self.config.ttl,
			expires_at,
		})
	}

	fn fetch_failed(domain: &DomainId, source: FetchError) -> Error {
		Error::FetchFailed { domain: domain.to_string(), source }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		config::CacheConfig,
		fetch::{FetchFuture, FetchedToken},
		store::{KeyValueStore, MemoryStore, StoreError},
	};

	#[derive(Default)]
	struct Scripted {
		calls: AtomicUsize,
		fail: bool,
	}
	impl TokenFetcher for Scripted {
		fn fetch<'a>(&'a self, domain: &'a DomainId) -> FetchFuture<'a> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			let fail = self.fail;

			Box::pin(async move {
				if fail {
					Err(FetchError::Status { status: 500, body: String::new() })
				} else {
					Ok(FetchedToken::new(format!("{domain}-{n}"), OffsetDateTime::UNIX_EPOCH))
				}
			})
		}
	}

	struct ReadOnlyStore;
	impl KeyValueStore for ReadOnlyStore {
		fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
			Ok(None)
		}

		fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "read-only".into() })
		}

		fn remove(&self, _key: &str) -> Result<bool, StoreError> {
			Ok(false)
		}

		fn keys(&self) -> Result<Vec<String>, StoreError> {
			Ok(Vec::new())
		}
	}

	fn cache(fetcher: Scripted) -> (CredentialCache<Scripted>, MemoryStore, ManualClock) {
		let store = MemoryStore::default();
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let cache = <CredentialCache<Scripted>>::new(fetcher, Arc::new(store.clone()))
			.with_clock(Arc::new(clock.clone()));

		(cache, store, clock)
	}

	#[tokio::test]
	async fn fetched_records_use_the_cache_clock() {
		let (cache, store, _) = cache(Scripted::default());
		let record = cache
			.token(TokenRequest::for_domain("tenant-a").expect("Domain should be valid."))
			.await
			.expect("Fetch should succeed.");

		assert_eq!(record.token.expose(), "tenant-a-1");
		assert_eq!(record.issued_at, macros::datetime!(2025-01-01 00:00 UTC));
		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 03:00 UTC));
		assert_eq!(
			store.get("access_expiry_tenant-a").expect("Store read should succeed."),
			Some("1735700400000".into())
		);
		assert!(!cache.in_flight(&record.domain));
	}

	#[tokio::test]
	async fn failures_leave_no_flight_behind() {
		let (cache, store, _) = cache(Scripted { fail: true, ..Default::default() });
		let domain = DomainId::new("tenant-a").expect("Domain should be valid.");
		let err = cache.get_token("tenant-a").await.expect_err("Fetch should fail.");

		assert!(matches!(err.as_fetch_error(), Some(FetchError::Status { status: 500, .. })));
		assert!(!cache.in_flight(&domain));
		assert!(cache.cached(&domain).is_none());
		assert!(store.is_empty());
		assert_eq!(cache.metrics.failures(), 1);
	}

	#[tokio::test]
	async fn rehydration_restores_valid_entries_only() {
		let (cache, store, clock) = cache(Scripted::default());

		store.set("access_token_tenant-a", "persisted").expect("Seeding should succeed.");
		store.set("access_expiry_tenant-a", "1735700400000").expect("Seeding should succeed.");

		let record = cache
			.token(TokenRequest::for_domain("tenant-a").expect("Domain should be valid."))
			.await
			.expect("Rehydration should succeed.");

		assert_eq!(record.token.expose(), "persisted");
		assert_eq!(record.issued_at, macros::datetime!(2025-01-01 00:00 UTC));
		assert_eq!(cache.fetcher.calls.load(Ordering::SeqCst), 0);
		assert_eq!(cache.metrics.rehydrations(), 1);

		clock.advance(Duration::hours(3));

		let token = cache.get_token("tenant-a").await.expect("Refetch should succeed.");

		assert_eq!(token.expose(), "tenant-a-1");
	}

	#[tokio::test]
	async fn rehydration_can_be_disabled() {
		let (cache, store, _) = cache(Scripted::default());
		let cache = cache
			.with_config(CacheConfig::default().with_rehydrate(false))
			.expect("Config should be valid.");

		store.set("access_token_tenant-a", "persisted").expect("Seeding should succeed.");
		store.set("access_expiry_tenant-a", "1735700400000").expect("Seeding should succeed.");

		let token = cache.get_token("tenant-a").await.expect("Fetch should succeed.");

		assert_eq!(token.expose(), "tenant-a-1");
		assert_eq!(
			store.get("access_token_tenant-a").expect("Store read should succeed."),
			Some("tenant-a-1".into())
		);
	}

	#[tokio::test]
	async fn corrupt_store_entries_fall_through_to_a_fetch() {
		let (cache, store, _) = cache(Scripted::default());

		store.set("access_token_tenant-a", "persisted").expect("Seeding should succeed.");
		store.set("access_expiry_tenant-a", "tomorrow").expect("Seeding should succeed.");

		let token = cache.get_token("tenant-a").await.expect("Fetch should succeed.");

		assert_eq!(token.expose(), "tenant-a-1");
	}

	#[tokio::test]
	async fn unreadable_store_entries_fall_through_to_a_fetch() {
		struct ExpiryUnreadable(MemoryStore);
		impl KeyValueStore for ExpiryUnreadable {
			fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
				if key.starts_with("access_expiry_") {
					return Err(StoreError::Backend { message: "locked".into() });
				}

				self.0.get(key)
			}

			fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
				self.0.set(key, value)
			}

			fn remove(&self, key: &str) -> Result<bool, StoreError> {
				self.0.remove(key)
			}

			fn keys(&self) -> Result<Vec<String>, StoreError> {
				self.0.keys()
			}
		}

		let inner = MemoryStore::default();

		inner.set("access_token_tenant-a", "persisted").expect("Seeding should succeed.");

		let cache = <CredentialCache<Scripted>>::new(
			Scripted::default(),
			Arc::new(ExpiryUnreadable(inner.clone())),
		);
		let token = cache.get_token("tenant-a").await.expect("Fetch should succeed.");

		assert_eq!(token.expose(), "tenant-a-1");
		assert_eq!(cache.metrics.rehydrations(), 0);
		assert_eq!(
			inner.get("access_token_tenant-a").expect("Store read should succeed."),
			Some("tenant-a-1".into())
		);
	}

	#[tokio::test]
	async fn write_through_failures_are_not_cached() {
		let cache = <CredentialCache<Scripted>>::new(Scripted::default(), Arc::new(ReadOnlyStore));
		let err = cache.get_token("tenant-a").await.expect_err("Write-through should fail.");

		assert!(matches!(err, Error::Storage(_)));
		assert!(cache.is_empty());

		let err = cache.get_token("tenant-a").await.expect_err("Retry should fetch again.");

		assert!(matches!(err, Error::Storage(_)));
		assert_eq!(cache.fetcher.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn failed_expiry_writes_restore_the_previous_token() {
		struct ExpiryRejecting(MemoryStore);
		impl KeyValueStore for ExpiryRejecting {
			fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
				self.0.get(key)
			}

			fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
				if key.starts_with("access_expiry_") {
					return Err(StoreError::Backend { message: "disk full".into() });
				}

				self.0.set(key, value)
			}

			fn remove(&self, key: &str) -> Result<bool, StoreError> {
				self.0.remove(key)
			}

			fn keys(&self) -> Result<Vec<String>, StoreError> {
				self.0.keys()
			}
		}

		let inner = MemoryStore::default();

		inner.set("access_token_tenant-a", "old").expect("Seeding should succeed.");
		inner.set("access_expiry_tenant-a", "123").expect("Seeding should succeed.");

		let cache = <CredentialCache<Scripted>>::new(
			Scripted::default(),
			Arc::new(ExpiryRejecting(inner.clone())),
		);
		let err = cache.get_token("tenant-a").await.expect_err("Expiry write should fail.");

		assert_eq!(err.to_string(), "Backend failure: disk full.");
		assert_eq!(
			inner.get("access_token_tenant-a").expect("Store read should succeed."),
			Some("old".into())
		);
		assert_eq!(
			inner.get("access_expiry_tenant-a").expect("Store read should succeed."),
			Some("123".into())
		);
		assert!(cache.is_empty());

		let err = cache.get_token("tenant-b").await.expect_err("Expiry write should fail.");

		assert!(matches!(err, Error::Storage(_)));
		assert_eq!(inner.get("access_token_tenant-b").expect("Store read should succeed."), None);
	}

	#[tokio::test]
	async fn empty_tokens_are_rejected() {
		struct Empty;
		impl TokenFetcher for Empty {
			fn fetch<'a>(&'a self, _domain: &'a DomainId) -> FetchFuture<'a> {
				Box::pin(async { Ok(FetchedToken::new("", OffsetDateTime::UNIX_EPOCH)) })
			}
		}

		let cache = <CredentialCache<Empty>>::new(Empty, Arc::new(MemoryStore::default()));
		let err = cache.get_token("tenant-a").await.expect_err("Empty tokens should fail.");

		assert!(matches!(err.as_fetch_error(), Some(FetchError::MalformedResponse { .. })));
	}
}
