//! Shared fixtures for cache integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use async_lock::{RwLock, RwLockWriteGuardArc};
use parking_lot::Mutex;
use time::{OffsetDateTime, macros};
// self
use credential_cache::{
	CredentialCache,
	auth::DomainId,
	clock::ManualClock,
	error::FetchError,
	fetch::{FetchFuture, FetchedToken, TokenFetcher},
	store::MemoryStore,
};

/// Instant every test clock starts at.
pub const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);
/// Pause that lets spawned callers reach the pending flight.
pub const SETTLE: StdDuration = StdDuration::from_millis(20);

/// Fetcher that counts calls per domain, returns `<domain>-<n>` tokens, and can be held
/// at a gate or scripted to fail.
#[derive(Default)]
pub struct StubFetcher {
	calls: Mutex<HashMap<String, usize>>,
	failures: Mutex<VecDeque<FetchError>>,
	gate: Arc<RwLock<()>>,
}
impl StubFetcher {
	/// Blocks every fetch until the returned guard is dropped.
	pub fn hold(&self) -> RwLockWriteGuardArc<()> {
		self.gate.try_write_arc().expect("Fetcher gate should not be held twice.")
	}

	/// Makes the next fetch fail with `err`.
	pub fn fail_next(&self, err: FetchError) {
		self.failures.lock().push_back(err);
	}

	/// Number of fetches started for `domain`.
	pub fn calls(&self, domain: &str) -> usize {
		self.calls.lock().get(domain).copied().unwrap_or_default()
	}
}
impl TokenFetcher for StubFetcher {
	fn fetch<'a>(&'a self, domain: &'a DomainId) -> FetchFuture<'a> {
		let n = {
			let mut calls = self.calls.lock();
			let n = calls.entry(domain.to_string()).or_default();

			*n += 1;

			*n
		};

		Box::pin(async move {
			let _open = self.gate.read().await;

			match self.failures.lock().pop_front() {
				Some(err) => Err(err),
				None => Ok(FetchedToken::new(format!("{domain}-{n}"), OffsetDateTime::now_utc())),
			}
		})
	}
}

/// Cache over a fresh stub fetcher, memory store, and manual clock at [`T0`].
pub fn build_cache() -> (CredentialCache<StubFetcher>, MemoryStore, ManualClock) {
	let store = MemoryStore::default();
	let clock = ManualClock::new(T0);
	let cache = <CredentialCache<StubFetcher>>::new(StubFetcher::default(), Arc::new(store.clone()))
		.with_clock(Arc::new(clock.clone()));

	(cache, store, clock)
}

/// Parses a domain fixture.
pub fn domain(value: &str) -> DomainId {
	DomainId::new(value).expect("Domain fixture should be valid.")
}
