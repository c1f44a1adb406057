//! Credential cache facade: construction, inspection, and explicit clearing.
//!
//! Lookups live in [`lookup`], the single-flight bookkeeping in [`flight`], and the
//! request type in [`request`].

pub mod metrics;
pub mod request;

mod flight;
mod lookup;

pub use metrics::CacheMetrics;
pub use request::TokenRequest;

// self
use crate::{
	_prelude::*,
	auth::{DomainId, TokenRecord},
	cache::flight::FlightMap,
	clock::{Clock, SystemClock},
	config::CacheConfig,
	fetch::TokenFetcher,
	obs::{self, CacheOp, CacheOutcome, CacheSpan},
	store::KeyValueStore,
};

/// Process-local map from domain to a valid access token.
///
/// The cache owns its record and in-flight maps; the store is a non-owning mirror and
/// the fetcher is an injected collaborator. Construct one instance per process (or
/// logical session) and share it by reference or through [`Clone`], which hands out
/// another handle to the same state.
pub struct CredentialCache<F>
where
	F: ?Sized + TokenFetcher,
{
	/// Collaborator that performs the network exchange.
	pub fetcher: Arc<F>,
	/// Persistent mirror written after every successful fetch.
	pub store: Arc<dyn KeyValueStore>,
	/// Time source used for issuance and expiry checks.
	pub clock: Arc<dyn Clock>,
	/// Shared counters for lookup outcomes.
	pub metrics: Arc<CacheMetrics>,
	config: CacheConfig,
	records: Arc<RwLock<HashMap<DomainId, TokenRecord>>>,
	flights: Arc<FlightMap>,
}
impl<F> CredentialCache<F>
where
	F: ?Sized + TokenFetcher,
{
	/// Creates a cache with the system clock and default configuration.
	pub fn new(fetcher: impl Into<Arc<F>>, store: Arc<dyn KeyValueStore>) -> Self {
		Self {
			fetcher: fetcher.into(),
			store,
			clock: Arc::new(SystemClock::default()),
			metrics: Default::default(),
			config: CacheConfig::default(),
			records: Default::default(),
			flights: Default::default(),
		}
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the configuration after validating it.
	pub fn with_config(mut self, config: CacheConfig) -> Result<Self> {
		config.validate()?;

		self.config = config;

		Ok(self)
	}

	/// Active configuration.
	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	/// Returns the in-memory record for `domain` without checking validity.
	pub fn cached(&self, domain: &DomainId) -> Option<TokenRecord> {
		self.records.read().get(domain).cloned()
	}

	/// Number of domains with an in-memory record, valid or not.
	pub fn len(&self) -> usize {
		self.records.read().len()
	}

	/// Returns `true` if no domain has an in-memory record.
	pub fn is_empty(&self) -> bool {
		self.records.read().is_empty()
	}

	/// Drops the cached record for `domain` and its persistent keys.
	///
	/// A fetch already in flight for the domain is not cancelled and will repopulate the
	/// cache when it lands. Returns `true` if anything was removed.
	pub fn clear(&self, domain: &DomainId) -> Result<bool> {
		let _span = CacheSpan::new(CacheOp::Clear, "clear", domain).entered();
		let in_memory = self.records.write().remove(domain).is_some();
		let token = self.store.remove(&self.config.token_key(domain))?;
		let expiry = self.store.remove(&self.config.expiry_key(domain))?;

		obs::record_outcome(CacheOp::Clear, CacheOutcome::Cleared);
		obs::trace_event!(debug, domain = %domain, in_memory, "cleared cached token");

		Ok(in_memory || token || expiry)
	}

	/// Drops every cached record and every store key in the cache's key layout.
	pub fn clear_all(&self) -> Result<()> {
		let _span = CacheSpan::new(CacheOp::Clear, "clear_all", "*").entered();

		self.records.write().clear();

		for key in self.store.keys()?.into_iter().filter(|key| self.config.owns_key(key)) {
			self.store.remove(&key)?;
		}

		obs::record_outcome(CacheOp::Clear, CacheOutcome::Cleared);

		Ok(())
	}
}
impl<F> Clone for CredentialCache<F>
where
	F: ?Sized + TokenFetcher,
{
	fn clone(&self) -> Self {
		Self {
			fetcher: self.fetcher.clone(),
			store: self.store.clone(),
			clock: self.clock.clone(),
			metrics: self.metrics.clone(),
			config: self.config.clone(),
			records: self.records.clone(),
			flights: self.flights.clone(),
		}
	}
}
impl<F> Debug for CredentialCache<F>
where
	F: ?Sized + TokenFetcher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialCache")
			.field("config", &self.config)
			.field("records", &self.records.read().len())
			.field("in_flight", &self.flights.lock().len())
			.finish()
	}
}
