//! Single-flight bookkeeping: at most one pending fetch per domain.
//!
//! A flight is the boxed load future wrapped in `futures::future::Shared` and stored in
//! the flight map. Every caller that finds no valid record awaits its own clone of it, and
//! whichever clone is polled drives the one underlying fetch. A caller that goes away does
//! not cancel the fetch while another caller is still attached. The last attached caller
//! going away abandons the flight and removes it from the map. The map is locked only to
//! look up, insert, or remove a flight, never across an await.

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{DomainId, TokenRecord},
	cache::{CredentialCache, TokenRequest},
	fetch::TokenFetcher,
	obs::CacheOutcome,
};

/// Value published to every caller attached to a flight.
#[derive(Clone, Debug)]
pub(crate) struct Landing {
	pub(crate) record: TokenRecord,
	pub(crate) outcome: CacheOutcome,
}

pub(crate) type Flight = Shared<BoxFuture<'static, Result<Landing>>>;
pub(crate) type FlightMap = Mutex<Flights>;

/// Pending flights keyed by domain. Ids tell a flight apart from a later one for the
/// same domain.
#[derive(Default)]
pub(crate) struct Flights {
	next_id: u64,
	entries: HashMap<DomainId, FlightEntry>,
}
impl Flights {
	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

struct FlightEntry {
	id: u64,
	flight: Flight,
}

/// A caller's attachment to a flight.
///
/// Dropping a ticket before the flight lands removes the flight from the map when no other
/// caller holds it; the underlying fetch is dropped along with the last handle.
pub(crate) struct Ticket {
	flights: Arc<FlightMap>,
	domain: DomainId,
	id: u64,
	flight: Flight,
}
impl Ticket {
	/// Waits for the flight to land.
	pub(crate) async fn wait(&mut self) -> Result<Landing> {
		(&mut self.flight).await
	}
}
impl Drop for Ticket {
	fn drop(&mut self) {
		let mut flights = self.flights.lock();
		let current = flights.entries.get(&self.domain).is_some_and(|entry| entry.id == self.id);

		// One handle in the map plus this one: nobody else is waiting. A landed flight
		// reports `None` and was already unregistered.
		if current && self.flight.strong_count() == Some(2) {
			flights.entries.remove(&self.domain);
		}
	}
}

/// Decision taken under the flight lock.
pub(crate) enum Lookup {
	/// A valid record satisfies the request.
	Hit(TokenRecord),
	/// Another caller already started a fetch for the domain.
	Join(Ticket),
	/// This caller registered a new flight.
	Lead(Ticket),
}

impl<F> CredentialCache<F>
where
	F: 'static + ?Sized + TokenFetcher,
{
	pub(crate) fn valid_record(
		&self,
		request: &TokenRequest,
		now: OffsetDateTime,
	) -> Option<TokenRecord> {
		self.records.read().get(&request.domain).filter(|record| request.accepts(record, now)).cloned()
	}

	/// Performs the check-then-act step atomically with respect to the domain.
	///
	/// Lock order is flights, then records; nothing takes them the other way round.
	pub(crate) fn lookup(&self, request: &TokenRequest, now: OffsetDateTime) -> Lookup {
		if let Some(record) = self.valid_record(request, now) {
			return Lookup::Hit(record);
		}

		let mut flights = self.flights.lock();

		if let Some(entry) = flights.entries.get(&request.domain) {
			return Lookup::Join(self.ticket(&request.domain, entry.id, entry.flight.clone()));
		}
		// A flight may have landed between the optimistic read and taking the lock.
		if let Some(record) = self.valid_record(request, now) {
			return Lookup::Hit(record);
		}

		let id = flights.next_id;

		flights.next_id += 1;

		let flight = self.clone().fly(request.clone(), id).boxed().shared();

		flights.entries.insert(request.domain.clone(), FlightEntry { id, flight: flight.clone() });

		Lookup::Lead(self.ticket(&request.domain, id, flight))
	}

	fn ticket(&self, domain: &DomainId, id: u64, flight: Flight) -> Ticket {
		Ticket { flights: self.flights.clone(), domain: domain.clone(), id, flight }
	}

	/// Unregisters flight `id` if it is still the domain's current flight.
	pub(crate) fn land(&self, domain: &DomainId, id: u64) {
		let mut flights = self.flights.lock();

		if flights.entries.get(domain).is_some_and(|entry| entry.id == id) {
			flights.entries.remove(domain);
		}
	}
}
impl<F> CredentialCache<F>
where
	F: ?Sized + TokenFetcher,
{
	/// Returns `true` while a fetch for `domain` is pending.
	pub fn in_flight(&self, domain: &DomainId) -> bool {
		self.flights.lock().entries.contains_key(domain)
	}
}
