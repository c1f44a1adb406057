//! Time sources used for expiry checks.

// self
use crate::_prelude::*;

/// Supplies the current instant for expiry comparisons.
///
/// Implementations must be non-decreasing within a process lifetime.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock that never reports an instant earlier than one it already returned.
#[derive(Debug)]
pub struct SystemClock {
	high_water: Mutex<OffsetDateTime>,
}
impl Default for SystemClock {
	fn default() -> Self {
		Self { high_water: Mutex::new(OffsetDateTime::UNIX_EPOCH) }
	}
}
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		let mut high_water = self.high_water.lock();
		let now = OffsetDateTime::now_utc().max(*high_water);

		*high_water = now;

		now
	}
}

/// Deterministic clock that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward by `delta`. Negative deltas are ignored.
	pub fn advance(&self, delta: Duration) {
		if delta.is_negative() {
			return;
		}

		*self.0.lock() += delta;
	}

	/// Jumps to `instant` if it is not earlier than the current reading.
	pub fn set(&self, instant: OffsetDateTime) {
		let mut current = self.0.lock();

		if instant > *current {
			*current = instant;
		}
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn system_clock_is_non_decreasing() {
		let clock = SystemClock::default();
		let first = clock.now();
		let second = clock.now();

		assert!(second >= first);
	}

	#[test]
	fn manual_clock_moves_forward_only() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));

		clock.advance(Duration::hours(2));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 02:00 UTC));

		clock.advance(Duration::hours(-1));
		clock.set(macros::datetime!(2025-01-01 01:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 02:00 UTC));

		clock.set(macros::datetime!(2025-01-01 03:01 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 03:01 UTC));
	}

	#[test]
	fn manual_clock_clones_share_state() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let handle = clock.clone();

		handle.advance(Duration::minutes(5));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:05 UTC));
	}
}
