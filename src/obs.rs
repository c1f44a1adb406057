//! Optional observability helpers for cache operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to run every operation inside a span named
//!   `credential_cache.op` with `op`, `stage`, and `domain` fields, and to emit events for
//!   lookup decisions.
//! - Enable `metrics` to increment the `credential_cache_lookup_total` counter for every
//!   outcome, labeled by `op` + `outcome`.

mod metrics;

pub use metrics::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the `tracing` feature is enabled; expands to nothing
/// otherwise.
macro_rules! trace_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	};
}
pub(crate) use trace_event;

/// Operations observed by the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOp {
	/// Token lookup (`get_token` / `token`).
	GetToken,
	/// Explicit removal of cached state.
	Clear,
}
impl CacheOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheOp::GetToken => "get_token",
			CacheOp::Clear => "clear",
		}
	}
}
impl Display for CacheOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
	/// A valid in-memory record was returned without I/O.
	Hit,
	/// The caller attached to a fetch already in flight.
	Joined,
	/// A still-valid record was restored from the persistent store.
	Rehydrated,
	/// The fetcher produced a fresh record.
	Fetched,
	/// Cached state was removed.
	Cleared,
	/// Failure propagated back to the caller.
	Failure,
}
impl CacheOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheOutcome::Hit => "hit",
			CacheOutcome::Joined => "joined",
			CacheOutcome::Rehydrated => "rehydrated",
			CacheOutcome::Fetched => "fetched",
			CacheOutcome::Cleared => "cleared",
			CacheOutcome::Failure => "failure",
		}
	}
}
impl Display for CacheOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Span covering one cache operation; an empty value without the `tracing` feature.
#[derive(Clone, Debug)]
pub struct CacheSpan {
	#[cfg(feature = "tracing")]
	span: ::tracing::Span,
}
impl CacheSpan {
	/// Opens a `credential_cache.op` span for `op` at call site `stage` on `domain`.
	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	pub fn new(op: CacheOp, stage: &'static str, domain: &str) -> Self {
		Self {
			#[cfg(feature = "tracing")]
			span: ::tracing::info_span!("credential_cache.op", op = op.as_str(), stage, domain),
		}
	}

	/// Enters the span until the returned guard is dropped. Only for synchronous sections.
	pub fn entered(self) -> EnteredCacheSpan {
		EnteredCacheSpan {
			#[cfg(feature = "tracing")]
			_guard: self.span.entered(),
		}
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> impl Future<Output = Fut::Output> + use<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			::tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Guard returned by [`CacheSpan::entered`].
#[derive(Debug)]
pub struct EnteredCacheSpan {
	#[cfg(feature = "tracing")]
	_guard: ::tracing::span::EnteredSpan,
}
