// self
use crate::obs::{CacheOp, CacheOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn record_outcome(op: CacheOp, outcome: CacheOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"credential_cache_lookup_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
}
