//! Persistent key-value contract mirrored by the cache, plus built-in backends.
//!
//! The cache treats the store as a dumb mirror: it writes a domain's token and expiry
//! after every successful fetch and, when rehydration is enabled, reads them back
//! before going to the network. Keys are namespaced per domain (see
//! [`CacheConfig::token_key`](crate::config::CacheConfig::token_key)), so writes for
//! distinct domains never touch the same entry.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Synchronous string key-value store.
///
/// Implementations must serialize concurrent access to the same key; the cache may
/// call them from many tasks at once.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Removes `key`, returning `true` if it was present.
	fn remove(&self, key: &str) -> Result<bool, StoreError>;

	/// Lists every stored key.
	fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
