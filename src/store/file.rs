//! File-backed [`KeyValueStore`] that survives process restarts.

// std
use std::{
	fs,
	io::{Error as IoError, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError},
};

type Entries = HashMap<String, String>;

/// Mirrors every entry into a single JSON object on disk.
///
/// Each mutation rewrites the file through a sibling `.tmp` file followed by a rename, so
/// readers never observe a half-written snapshot. If the write fails the mutation is
/// rolled back in memory and the error is returned.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	entries: Arc<RwLock<Entries>>,
}
impl FileStore {
	/// Opens the snapshot at `path`, creating parent directories as needed.
	///
	/// A missing or blank file yields an empty store; anything else must be a JSON object
	/// of strings.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		create_parent(&path)?;

		let entries = read_entries(&path)?;

		Ok(Self { path, entries: Arc::new(RwLock::new(entries)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn flush(&self, entries: &Entries) -> Result<(), StoreError> {
		let json = serde_json::to_vec_pretty(entries)
			.map_err(|e| StoreError::Serialization { message: format!("Snapshot encoding failed: {e}") })?;
		let staging = self.path.with_extension("tmp");

		create_parent(&self.path)?;

		let mut file = fs::File::create(&staging).map_err(|e| io_failure("create", &staging, e))?;

		file.write_all(&json).map_err(|e| io_failure("write", &staging, e))?;
		file.sync_all().map_err(|e| io_failure("sync", &staging, e))?;
		drop(file);

		fs::rename(&staging, &self.path).map_err(|e| io_failure("replace", &self.path, e))
	}
}
impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.entries.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut entries = self.entries.write();
		let previous = entries.insert(key.to_owned(), value.to_owned());

		self.flush(&entries).inspect_err(|_| match previous {
			Some(previous) => {
				entries.insert(key.to_owned(), previous);
			},
			None => {
				entries.remove(key);
			},
		})
	}

	fn remove(&self, key: &str) -> Result<bool, StoreError> {
		let mut entries = self.entries.write();
		let Some(previous) = entries.remove(key) else {
			return Ok(false);
		};

		if let Err(e) = self.flush(&entries) {
			entries.insert(key.to_owned(), previous);

			return Err(e);
		}

		Ok(true)
	}

	fn keys(&self) -> Result<Vec<String>, StoreError> {
		Ok(self.entries.read().keys().cloned().collect())
	}
}

fn read_entries(path: &Path) -> Result<Entries, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
		Err(e) => return Err(io_failure("read", path, e)),
	};

	if bytes.trim_ascii().is_empty() {
		return Ok(Entries::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Snapshot {} is not a JSON object of strings: {e}", path.display()),
	})
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
	match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() =>
			fs::create_dir_all(dir).map_err(|e| io_failure("create directory", dir, e)),
		_ => Ok(()),
	}
}

fn io_failure(action: &str, path: &Path, e: IoError) -> StoreError {
	StoreError::Backend { message: format!("Could not {action} {}: {e}", path.display()) }
}
