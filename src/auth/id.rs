//! Domain identifiers used as cache keys.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Domain identifier cannot be empty.")]
	Empty,
}

/// Opaque tenant/domain identifier whose token is cached independently.
///
/// The format is not interpreted: the value is only used as a map key, as a suffix of
/// the persistent store keys, and as the argument forwarded to the fetcher.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainId(String);
impl DomainId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for DomainId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for DomainId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<DomainId> for String {
	fn from(value: DomainId) -> Self {
		value.0
	}
}
impl TryFrom<String> for DomainId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl TryFrom<&str> for DomainId {
	type Error = IdentifierError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl Borrow<str> for DomainId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for DomainId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Domain({})", self.0)
	}
}
impl Display for DomainId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for DomainId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}

	Ok(())
}
