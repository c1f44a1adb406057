//! Domain identifiers, token secrets, and cached token records.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{claims::*, record::*, secret::*};
