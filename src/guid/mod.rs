//! Identifier hashing.
//!
//! - [`ShortGuid`] - the 4-byte identifier
//! - [`HasherContext`] - cached, bidirectional string ↔ id table
//! - [`well_known`] - ids the codecs compare against

mod hasher;
mod identifier;
mod well_known;

pub use hasher::HasherContext;
pub use identifier::ShortGuid;
pub use well_known::{well_known, WellKnown};
