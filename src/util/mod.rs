//! Utility types shared by both codecs.
//!
//! - [`Error`] / [`Result`] - Fatal error handling
//! - [`Diagnostic`] / [`Decoded`] - Non-fatal findings reported to callers
//! - [`map_slots`] - Optional rayon map into position-indexed slots

mod diagnostic;
mod error;
mod parallel;

pub use diagnostic::*;
pub use error::*;
pub use parallel::map_slots;
