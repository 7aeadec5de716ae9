//! # Cathode
//!
//! Codec for the Commands entity graph: composites of typed entities wired
//! by parameter links, stored either as an offset-table archive
//! (`COMMANDS.PAK`) or as a flat command stream (`.bin`). Both formats
//! decode to the same [`model`].
//!
//! ## Modules
//!
//! - [`guid`] - ShortGuid identifiers and the string hasher
//! - [`model`] - Composites, entities, parameters, timeline data
//! - [`pak`] - Offset-table archive codec
//! - [`stream`] - Command-stream codec
//! - [`relink`] - Resource reference ownership
//! - [`io`] - Byte cursors and file helpers
//! - [`util`] - Errors and diagnostics
//!
//! ## Example
//!
//! ```ignore
//! use cathode::prelude::*;
//!
//! let hasher = HasherContext::new();
//! let decoded = cathode::pak::open("COMMANDS.PAK", &hasher, &DecodeOptions::default())?;
//! for diagnostic in &decoded.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! let bytes = cathode::pak::encode(&decoded.value, &hasher, &EncodeOptions::default())?;
//! ```

pub mod guid;
pub mod io;
pub mod model;
pub mod options;
pub mod pak;
pub mod relink;
pub mod stream;
pub mod util;

// Re-export commonly used types
pub use guid::{HasherContext, ShortGuid};
pub use options::{DecodeOptions, EncodeOptions};
pub use util::{Decoded, Diagnostic, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::guid::{well_known, HasherContext, ShortGuid};
    pub use crate::model::*;
    pub use crate::options::{DecodeOptions, EncodeOptions};
    pub use crate::util::{Decoded, Diagnostic, Error, Result};
}
