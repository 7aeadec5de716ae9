//! Offset-table archive (`COMMANDS.PAK`) codec.
//!
//! # Layout
//!
//! ```text
//! [header: root, global, pause_menu, (param table), (composite table)]
//! [parameter pool: tag + payload, 4-aligned, deduplicated]
//! [per composite: block data, then its pointer record]
//! [parameter table][composite table]
//! [trailer: carried through unchanged]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cathode::prelude::*;
//!
//! let hasher = HasherContext::new();
//! let decoded = cathode::pak::open("COMMANDS.PAK", &hasher, &DecodeOptions::default())?;
//! for composite in &decoded.value.composites {
//!     println!("{} {}", composite.id, composite.name);
//! }
//! ```

pub mod format;
mod reader;
mod writer;

use std::path::Path;

pub use reader::decode;
pub use writer::encode;

use crate::guid::HasherContext;
use crate::io::{write_file, FileBytes};
use crate::model::Commands;
use crate::options::{DecodeOptions, EncodeOptions};
use crate::util::{Decoded, Result};

/// Read and decode an archive file.
pub fn open(path: impl AsRef<Path>, hasher: &HasherContext, options: &DecodeOptions) -> Result<Decoded<Commands>> {
    let bytes = FileBytes::open(path)?;
    decode(bytes.as_slice(), hasher, options)
}

/// Encode an archive and write it to a file.
pub fn save(path: impl AsRef<Path>, commands: &Commands, hasher: &HasherContext, options: &EncodeOptions) -> Result<()> {
    let bytes = encode(commands, hasher, options)?;
    write_file(path, &bytes)
}
