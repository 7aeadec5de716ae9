//! Command-stream (`.bin`) codec.
//!
//! # Layout
//!
//! ```text
//! [total_size][command_count][data_size]
//! [command_count x (tag: u32, data_offset: i32)]
//! [data buffer: one payload per command]
//! ```
//!
//! Only ADD commands are interpreted. See [`format`] for the tag bits and
//! context ids.

pub mod format;
mod reader;
mod writer;

use std::path::Path;

pub use reader::decode;
pub use writer::encode;

use crate::guid::HasherContext;
use crate::io::{write_file, FileBytes};
use crate::model::CommandStream;
use crate::options::{DecodeOptions, EncodeOptions};
use crate::util::{Decoded, Result};

/// Read and decode a command-stream file.
pub fn open(path: impl AsRef<Path>, hasher: &HasherContext, options: &DecodeOptions) -> Result<Decoded<CommandStream>> {
    let bytes = FileBytes::open(path)?;
    decode(bytes.as_slice(), hasher, options)
}

/// Encode a command stream and write it to a file.
pub fn save(path: impl AsRef<Path>, stream: &CommandStream, hasher: &HasherContext, options: &EncodeOptions) -> Result<()> {
    let bytes = encode(stream, hasher, options)?;
    write_file(path, &bytes)
}
