//! Byte-level reading and writing shared by both codecs.

mod buffer;
mod cursor;
mod file;

pub use buffer::{to_words, ByteWriter};
pub use cursor::ByteReader;
pub use file::{write_file, FileBytes};
