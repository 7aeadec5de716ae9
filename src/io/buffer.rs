//! In-memory output buffer for encoding.
//!
//! Encoding is a single forward pass over one `ByteWriter`; referenced
//! content is written before the record that points at it, so offsets are
//! always known by the time they are written. Only header fields are
//! backpatched.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use glam::{Vec2, Vec3};

use crate::guid::ShortGuid;
use crate::util::{Error, Result};

/// Growable little-endian output buffer.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_guid(&mut self, id: ShortGuid) {
        self.buf.extend_from_slice(id.as_bytes());
    }

    pub fn write_vec2(&mut self, v: Vec2) -> Result<()> {
        self.write_f32(v.x)?;
        self.write_f32(v.y)
    }

    pub fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32(v.x)?;
        self.write_f32(v.y)?;
        self.write_f32(v.z)
    }

    /// Write a `(word_offset, count)` pair from a byte offset.
    pub fn write_offset_pair(&mut self, byte_offset: usize, count: usize) -> Result<()> {
        self.write_u32(to_words(byte_offset)?)?;
        self.write_u32(count as u32)
    }

    /// Write UTF-8 text plus a NUL terminator.
    pub fn write_cstring(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(0);
    }

    /// Pad with zeros up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let rem = self.buf.len() % alignment;
        if rem != 0 {
            self.buf.resize(self.buf.len() + alignment - rem, 0);
        }
    }

    /// Overwrite a u32 at an earlier position.
    pub fn patch_u32(&mut self, at: usize, value: u32) -> Result<()> {
        let slot = self
            .buf
            .get_mut(at..at + 4)
            .ok_or_else(|| Error::other(format!("patch position {} past end", at)))?;
        LittleEndian::write_u32(slot, value);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Convert a byte offset to a word offset.
pub fn to_words(byte_offset: usize) -> Result<u32> {
    if byte_offset % 4 != 0 {
        return Err(Error::other(format!("offset {} is not word aligned", byte_offset)));
    }
    u32::try_from(byte_offset / 4).map_err(|_| Error::other("offset exceeds u32 range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_and_patch() {
        let mut w = ByteWriter::new();
        w.write_u32(0).unwrap();
        w.write_cstring("ab");
        assert_eq!(w.pos(), 7);
        w.align(4);
        assert_eq!(w.pos(), 8);
        w.patch_u32(0, 0xAABBCCDD).unwrap();
        assert_eq!(&w.as_slice()[0..4], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert!(w.patch_u32(6, 1).is_err());
    }

    #[test]
    fn test_word_offsets() {
        assert_eq!(to_words(12).unwrap(), 3);
        assert!(to_words(13).is_err());

        let mut w = ByteWriter::new();
        w.write_offset_pair(40, 2).unwrap();
        assert_eq!(w.as_slice(), &[10, 0, 0, 0, 2, 0, 0, 0]);
    }
}
