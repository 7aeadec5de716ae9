//! Bounds-checked little-endian reader over a shared byte buffer.
//!
//! Each decode task owns its own `ByteReader`; the underlying slice is
//! never mutated, so readers can be created freely inside rayon tasks.

use byteorder::{ByteOrder, LittleEndian};
use glam::{Vec2, Vec3};

use crate::guid::ShortGuid;
use crate::util::{Error, Result};

/// Read cursor over an immutable buffer.
#[derive(Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at a byte offset.
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(pos)?;
        Ok(reader)
    }

    /// Get the current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total buffer size.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// The whole underlying buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute byte position.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::OutOfBounds { offset: pos, len: 0, size: self.data.len() });
        }
        self.pos = pos;
        Ok(())
    }

    /// Move to a position given in 4-byte words.
    #[inline]
    pub fn seek_words(&mut self, words: u32) -> Result<()> {
        self.seek(words as usize * 4)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.pos += len;
        Ok(())
    }

    /// Check that `len` bytes are available at the current position.
    #[inline]
    pub fn ensure(&self, len: usize) -> Result<()> {
        match self.pos.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::OutOfBounds { offset: self.pos, len, size: self.data.len() }),
        }
    }

    /// Check that a table of `count` records of `stride` bytes fits at `offset`.
    pub fn ensure_table(&self, offset: usize, count: usize, stride: usize) -> Result<()> {
        let len = count
            .checked_mul(stride)
            .ok_or_else(|| Error::invalid(format!("table of {} x {} overflows", count, stride)))?;
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::OutOfBounds { offset, len, size: self.data.len() }),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_guid(&mut self) -> Result<ShortGuid> {
        let b = self.read_bytes(4)?;
        Ok(ShortGuid::from_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_vec2(&mut self) -> Result<Vec2> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        Ok(Vec2::new(x, y))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Vec3::new(x, y, z))
    }

    /// Read a `(word_offset, count)` pair and convert the offset to bytes.
    pub fn read_offset_pair(&mut self) -> Result<(usize, usize)> {
        let words = self.read_u32()?;
        let count = self.read_u32()?;
        Ok((words as usize * 4, count as usize))
    }

    /// Read a NUL-terminated UTF-8 string, consuming the terminator.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::invalid(format!("unterminated string at {}", self.pos)))?;
        let text = String::from_utf8(rest[..len].to_vec())?;
        self.pos += len + 1;
        Ok(text)
    }

    /// Advance to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.pos % alignment;
        if rem != 0 {
            self.skip(alignment - rem)?;
        }
        Ok(())
    }

    /// Read `count` identifiers starting at a byte offset, restoring position.
    pub fn guids_at(&self, offset: usize, count: usize) -> Result<Vec<ShortGuid>> {
        self.ensure_table(offset, count, 4)?;
        let mut sub = ByteReader { data: self.data, pos: offset };
        (0..count).map(|_| sub.read_guid()).collect()
    }
}
