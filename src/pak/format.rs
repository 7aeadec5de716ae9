//! Archive format constants and fixed-size records.
//!
//! Every offset stored in the archive is a word offset: multiply by 4 to
//! get a byte position.

use crate::guid::ShortGuid;
use crate::io::{to_words, ByteReader, ByteWriter};
use crate::util::Result;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 28;

/// Offset of the parameter table pair in the header.
pub const PARAM_TABLE_OFFSET: usize = 12;

/// Offset of the composite table pair in the header.
pub const COMPOSITE_TABLE_OFFSET: usize = 20;

/// Number of `(offset, count)` pairs in a composite pointer record.
pub const BLOCK_COUNT: usize = 13;

/// Composite id, preamble, then the block pairs.
pub const POINTER_RECORD_SIZE: usize = 8 + BLOCK_COUNT * 8;

pub const LINK_SIZE: usize = 16;
pub const PARAM_REF_SIZE: usize = 8;
pub const ENTITY_LIST_STRIDE: usize = 12;
pub const ALIAS_HASH_STRIDE: usize = 8;
pub const VARIABLE_STRIDE: usize = 12;
pub const PROXY_STRIDE: usize = 20;
pub const FUNCTION_STRIDE: usize = 8;
pub const DATA_POINTER_STRIDE: usize = 4;

pub const ANIMATION_RECORD_SIZE: usize = 28;
pub const CONNECTION_RECORD_SIZE: usize = 28;
pub const KEY_GROUP_SIZE: usize = 24;

pub const SEQUENCE_RECORD_SIZE: usize = 20;
pub const SEQUENCE_ENTRY_SIZE: usize = 12;
pub const METHOD_ENTRY_SIZE: usize = 12;

/// Block slots of a composite pointer record, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum BlockSlot {
    CompositeHeader = 0,
    EntityConnections = 1,
    EntityParameters = 2,
    EntityOverrides = 3,
    EntityOverridesChecksum = 4,
    CompositeExposedParameters = 5,
    EntityProxies = 6,
    EntityFunctions = 7,
    ResourceReferences = 8,
    CageAnimationData = 9,
    TriggerSequenceData = 10,
    Unused = 11,
    UnknownCounts = 12,
}

/// Slot holding `TriggerSequence` data. The slot names are swapped on disk.
pub const SEQUENCE_SLOT: BlockSlot = BlockSlot::CageAnimationData;

/// Slot holding `CAGEAnimation` data.
pub const ANIMATION_SLOT: BlockSlot = BlockSlot::TriggerSequenceData;

/// The 28-byte file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub root: ShortGuid,
    pub global: ShortGuid,
    pub pause_menu: ShortGuid,
    pub param_table: usize,
    pub param_count: usize,
    pub composite_table: usize,
    pub composite_count: usize,
}

impl Header {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        r.ensure(HEADER_SIZE)?;
        let root = r.read_guid()?;
        let global = r.read_guid()?;
        let pause_menu = r.read_guid()?;
        let (param_table, param_count) = r.read_offset_pair()?;
        let (composite_table, composite_count) = r.read_offset_pair()?;
        Ok(Self { root, global, pause_menu, param_table, param_count, composite_table, composite_count })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_guid(self.root);
        w.write_guid(self.global);
        w.write_guid(self.pause_menu);
        w.write_offset_pair(self.param_table, self.param_count)?;
        w.write_offset_pair(self.composite_table, self.composite_count)
    }

    /// Overwrite the header at the start of `w`.
    pub fn patch(&self, w: &mut ByteWriter) -> Result<()> {
        w.patch_u32(0, self.root.to_u32())?;
        w.patch_u32(4, self.global.to_u32())?;
        w.patch_u32(8, self.pause_menu.to_u32())?;
        w.patch_u32(PARAM_TABLE_OFFSET, to_words(self.param_table)?)?;
        w.patch_u32(PARAM_TABLE_OFFSET + 4, self.param_count as u32)?;
        w.patch_u32(COMPOSITE_TABLE_OFFSET, to_words(self.composite_table)?)?;
        w.patch_u32(COMPOSITE_TABLE_OFFSET + 4, self.composite_count as u32)
    }

    /// Byte offset just past the composite table.
    pub fn payload_end(&self) -> usize {
        self.composite_table + self.composite_count * 4
    }
}

/// Composite pointer record: where each block of one composite lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerRecord {
    pub id: ShortGuid,
    pub preamble: u32,
    /// Raw `(word_offset, count)` per block slot.
    pub blocks: [(u32, u32); BLOCK_COUNT],
}

impl PointerRecord {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        r.ensure(POINTER_RECORD_SIZE)?;
        let id = r.read_guid()?;
        let preamble = r.read_u32()?;
        let mut blocks = [(0, 0); BLOCK_COUNT];
        for block in blocks.iter_mut() {
            *block = (r.read_u32()?, r.read_u32()?);
        }
        Ok(Self { id, preamble, blocks })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_guid(self.id);
        w.write_u32(self.preamble)?;
        for (offset, count) in self.blocks {
            w.write_u32(offset)?;
            w.write_u32(count)?;
        }
        Ok(())
    }

    /// Byte offset and record count of a block.
    #[inline]
    pub fn block(&self, slot: BlockSlot) -> (usize, usize) {
        let (words, count) = self.blocks[slot as usize];
        (words as usize * 4, count as usize)
    }

    #[inline]
    pub fn raw(&self, slot: BlockSlot) -> (u32, u32) {
        self.blocks[slot as usize]
    }

    #[inline]
    pub fn set_raw(&mut self, slot: BlockSlot, value: (u32, u32)) {
        self.blocks[slot as usize] = value;
    }
}
