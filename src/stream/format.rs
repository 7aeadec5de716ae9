//! Command-stream constants and tag packing.
//!
//! A command tag packs five fields into one u32:
//!
//! | bits  | field                                   |
//! |-------|-----------------------------------------|
//! | 0-15  | payload size in bytes                   |
//! | 16-23 | block id (context or data type)         |
//! | 24    | context flag                            |
//! | 25-26 | alignment (0=1, 1=2, 2=4, 3=8 bytes)    |
//! | 27-28 | apply (1 = ADD, 2 = REMOVE)             |

use std::sync::OnceLock;

use crate::guid::ShortGuid;

/// `total_size`, `command_count`, `data_size`.
pub const FILE_HEADER_SIZE: usize = 12;

/// One `(tag, data_offset)` command entry.
pub const COMMAND_ENTRY_SIZE: usize = 8;

/// Largest payload the 16-bit size field can describe.
pub const MAX_PAYLOAD_SIZE: usize = 0xFFFF;

/// Alignment of every payload written by the encoder.
pub const PAYLOAD_ALIGN: usize = 4;

const SIZE_MASK: u32 = 0xFFFF;
const BLOCK_SHIFT: u32 = 16;
const CONTEXT_BIT: u32 = 1 << 24;
const ALIGN_SHIFT: u32 = 25;
const APPLY_SHIFT: u32 = 27;

/// How a command is applied to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apply {
    Add,
    Remove,
    Other(u8),
}

impl Apply {
    fn bits(self) -> u32 {
        match self {
            Self::Add => 1,
            Self::Remove => 2,
            Self::Other(raw) => raw as u32 & 3,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => Self::Add,
            2 => Self::Remove,
            other => Self::Other(other as u8),
        }
    }
}

/// Unpacked command tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTag {
    pub size: u16,
    pub block: u8,
    pub context: bool,
    /// Alignment in bytes: 1, 2, 4 or 8.
    pub align: u8,
    pub apply: Apply,
}

impl CommandTag {
    /// Tag of an ADD command in a context block.
    pub fn context(context: Context, size: u16) -> Self {
        Self { size, block: context as u8, context: true, align: PAYLOAD_ALIGN as u8, apply: Apply::Add }
    }

    /// Tag nested in a parameter payload; the block id is the data type.
    pub fn data(block: u8, size: u16) -> Self {
        Self { size, block, context: false, align: PAYLOAD_ALIGN as u8, apply: Apply::Add }
    }

    pub fn pack(&self) -> u32 {
        let align_code: u32 = match self.align {
            8 => 3,
            4 => 2,
            2 => 1,
            _ => 0,
        };
        let context = if self.context { CONTEXT_BIT } else { 0 };
        (self.size as u32 & SIZE_MASK)
            | (self.block as u32) << BLOCK_SHIFT
            | context
            | align_code << ALIGN_SHIFT
            | self.apply.bits() << APPLY_SHIFT
    }

    pub fn unpack(raw: u32) -> Self {
        Self {
            size: (raw & SIZE_MASK) as u16,
            block: (raw >> BLOCK_SHIFT) as u8,
            context: raw & CONTEXT_BIT != 0,
            align: 1 << ((raw >> ALIGN_SHIFT) & 3),
            apply: Apply::from_bits(raw >> APPLY_SHIFT),
        }
    }
}

/// Context block ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Context {
    Template = 0,
    Root = 1,
    Entity = 2,
    Alias = 3,
    Proxy = 4,
    Connector = 5,
    Behaviour = 6,
    Parameter = 7,
    Link = 8,
    Resource = 9,
}

impl Context {
    pub fn from_block(block: u8) -> Option<Self> {
        Some(match block {
            0 => Self::Template,
            1 => Self::Root,
            2 => Self::Entity,
            3 => Self::Alias,
            4 => Self::Proxy,
            5 => Self::Connector,
            6 => Self::Behaviour,
            7 => Self::Parameter,
            8 => Self::Link,
            9 => Self::Resource,
            _ => return None,
        })
    }
}

/// Sub-record kinds carried by BEHAVIOUR commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviourRecord {
    Method,
    Sequence,
    Binding,
    FloatTrack,
    EventTrack,
}

const BEHAVIOUR_NAMES: [&str; 5] = ["METHOD", "SEQUENCE", "BINDING", "FLOAT_TRACK", "EVENT_TRACK"];
const BEHAVIOURS: [BehaviourRecord; 5] = [
    BehaviourRecord::Method,
    BehaviourRecord::Sequence,
    BehaviourRecord::Binding,
    BehaviourRecord::FloatTrack,
    BehaviourRecord::EventTrack,
];

fn behaviour_tags() -> &'static [ShortGuid; 5] {
    static TAGS: OnceLock<[ShortGuid; 5]> = OnceLock::new();
    TAGS.get_or_init(|| BEHAVIOUR_NAMES.map(ShortGuid::from_text))
}

impl BehaviourRecord {
    pub fn tag(self) -> ShortGuid {
        let i = BEHAVIOURS.iter().position(|b| *b == self).unwrap_or(0);
        behaviour_tags()[i]
    }

    pub fn from_tag(tag: ShortGuid) -> Option<Self> {
        behaviour_tags().iter().position(|t| *t == tag).map(|i| BEHAVIOURS[i])
    }

    /// True for records owned by animation functions.
    pub fn is_animation(self) -> bool {
        matches!(self, Self::Binding | Self::FloatTrack | Self::EventTrack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_bit_layout() {
        let tag = CommandTag::context(Context::Parameter, 0x1234);
        let raw = tag.pack();
        assert_eq!(raw & 0xFFFF, 0x1234);
        assert_eq!((raw >> 16) & 0xFF, 7);
        assert_ne!(raw & (1 << 24), 0);
        assert_eq!((raw >> 25) & 3, 2);
        assert_eq!((raw >> 27) & 3, 1);
        assert_eq!(CommandTag::unpack(raw), tag);
    }

    #[test]
    fn test_data_tag_has_no_context_flag() {
        let raw = CommandTag::data(9, 48).pack();
        let tag = CommandTag::unpack(raw);
        assert!(!tag.context);
        assert_eq!(tag.block, 9);
        assert_eq!(tag.size, 48);
    }

    #[test]
    fn test_remove_and_alignment_decode() {
        let raw = (2 << 27) | (3 << 25) | (1 << 24) | (2 << 16);
        let tag = CommandTag::unpack(raw);
        assert_eq!(tag.apply, Apply::Remove);
        assert_eq!(tag.align, 8);
        assert_eq!(Context::from_block(tag.block), Some(Context::Entity));
        assert_eq!(Context::from_block(42), None);
    }

    #[test]
    fn test_behaviour_tags() {
        for record in BEHAVIOURS {
            assert_eq!(BehaviourRecord::from_tag(record.tag()), Some(record));
        }
        assert_eq!(BehaviourRecord::from_tag(ShortGuid::ZERO), None);
        assert!(BehaviourRecord::Binding.is_animation());
        assert!(!BehaviourRecord::Method.is_animation());
    }
}
