//! Parameter data types and their wire tags.

use std::fmt;
use std::sync::OnceLock;

use crate::guid::ShortGuid;

/// Type tag of a parameter value or exposed variable.
///
/// The archive identifies a type by the hash of its upper-case name, the
/// command stream by an 8-bit block id. `Unknown` keeps whichever raw tag
/// was read so that it can be written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Transform,
    Integer,
    String,
    Bool,
    Float,
    Resource,
    Vector,
    Enum,
    Spline,
    NoType,
    /// Unrecognised tag: archive tag id as LE u32, or stream block id.
    Unknown(u32),
}

/// Every known type, in command-stream block id order.
const KNOWN: [DataType; 10] = [
    DataType::NoType,
    DataType::Transform,
    DataType::Integer,
    DataType::String,
    DataType::Bool,
    DataType::Float,
    DataType::Resource,
    DataType::Vector,
    DataType::Enum,
    DataType::Spline,
];

fn archive_tags() -> &'static [(ShortGuid, DataType); 10] {
    static TAGS: OnceLock<[(ShortGuid, DataType); 10]> = OnceLock::new();
    TAGS.get_or_init(|| KNOWN.map(|t| (ShortGuid::from_text(t.name()), t)))
}

impl DataType {
    /// Upper-case name, hashed to form the archive tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transform => "TRANSFORM",
            Self::Integer => "INTEGER",
            Self::String => "STRING",
            Self::Bool => "BOOL",
            Self::Float => "FLOAT",
            Self::Resource => "RESOURCE",
            Self::Vector => "VECTOR",
            Self::Enum => "ENUM",
            Self::Spline => "SPLINE",
            Self::NoType => "NO_TYPE",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Tag id written in front of archive values.
    pub fn archive_tag(&self) -> ShortGuid {
        match self {
            Self::Unknown(raw) => ShortGuid::from_u32(*raw),
            known => archive_tags()
                .iter()
                .find(|(_, t)| t == known)
                .map(|(id, _)| *id)
                .unwrap_or(ShortGuid::ZERO),
        }
    }

    pub fn from_archive_tag(tag: ShortGuid) -> Self {
        archive_tags()
            .iter()
            .find(|(id, _)| *id == tag)
            .map(|(_, t)| *t)
            .unwrap_or(Self::Unknown(tag.to_u32()))
    }

    /// Data block id used in command-stream tags.
    pub fn stream_block(&self) -> u8 {
        match self {
            Self::Unknown(raw) => *raw as u8,
            known => KNOWN.iter().position(|t| t == known).unwrap_or(0) as u8,
        }
    }

    /// Full-width stream type id, as stored in BINDING records. Unknown
    /// types keep every bit.
    pub fn stream_id(&self) -> u32 {
        match self {
            Self::Unknown(raw) => *raw,
            known => known.stream_block() as u32,
        }
    }

    pub fn from_stream_block(block: u8) -> Self {
        KNOWN
            .get(block as usize)
            .copied()
            .unwrap_or(Self::Unknown(block as u32))
    }
}

impl Default for DataType {
    fn default() -> Self {
        Self::NoType
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "UNKNOWN({:#x})", raw),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_tags_roundtrip() {
        for t in KNOWN {
            assert_eq!(DataType::from_archive_tag(t.archive_tag()), t);
        }
        assert_eq!(
            DataType::Spline.archive_tag(),
            ShortGuid::from_text("SPLINE")
        );
    }

    #[test]
    fn test_unknown_archive_tag_preserved() {
        let raw = ShortGuid::from_bytes([9, 9, 9, 9]);
        let t = DataType::from_archive_tag(raw);
        assert_eq!(t, DataType::Unknown(raw.to_u32()));
        assert_eq!(t.archive_tag(), raw);
        assert!(!t.is_known());
    }

    #[test]
    fn test_stream_blocks() {
        assert_eq!(DataType::Transform.stream_block(), 1);
        assert_eq!(DataType::Spline.stream_block(), 9);
        assert_eq!(DataType::from_stream_block(4), DataType::Bool);
        assert_eq!(DataType::from_stream_block(77), DataType::Unknown(77));
        assert_eq!(DataType::Unknown(77).stream_block(), 77);
        assert_eq!(DataType::Spline.stream_id(), 9);
        assert_eq!(DataType::Unknown(0x1234).stream_id(), 0x1234);
    }
}
