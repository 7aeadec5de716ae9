//! The 4-byte identifier type.

use std::cmp::Ordering;
use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

/// Deterministic 4-byte identifier derived from a string.
///
/// Equality is byte-wise. Ordering follows the little-endian u32 value,
/// which is the order the tool chain sorts composites and entities in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShortGuid([u8; 4]);

impl ShortGuid {
    /// The all-zero identifier, used as "absent".
    pub const ZERO: ShortGuid = ShortGuid([0; 4]);

    /// The all-ones identifier written into unused id slots.
    pub const NONE: ShortGuid = ShortGuid([0xFF; 4]);

    /// Size on the wire.
    pub const SIZE: usize = ::short_guid::SHORT_GUID_LEN;

    #[inline]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn from_u32(value: u32) -> Self {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        Self(bytes)
    }

    /// Hash `text` without touching any cache.
    #[inline]
    pub fn from_text(text: &str) -> Self {
        Self(::short_guid::hash(text))
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }

    /// Little-endian numeric value.
    #[inline]
    pub fn to_u32(self) -> u32 {
        LittleEndian::read_u32(&self.0)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }
}

impl PartialOrd for ShortGuid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ShortGuid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_u32().cmp(&other.to_u32())
    }
}

impl From<[u8; 4]> for ShortGuid {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ShortGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{:02X}-{:02X}-{:02X}-{:02X}", a, b, c, d)
    }
}

impl fmt::Debug for ShortGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortGuid({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_little_endian() {
        let low = ShortGuid::from_bytes([0xFF, 0, 0, 0]);
        let high = ShortGuid::from_bytes([0, 0, 0, 1]);
        assert!(low < high);
        assert_eq!(high.to_u32(), 0x0100_0000);
    }

    #[test]
    fn test_u32_roundtrip() {
        let id = ShortGuid::from_u32(0xDEADBEEF);
        assert_eq!(id.as_bytes(), &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(id.to_u32(), 0xDEADBEEF);
    }

    #[test]
    fn test_display() {
        let id = ShortGuid::from_bytes([0x0A, 0xBC, 0x01, 0xFF]);
        assert_eq!(id.to_string(), "0A-BC-01-FF");
        assert!(ShortGuid::ZERO.is_zero());
        assert!(!ShortGuid::NONE.is_zero());
    }
}
