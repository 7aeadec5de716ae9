//! ShortGuid hash.
//!
//! Every name in a Commands archive (composites, entities, parameters,
//! data types, resource kinds) is stored as a 4-byte identifier derived
//! from its string form. The derivation is a two-round SHA-1:
//!
//! 1. SHA-1 of the UTF-8 bytes of the text.
//! 2. The first 16 digest bytes are byte-swapped in 4-byte groups.
//! 3. SHA-1 of the lower-case hex spelling of those 16 bytes.
//! 4. The identifier is the first 4 bytes of the second digest.

use sha1::{Digest, Sha1};

/// Size of a ShortGuid in bytes.
pub const SHORT_GUID_LEN: usize = 4;

/// Byte order applied to the first-round digest before rehashing.
const SWIZZLE: [usize; 16] = [3, 2, 1, 0, 7, 6, 5, 4, 11, 10, 9, 8, 15, 14, 13, 12];

/// Rearrange the first 16 bytes of a SHA-1 digest in 4-byte groups.
#[inline]
pub fn swizzle(digest: &[u8; 20]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (dst, &src) in out.iter_mut().zip(SWIZZLE.iter()) {
        *dst = digest[src];
    }
    out
}

/// First hash round: SHA-1 of the raw UTF-8 bytes.
#[inline]
pub fn first_round(text: &str) -> [u8; 20] {
    Sha1::digest(text.as_bytes()).into()
}

/// Compute the 4-byte identifier for `text`.
pub fn hash(text: &str) -> [u8; SHORT_GUID_LEN] {
    let rearranged = swizzle(&first_round(text));
    let hex = hex::encode(rearranged);
    let second: [u8; 20] = Sha1::digest(hex.as_bytes()).into();
    [second[0], second[1], second[2], second[3]]
}

/// Compute the identifier and return it as a little-endian u32.
#[inline]
pub fn hash_u32(text: &str) -> u32 {
    u32::from_le_bytes(hash(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(hash("CAGEAnimation"), hash("CAGEAnimation"));
        assert_eq!(hash(""), hash(""));
    }

    #[test]
    fn test_distinct_inputs() {
        assert_ne!(hash("name"), hash("Name"));
        assert_ne!(hash("position"), hash("rotation"));
    }

    #[test]
    fn test_swizzle_groups() {
        let mut digest = [0u8; 20];
        for (i, b) in digest.iter_mut().enumerate() {
            *b = i as u8;
        }
        let out = swizzle(&digest);
        assert_eq!(&out[0..4], &[3, 2, 1, 0]);
        assert_eq!(&out[12..16], &[15, 14, 13, 12]);
    }

    #[test]
    fn test_first_round_is_sha1() {
        // SHA-1("abc") = a9993e36 4706816a ba3e2571 7850c26c 9cd0d89d
        let d = first_round("abc");
        assert_eq!(hex::encode(d), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_u32_matches_bytes() {
        let bytes = hash("Zone");
        assert_eq!(hash_u32("Zone"), u32::from_le_bytes(bytes));
    }
}
