//! World-placed resource references.

use std::sync::OnceLock;

use glam::Vec3;

use crate::guid::ShortGuid;
use crate::io::{ByteReader, ByteWriter};
use crate::util::Result;

/// Size of one serialized resource reference.
pub const RESOURCE_RECORD_SIZE: usize = 40;

/// Filler written into unused kind-specific slots.
const UNUSED: u32 = 0xFFFF_FFFF;

/// Kind of a resource reference, with the fields specific to that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    RenderableInstance { index: u32, count: u32 },
    CollisionMapping { index: u32, entity_id: ShortGuid },
    AnimatedModel { index: u32 },
    DynamicPhysicsSystem { index: u32 },
    ExclusiveMasterStateResource,
    NavMeshBarrierResource,
    TraversalSegment,
    /// Unrecognised kind; the 8 kind-specific bytes are kept verbatim.
    Unknown { tag: ShortGuid, raw: [u8; 8] },
}

const KIND_NAMES: [&str; 7] = [
    "RENDERABLE_INSTANCE",
    "COLLISION_MAPPING",
    "ANIMATED_MODEL",
    "DYNAMIC_PHYSICS_SYSTEM",
    "EXCLUSIVE_MASTER_STATE_RESOURCE",
    "NAV_MESH_BARRIER_RESOURCE",
    "TRAVERSAL_SEGMENT",
];

fn kind_tags() -> &'static [ShortGuid; 7] {
    static TAGS: OnceLock<[ShortGuid; 7]> = OnceLock::new();
    TAGS.get_or_init(|| KIND_NAMES.map(ShortGuid::from_text))
}

impl ResourceKind {
    fn slot(&self) -> Option<usize> {
        match self {
            Self::RenderableInstance { .. } => Some(0),
            Self::CollisionMapping { .. } => Some(1),
            Self::AnimatedModel { .. } => Some(2),
            Self::DynamicPhysicsSystem { .. } => Some(3),
            Self::ExclusiveMasterStateResource => Some(4),
            Self::NavMeshBarrierResource => Some(5),
            Self::TraversalSegment => Some(6),
            Self::Unknown { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.slot().map(|i| KIND_NAMES[i]).unwrap_or("UNKNOWN")
    }

    /// Tag id stored in the record.
    pub fn tag(&self) -> ShortGuid {
        match self {
            Self::Unknown { tag, .. } => *tag,
            known => known.slot().map(|i| kind_tags()[i]).unwrap_or(ShortGuid::ZERO),
        }
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }

    #[inline]
    pub fn is_physics_system(&self) -> bool {
        matches!(self, Self::DynamicPhysicsSystem { .. })
    }

    fn decode(tag: ShortGuid, raw: [u8; 8]) -> Self {
        let a = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let b = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        match kind_tags().iter().position(|t| *t == tag) {
            Some(0) => Self::RenderableInstance { index: a, count: b },
            Some(1) => Self::CollisionMapping {
                index: a,
                entity_id: ShortGuid::from_bytes([raw[4], raw[5], raw[6], raw[7]]),
            },
            Some(2) => Self::AnimatedModel { index: a },
            Some(3) => Self::DynamicPhysicsSystem { index: a },
            Some(4) => Self::ExclusiveMasterStateResource,
            Some(5) => Self::NavMeshBarrierResource,
            Some(6) => Self::TraversalSegment,
            _ => Self::Unknown { tag, raw },
        }
    }

    fn encode(&self) -> [u8; 8] {
        let pair = |a: u32, b: u32| {
            let mut out = [0u8; 8];
            out[..4].copy_from_slice(&a.to_le_bytes());
            out[4..].copy_from_slice(&b.to_le_bytes());
            out
        };
        match self {
            Self::RenderableInstance { index, count } => pair(*index, *count),
            Self::CollisionMapping { index, entity_id } => pair(*index, entity_id.to_u32()),
            Self::AnimatedModel { index } | Self::DynamicPhysicsSystem { index } => pair(*index, UNUSED),
            Self::ExclusiveMasterStateResource | Self::NavMeshBarrierResource | Self::TraversalSegment => {
                pair(UNUSED, UNUSED)
            }
            Self::Unknown { raw, .. } => *raw,
        }
    }
}

/// A pointer from an entity or resource parameter to a placed asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceReference {
    pub position: Vec3,
    pub rotation: Vec3,
    /// Entity id, resource parameter value id, or neither.
    pub owner_id: ShortGuid,
    pub kind: ResourceKind,
}

impl ResourceReference {
    pub fn new(owner_id: ShortGuid, kind: ResourceKind) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            owner_id,
            kind,
        }
    }

    /// Read one 40-byte record.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let position = r.read_vec3()?;
        let rotation = r.read_vec3()?;
        let owner_id = r.read_guid()?;
        let tag = r.read_guid()?;
        let bytes = r.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(Self {
            position,
            rotation,
            owner_id,
            kind: ResourceKind::decode(tag, raw),
        })
    }

    /// Write one 40-byte record.
    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_vec3(self.position)?;
        w.write_vec3(self.rotation)?;
        w.write_guid(self.owner_id);
        w.write_guid(self.kind.tag());
        w.write_bytes(&self.kind.encode());
        Ok(())
    }

    /// Bit-exact equality, used when deduplicating gathered references.
    pub fn same_bits(&self, other: &Self) -> bool {
        let bits = |v: Vec3| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        bits(self.position) == bits(other.position)
            && bits(self.rotation) == bits(other.rotation)
            && self.owner_id == other.owner_id
            && self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(reference: ResourceReference) -> (ResourceReference, Vec<u8>) {
        let mut w = ByteWriter::new();
        reference.write(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), RESOURCE_RECORD_SIZE);
        let mut r = ByteReader::new(&bytes);
        (ResourceReference::read(&mut r).unwrap(), bytes)
    }

    #[test]
    fn test_collision_mapping_fields() {
        let owner = ShortGuid::from_text("door_01");
        let mut reference = ResourceReference::new(
            owner,
            ResourceKind::CollisionMapping { index: 12, entity_id: ShortGuid::from_bytes([1, 2, 3, 4]) },
        );
        reference.position = Vec3::new(1.0, 2.0, 3.0);
        let (back, bytes) = roundtrip(reference);
        assert_eq!(back, reference);
        assert_eq!(&bytes[36..40], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_unknown_kind_keeps_bytes() {
        let tag = ShortGuid::from_text("SOMETHING_NEW");
        let raw = [1, 2, 3, 4, 5, 6, 7, 8];
        let reference = ResourceReference::new(ShortGuid::ZERO, ResourceKind::Unknown { tag, raw });
        let (back, bytes) = roundtrip(reference);
        assert!(!back.kind.is_known());
        assert_eq!(&bytes[32..40], &raw);
        assert_eq!(back.kind.tag(), tag);
    }

    #[test]
    fn test_unused_slots_filled() {
        let reference = ResourceReference::new(ShortGuid::ZERO, ResourceKind::TraversalSegment);
        let (_, bytes) = roundtrip(reference);
        assert_eq!(&bytes[32..40], &[0xFF; 8]);
    }
}
