//! Parameter values and their encodings.
//!
//! Both codecs share one read/write rule per [`DataType`]; the only
//! differences between the archive and the command stream are selected by
//! [`Wire`]:
//!
//! | Type      | Archive                                 | Command stream            |
//! |-----------|-----------------------------------------|---------------------------|
//! | String    | self offset, hash, text, NUL, pad       | hash, text, NUL, pad      |
//! | Bool      | i32                                     | u8                        |
//! | Spline    | self offset, count, points              | points, `-1.0` sentinel   |
//!
//! Transform rotations are stored Y, X, Z on the wire in both formats.

use std::hash::{Hash, Hasher};

use glam::Vec3;

use super::{DataType, ResourceReference};
use crate::guid::{HasherContext, ShortGuid};
use crate::io::{to_words, ByteReader, ByteWriter};
use crate::util::{Diagnostic, Result};

/// Size of a serialized transform.
pub const TRANSFORM_SIZE: usize = 24;

/// Which binary layout a value is read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Archive,
    Stream,
}

/// Position plus Euler rotation (X, Y, Z in memory).
#[derive(Debug, Clone, Copy, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Terminator of command-stream splines.
    pub const SENTINEL: Transform = Transform {
        position: Vec3::splat(-1.0),
        rotation: Vec3::splat(-1.0),
    };

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let position = r.read_vec3()?;
        let y = r.read_f32()?;
        let x = r.read_f32()?;
        let z = r.read_f32()?;
        Ok(Self { position, rotation: Vec3::new(x, y, z) })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_vec3(self.position)?;
        w.write_f32(self.rotation.y)?;
        w.write_f32(self.rotation.x)?;
        w.write_f32(self.rotation.z)
    }

    fn bits(&self) -> [u32; 6] {
        let p = self.position;
        let r = self.rotation;
        [p.x, p.y, p.z, r.x, r.y, r.z].map(f32::to_bits)
    }

    fn is_sentinel(&self) -> bool {
        self.bits() == Self::SENTINEL.bits()
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Transform {}

impl Hash for Transform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Selected entry of an enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub enum_id: ShortGuid,
    pub index: i32,
}

/// Resource group id plus the references the relinking pass attached.
#[derive(Debug, Clone, Default)]
pub struct ResourceValue {
    pub id: ShortGuid,
    pub entries: Vec<ResourceReference>,
}

impl ResourceValue {
    pub fn new(id: ShortGuid) -> Self {
        Self { id, entries: Vec::new() }
    }
}

impl PartialEq for ResourceValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.entries.len() == other.entries.len()
            && self.entries.iter().zip(&other.entries).all(|(a, b)| a.same_bits(b))
    }
}

/// A typed parameter value.
#[derive(Debug, Clone)]
pub enum ParameterValue {
    Transform(Transform),
    Integer(i32),
    String(String),
    Bool(bool),
    Float(f32),
    Resource(ResourceValue),
    Vector(Vec3),
    Enum(EnumValue),
    Spline(Vec<Transform>),
    NoType,
    /// Payload of an unrecognised type, kept verbatim.
    Unknown { tag: u32, raw: Vec<u8> },
}

impl ParameterValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Transform(_) => DataType::Transform,
            Self::Integer(_) => DataType::Integer,
            Self::String(_) => DataType::String,
            Self::Bool(_) => DataType::Bool,
            Self::Float(_) => DataType::Float,
            Self::Resource(_) => DataType::Resource,
            Self::Vector(_) => DataType::Vector,
            Self::Enum(_) => DataType::Enum,
            Self::Spline(_) => DataType::Spline,
            Self::NoType => DataType::NoType,
            Self::Unknown { tag, .. } => DataType::Unknown(*tag),
        }
    }

    /// Deep copy, matching every variant explicitly.
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::Transform(t) => Self::Transform(*t),
            Self::Integer(v) => Self::Integer(*v),
            Self::String(s) => Self::String(s.clone()),
            Self::Bool(b) => Self::Bool(*b),
            Self::Float(f) => Self::Float(*f),
            Self::Resource(r) => Self::Resource(ResourceValue {
                id: r.id,
                entries: r.entries.iter().copied().collect(),
            }),
            Self::Vector(v) => Self::Vector(*v),
            Self::Enum(e) => Self::Enum(*e),
            Self::Spline(points) => Self::Spline(points.iter().copied().collect()),
            Self::NoType => Self::NoType,
            Self::Unknown { tag, raw } => Self::Unknown { tag: *tag, raw: raw.clone() },
        }
    }

    /// Copy used as the key when pooling values for the archive.
    ///
    /// Attached resource entries are not serialized with the value, so
    /// they are dropped from the key.
    pub fn pool_key(&self) -> Self {
        match self {
            Self::Resource(r) => Self::Resource(ResourceValue::new(r.id)),
            other => other.deep_clone(),
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceValue> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut ResourceValue> {
        match self {
            Self::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read a payload of type `data_type`. `end` bounds unknown payloads.
    pub fn read(
        r: &mut ByteReader<'_>,
        data_type: DataType,
        wire: Wire,
        end: usize,
        hasher: &HasherContext,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self> {
        Ok(match data_type {
            DataType::Transform => Self::Transform(Transform::read(r)?),
            DataType::Integer => Self::Integer(r.read_i32()?),
            DataType::String => {
                if wire == Wire::Archive {
                    let words = r.read_u32()?;
                    let stored = r.read_guid()?;
                    r.seek_words(words)?;
                    Self::String(read_hashed_text(r, stored, hasher, diagnostics)?)
                } else {
                    let stored = r.read_guid()?;
                    Self::String(read_hashed_text(r, stored, hasher, diagnostics)?)
                }
            }
            DataType::Bool => match wire {
                Wire::Archive => Self::Bool(r.read_i32()? != 0),
                Wire::Stream => Self::Bool(r.read_u8()? != 0),
            },
            DataType::Float => Self::Float(r.read_f32()?),
            DataType::Resource => Self::Resource(ResourceValue::new(r.read_guid()?)),
            DataType::Vector => Self::Vector(r.read_vec3()?),
            DataType::Enum => Self::Enum(EnumValue {
                enum_id: r.read_guid()?,
                index: r.read_i32()?,
            }),
            DataType::Spline => {
                let mut points = Vec::new();
                if wire == Wire::Archive {
                    let words = r.read_u32()?;
                    let count = r.read_u32()? as usize;
                    r.seek_words(words)?;
                    r.ensure(count * TRANSFORM_SIZE)?;
                    for _ in 0..count {
                        points.push(Transform::read(r)?);
                    }
                } else {
                    loop {
                        let point = Transform::read(r)?;
                        if point.is_sentinel() {
                            break;
                        }
                        points.push(point);
                    }
                }
                Self::Spline(points)
            }
            DataType::NoType => Self::NoType,
            DataType::Unknown(tag) => {
                let len = end.saturating_sub(r.pos());
                Self::Unknown { tag, raw: r.read_bytes(len)?.to_vec() }
            }
        })
    }

    /// Write the payload (without the type tag).
    pub fn write(&self, w: &mut ByteWriter, wire: Wire, hasher: &HasherContext) -> Result<()> {
        match self {
            Self::Transform(t) => t.write(w)?,
            Self::Integer(v) => w.write_i32(*v)?,
            Self::String(s) => {
                if wire == Wire::Archive {
                    let text_at = w.pos() + 8;
                    w.write_u32(to_words(text_at)?)?;
                }
                w.write_guid(hasher.generate(s));
                w.write_cstring(s);
                w.align(4);
            }
            Self::Bool(b) => match wire {
                Wire::Archive => w.write_i32(*b as i32)?,
                Wire::Stream => w.write_u8(*b as u8)?,
            },
            Self::Float(f) => w.write_f32(*f)?,
            Self::Resource(r) => w.write_guid(r.id),
            Self::Vector(v) => w.write_vec3(*v)?,
            Self::Enum(e) => {
                w.write_guid(e.enum_id);
                w.write_i32(e.index)?;
            }
            Self::Spline(points) => {
                if wire == Wire::Archive {
                    let points_at = w.pos() + 8;
                    w.write_u32(to_words(points_at)?)?;
                    w.write_u32(points.len() as u32)?;
                }
                for point in points {
                    point.write(w)?;
                }
                if wire == Wire::Stream {
                    Transform::SENTINEL.write(w)?;
                }
            }
            Self::NoType => {}
            Self::Unknown { raw, .. } => w.write_bytes(raw),
        }
        Ok(())
    }
}

fn read_hashed_text(
    r: &mut ByteReader<'_>,
    stored: ShortGuid,
    hasher: &HasherContext,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String> {
    let text = r.read_cstring()?;
    r.align(4)?;
    if hasher.generate(&text) != stored {
        diagnostics.push(Diagnostic::StringHashMismatch { stored, text: text.clone() });
    }
    Ok(text)
}

impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Transform(a), Self::Transform(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Resource(a), Self::Resource(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => {
                a.to_array().map(f32::to_bits) == b.to_array().map(f32::to_bits)
            }
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Spline(a), Self::Spline(b)) => a == b,
            (Self::NoType, Self::NoType) => true,
            (Self::Unknown { tag: ta, raw: ra }, Self::Unknown { tag: tb, raw: rb }) => ta == tb && ra == rb,
            _ => false,
        }
    }
}

impl Eq for ParameterValue {}

impl Hash for ParameterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data_type().hash(state);
        match self {
            Self::Transform(t) => t.hash(state),
            Self::Integer(v) => v.hash(state),
            Self::String(s) => s.hash(state),
            Self::Bool(b) => b.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            // Entries are covered by Eq; hashing the id alone is consistent.
            Self::Resource(r) => r.id.hash(state),
            Self::Vector(v) => v.to_array().map(f32::to_bits).hash(state),
            Self::Enum(e) => e.hash(state),
            Self::Spline(points) => points.hash(state),
            Self::NoType => {}
            Self::Unknown { raw, .. } => raw.hash(state),
        }
    }
}

/// A named value attached to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: ShortGuid,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(name: ShortGuid, value: ParameterValue) -> Self {
        Self { name, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &ParameterValue, wire: Wire) -> Vec<u8> {
        let hasher = HasherContext::empty();
        let mut w = ByteWriter::new();
        value.write(&mut w, wire, &hasher).unwrap();
        w.into_inner()
    }

    fn decode(bytes: &[u8], data_type: DataType, wire: Wire) -> ParameterValue {
        let hasher = HasherContext::empty();
        let mut diags = Vec::new();
        let mut r = ByteReader::new(bytes);
        let v = ParameterValue::read(&mut r, data_type, wire, bytes.len(), &hasher, &mut diags).unwrap();
        assert!(diags.is_empty());
        v
    }

    #[test]
    fn test_transform_rotation_order() {
        let t = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(10.0, 20.0, 30.0));
        let bytes = encode(&ParameterValue::Transform(t), Wire::Archive);
        assert_eq!(bytes.len(), TRANSFORM_SIZE);
        let on_disk = |i: usize| f32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
        assert_eq!(on_disk(3), 20.0);
        assert_eq!(on_disk(4), 10.0);
        assert_eq!(on_disk(5), 30.0);
        assert_eq!(decode(&bytes, DataType::Transform, Wire::Archive), ParameterValue::Transform(t));
    }

    #[test]
    fn test_transform_bits_preserved() {
        let t = Transform::new(Vec3::new(-0.0, f32::MIN_POSITIVE, 1e-30), Vec3::new(0.1, -0.2, 0.3));
        let bytes = encode(&ParameterValue::Transform(t), Wire::Stream);
        match decode(&bytes, DataType::Transform, Wire::Stream) {
            ParameterValue::Transform(back) => {
                assert_eq!(back.position.x.to_bits(), (-0.0f32).to_bits());
                assert_eq!(back.rotation.y.to_bits(), (-0.2f32).to_bits());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spline_termination() {
        let points = vec![Transform::default(); 3];
        let value = ParameterValue::Spline(points);
        let stream = encode(&value, Wire::Stream);
        assert_eq!(stream.len(), 4 * TRANSFORM_SIZE);
        let archive = encode(&value, Wire::Archive);
        assert_eq!(archive.len(), 8 + 3 * TRANSFORM_SIZE);
        assert_eq!(decode(&stream, DataType::Spline, Wire::Stream), value);
        assert_eq!(decode(&archive, DataType::Spline, Wire::Archive), value);
    }

    #[test]
    fn test_string_layout() {
        let value = ParameterValue::String("abc".into());
        let archive = encode(&value, Wire::Archive);
        // offset + hash + "abc\0"
        assert_eq!(archive.len(), 12);
        assert_eq!(u32::from_le_bytes(archive[0..4].try_into().unwrap()), 2);
        assert_eq!(&archive[4..8], ShortGuid::from_text("abc").as_bytes());
        assert_eq!(decode(&archive, DataType::String, Wire::Archive), value);

        let stream = encode(&ParameterValue::String("abcd".into()), Wire::Stream);
        assert_eq!(stream.len(), 12);
    }

    #[test]
    fn test_bool_widths() {
        assert_eq!(encode(&ParameterValue::Bool(true), Wire::Archive), vec![1, 0, 0, 0]);
        assert_eq!(encode(&ParameterValue::Bool(true), Wire::Stream), vec![1]);
        assert_eq!(decode(&[7, 0, 0, 0], DataType::Bool, Wire::Archive), ParameterValue::Bool(true));
    }

    #[test]
    fn test_equality_covers_payload() {
        let a = ParameterValue::Enum(EnumValue { enum_id: ShortGuid::from_u32(5), index: 1 });
        let b = ParameterValue::Enum(EnumValue { enum_id: ShortGuid::from_u32(5), index: 2 });
        assert_ne!(a, b);
        assert_ne!(ParameterValue::Integer(1), ParameterValue::Float(1.0));

        let mut r = ResourceValue::new(ShortGuid::from_u32(9));
        r.entries.push(ResourceReference::new(
            ShortGuid::from_u32(9),
            crate::model::ResourceKind::TraversalSegment,
        ));
        let with_entries = ParameterValue::Resource(r);
        assert_ne!(with_entries, with_entries.pool_key());
        assert_eq!(with_entries, with_entries.deep_clone());
    }

    #[test]
    fn test_unknown_payload_bounded() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let hasher = HasherContext::empty();
        let mut diags = Vec::new();
        let mut r = ByteReader::new(&bytes);
        let v = ParameterValue::read(&mut r, DataType::Unknown(42), Wire::Archive, 6, &hasher, &mut diags).unwrap();
        assert_eq!(v, ParameterValue::Unknown { tag: 42, raw: vec![1, 2, 3, 4, 5, 6] });
        assert_eq!(encode(&v, Wire::Archive), vec![1, 2, 3, 4, 5, 6]);
    }
}
