//! Timeline data owned by `CAGEAnimation` and `TriggerSequence` functions.

use glam::Vec2;
use smallvec::SmallVec;

use super::DataType;
use crate::guid::ShortGuid;
use crate::io::{ByteReader, ByteWriter};
use crate::util::Result;

/// Hierarchy of instance ids leading to an entity in a nested composite.
pub type EntityPath = SmallVec<[ShortGuid; 4]>;

/// Binds an animation track to a parameter on some entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConnection {
    pub id: ShortGuid,
    /// Track (float or event) this connection drives.
    pub track_id: ShortGuid,
    pub parameter_id: ShortGuid,
    pub parameter_type: DataType,
    pub parameter_sub_id: ShortGuid,
    pub path: EntityPath,
}

/// Float keyframe: value plus Hermite tangents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatKeyframe {
    pub mode: u32,
    pub time: f32,
    pub value: Vec2,
    pub tan_in: Vec2,
    pub tan_out: Vec2,
}

/// Event keyframe: fires `forward` when played forwards, `reverse` backwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventKeyframe {
    pub mode: u32,
    pub time: f32,
    pub forward: ShortGuid,
    pub reverse: ShortGuid,
    pub track_type: ShortGuid,
    pub duration: f32,
}

impl FloatKeyframe {
    /// Serialized size: mode, time, value, tangents.
    pub const SIZE: usize = 32;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            mode: r.read_u32()?,
            time: r.read_f32()?,
            value: r.read_vec2()?,
            tan_in: r.read_vec2()?,
            tan_out: r.read_vec2()?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_u32(self.mode)?;
        w.write_f32(self.time)?;
        w.write_vec2(self.value)?;
        w.write_vec2(self.tan_in)?;
        w.write_vec2(self.tan_out)
    }
}

impl EventKeyframe {
    /// Serialized size: mode, time, three ids, duration.
    pub const SIZE: usize = 24;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            mode: r.read_u32()?,
            time: r.read_f32()?,
            forward: r.read_guid()?,
            reverse: r.read_guid()?,
            track_type: r.read_guid()?,
            duration: r.read_f32()?,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_u32(self.mode)?;
        w.write_f32(self.time)?;
        w.write_guid(self.forward);
        w.write_guid(self.reverse);
        w.write_guid(self.track_type);
        w.write_f32(self.duration)
    }
}

/// Common access to keyframe timestamps.
pub trait Keyframe {
    fn time(&self) -> f32;
}

impl Keyframe for FloatKeyframe {
    fn time(&self) -> f32 {
        self.time
    }
}

impl Keyframe for EventKeyframe {
    fn time(&self) -> f32 {
        self.time
    }
}

/// An ordered keyframe list with an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<K> {
    pub id: ShortGuid,
    pub keyframes: Vec<K>,
}

pub type FloatTrack = Track<FloatKeyframe>;
pub type EventTrack = Track<EventKeyframe>;

impl<K: Keyframe> Track<K> {
    pub fn new(id: ShortGuid) -> Self {
        Self { id, keyframes: Vec::new() }
    }

    /// Stable sort of keyframes by timestamp.
    pub fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time().total_cmp(&b.time()));
    }

    /// Earliest timestamp, or 0 for an empty track.
    pub fn min_time(&self) -> f32 {
        self.keyframes
            .iter()
            .map(Keyframe::time)
            .min_by(f32::total_cmp)
            .unwrap_or(0.0)
    }

    /// Latest timestamp, or 0 for an empty track.
    pub fn max_time(&self) -> f32 {
        self.keyframes
            .iter()
            .map(Keyframe::time)
            .max_by(f32::total_cmp)
            .unwrap_or(0.0)
    }
}

/// Data of a `CAGEAnimation` function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationData {
    pub connections: Vec<AnimationConnection>,
    pub float_tracks: Vec<FloatTrack>,
    pub event_tracks: Vec<EventTrack>,
}

impl AnimationData {
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty() && self.float_tracks.is_empty() && self.event_tracks.is_empty()
    }

    /// Sort every track's keyframes by time.
    pub fn sort_keyframes(&mut self) {
        self.float_tracks.iter_mut().for_each(Track::sort_keyframes);
        self.event_tracks.iter_mut().for_each(Track::sort_keyframes);
    }
}

/// One entity triggered by a sequence after `timing` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    pub path: EntityPath,
    pub timing: f32,
}

/// A method relayed by a sequence, with its completion method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodEntry {
    pub method: ShortGuid,
    pub relay: ShortGuid,
    pub finished: ShortGuid,
}

/// Data of a `TriggerSequence` function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceData {
    pub entries: Vec<SequenceEntry>,
    pub methods: Vec<MethodEntry>,
}

impl SequenceData {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.methods.is_empty()
    }
}
