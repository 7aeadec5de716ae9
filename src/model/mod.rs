//! In-memory entity graph shared by both codecs.
//!
//! A [`Commands`] archive owns a list of [`Composite`]s; each composite owns
//! its entities, which own their links, parameters and resource references.
//! Cross references are plain [`ShortGuid`](crate::guid::ShortGuid) values
//! resolved by lookup, never pointers.

mod animation;
mod commands;
mod composite;
mod data_type;
mod entity;
mod parameter;
mod resource;

pub use animation::{
    AnimationConnection, AnimationData, EntityPath, EventKeyframe, EventTrack, FloatKeyframe,
    FloatTrack, Keyframe, MethodEntry, SequenceData, SequenceEntry, Track,
};
pub use commands::{CommandStream, Commands, EntryPoints};
pub use composite::{Composite, CompositeOpaque};
pub use data_type::DataType;
pub use entity::{
    Alias, EntityBase, EntityMut, EntityRef, Function, FunctionKind, Link, Proxy, Variable,
};
pub use parameter::{
    EnumValue, Parameter, ParameterValue, ResourceValue, Transform, Wire, TRANSFORM_SIZE,
};
pub use resource::{ResourceKind, ResourceReference, RESOURCE_RECORD_SIZE};
