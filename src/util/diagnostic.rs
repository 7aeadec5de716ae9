//! Non-fatal findings reported alongside a decoded graph.
//!
//! Decoding recovers locally from referential problems and unknown tags;
//! each recovery is recorded here so the caller can decide what to do
//! about it. Every diagnostic is also emitted as a tracing event.

use std::fmt;

use crate::guid::ShortGuid;

/// A recoverable anomaly found while decoding or encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Parameter or variable data type tag not in the known set.
    UnknownDataType { composite: ShortGuid, tag: u32 },
    /// Resource reference kind tag not in the known set.
    UnknownResourceKind { composite: ShortGuid, tag: ShortGuid },
    /// A link or parameter named an entity that does not exist.
    PlaceholderEntity { composite: ShortGuid, entity: ShortGuid },
    /// Resource references left over after relinking.
    UnassignedResources { composite: ShortGuid, count: usize },
    /// Composite id is not the hash of its stored name.
    NameHashMismatch { composite: ShortGuid, name: String },
    /// String parameter hash does not match its text.
    StringHashMismatch { stored: ShortGuid, text: String },
    /// A REMOVE command with an empty payload was skipped.
    IgnoredRemove { index: usize },
    /// Command with a context block id this codec does not know.
    UnknownContext { index: usize, block: u8 },
    /// Behaviour sub-record with an unrecognised type tag.
    UnknownBehaviour { composite: ShortGuid, entity: ShortGuid, tag: ShortGuid },
    /// Behaviour sub-record addressed to an entity of the wrong kind.
    MisplacedBehaviour { composite: ShortGuid, entity: ShortGuid },
}

impl Diagnostic {
    /// Emit this diagnostic as a tracing event.
    pub fn emit(&self) {
        match self {
            Self::IgnoredRemove { .. } => tracing::debug!("{}", self),
            _ => tracing::warn!("{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDataType { composite, tag } => {
                write!(f, "composite {}: unknown data type tag {:#010x}", composite, tag)
            }
            Self::UnknownResourceKind { composite, tag } => {
                write!(f, "composite {}: unknown resource kind {}", composite, tag)
            }
            Self::PlaceholderEntity { composite, entity } => {
                write!(f, "composite {}: created placeholder for entity {}", composite, entity)
            }
            Self::UnassignedResources { composite, count } => {
                write!(f, "composite {}: {} resource reference(s) left unassigned", composite, count)
            }
            Self::NameHashMismatch { composite, name } => {
                write!(f, "composite {} does not hash from its name {:?}", composite, name)
            }
            Self::StringHashMismatch { stored, text } => {
                write!(f, "string {:?} stored with hash {}", text, stored)
            }
            Self::IgnoredRemove { index } => write!(f, "command {}: empty REMOVE ignored", index),
            Self::UnknownContext { index, block } => {
                write!(f, "command {}: unknown context block {}", index, block)
            }
            Self::UnknownBehaviour { composite, entity, tag } => {
                write!(f, "composite {} entity {}: unknown behaviour record {}", composite, entity, tag)
            }
            Self::MisplacedBehaviour { composite, entity } => {
                write!(f, "composite {} entity {}: behaviour record on wrong entity kind", composite, entity)
            }
        }
    }
}

/// A decoded value plus the diagnostics collected while producing it.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Decoded<T> {
    /// Wrap a value with its diagnostics.
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// True when decoding produced no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drop the diagnostics and keep the value.
    pub fn into_value(self) -> T {
        self.value
    }
}
