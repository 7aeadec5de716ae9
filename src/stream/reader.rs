//! Command-stream decoding.
//!
//! The command array is validated once into [`Command`] views over the
//! data buffer, then replayed in five passes so that every command finds
//! the composites and entities it refers to already in place.

use std::collections::HashMap;

use super::format::*;
use crate::guid::{well_known, HasherContext, ShortGuid};
use crate::io::ByteReader;
use crate::model::{
    AnimationConnection, AnimationData, CommandStream, Composite, DataType, EntityPath, EventKeyframe,
    EventTrack, FloatKeyframe, FloatTrack, Function, FunctionKind, MethodEntry, ParameterValue,
    ResourceReference, SequenceData, SequenceEntry, Wire,
};
use crate::options::DecodeOptions;
use crate::relink;
use crate::util::{Decoded, Diagnostic, Error, Result};

/// One validated ADD command.
#[derive(Debug, Clone, Copy)]
struct Command<'a> {
    index: usize,
    context: Context,
    payload: &'a [u8],
}

/// Passes in replay order.
const PASSES: [&[Context]; 5] = [
    &[Context::Template, Context::Root],
    &[Context::Entity, Context::Alias, Context::Proxy, Context::Connector],
    &[Context::Behaviour],
    &[Context::Parameter, Context::Link],
    &[Context::Resource],
];

/// Decode a command-stream file.
pub fn decode(data: &[u8], hasher: &HasherContext, options: &DecodeOptions) -> Result<Decoded<CommandStream>> {
    let mut diagnostics = Vec::new();
    let commands = read_commands(data, &mut diagnostics)?;
    tracing::debug!("stream: {} commands, {} bytes", commands.len(), data.len());

    let mut decoder = StreamDecoder {
        hasher,
        options,
        stream: CommandStream::default(),
        index: HashMap::new(),
        loose: Vec::new(),
        diagnostics,
    };
    for (pass, contexts) in PASSES.iter().enumerate() {
        let mut applied = 0;
        for command in commands.iter().filter(|c| contexts.contains(&c.context)) {
            decoder.apply(command)?;
            applied += 1;
        }
        tracing::trace!("stream pass {}: {} commands", pass + 1, applied);
    }
    decoder.relink();

    let StreamDecoder { stream, diagnostics, .. } = decoder;
    diagnostics.iter().for_each(Diagnostic::emit);
    Ok(Decoded::new(stream, diagnostics))
}

/// Parse the header and command array, keeping the ADD commands.
fn read_commands<'a>(data: &'a [u8], diagnostics: &mut Vec<Diagnostic>) -> Result<Vec<Command<'a>>> {
    let mut r = ByteReader::new(data);
    r.ensure(FILE_HEADER_SIZE)?;
    let total_size = r.read_u32()? as usize;
    let count = r.read_u32()? as usize;
    let data_size = r.read_u32()? as usize;
    if total_size != data.len() {
        tracing::debug!("stream: header size {} differs from file size {}", total_size, data.len());
    }

    r.ensure_table(FILE_HEADER_SIZE, count, COMMAND_ENTRY_SIZE)?;
    let data_start = FILE_HEADER_SIZE + count * COMMAND_ENTRY_SIZE;
    r.ensure_table(data_start, data_size, 1)?;
    let buffer = &data[data_start..data_start + data_size];

    let mut commands = Vec::with_capacity(count);
    for index in 0..count {
        let tag = CommandTag::unpack(r.read_u32()?);
        let offset = r.read_i32()?;
        match tag.apply {
            Apply::Add => {}
            Apply::Remove if tag.size == 0 => {
                diagnostics.push(Diagnostic::IgnoredRemove { index });
                continue;
            }
            other => {
                return Err(Error::UnsupportedCommand(format!(
                    "command {}: {:?} on block {} ({} bytes)",
                    index, other, tag.block, tag.size
                )));
            }
        }

        let context = if tag.context { Context::from_block(tag.block) } else { None };
        let Some(context) = context else {
            diagnostics.push(Diagnostic::UnknownContext { index, block: tag.block });
            continue;
        };

        let start = usize::try_from(offset).map_err(|_| Error::invalid(format!("command {}: negative data offset {}", index, offset)))?;
        let end = start + tag.size as usize;
        if end > buffer.len() {
            return Err(Error::OutOfBounds { offset: data_start + start, len: tag.size as usize, size: data.len() });
        }
        commands.push(Command { index, context, payload: &buffer[start..end] });
    }
    Ok(commands)
}

/// Body of a BEHAVIOUR command, parsed before its owner is looked up.
enum Behaviour {
    Method(MethodEntry),
    Sequence(SequenceEntry),
    Binding(AnimationConnection),
    FloatTrack(FloatTrack),
    EventTrack(EventTrack),
}

struct StreamDecoder<'a> {
    hasher: &'a HasherContext,
    options: &'a DecodeOptions,
    stream: CommandStream,
    /// Composite id to position in `stream.composites`.
    index: HashMap<ShortGuid, usize>,
    /// Resource records per composite, attached after the last pass.
    loose: Vec<Vec<ResourceReference>>,
    diagnostics: Vec<Diagnostic>,
}

impl StreamDecoder<'_> {
    fn composite_index(&self, id: ShortGuid) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| Error::invalid(format!("command references undeclared composite {}", id)))
    }

    fn apply(&mut self, command: &Command<'_>) -> Result<()> {
        let mut r = ByteReader::new(command.payload);
        tracing::trace!("command {}: {:?}", command.index, command.context);
        match command.context {
            Context::Template => self.add_template(&mut r),
            Context::Root => {
                self.stream.root = Some(r.read_guid()?);
                Ok(())
            }
            Context::Entity => {
                let ci = self.composite_index(r.read_guid()?)?;
                let id = r.read_guid()?;
                let function_type = r.read_guid()?;
                self.stream.composites[ci].add_function(id, function_type);
                Ok(())
            }
            Context::Alias => {
                let ci = self.composite_index(r.read_guid()?)?;
                let id = r.read_guid()?;
                let path_hash = r.read_guid()?;
                let path = read_path(&mut r)?;
                self.stream.composites[ci].add_alias(id, path).path_hash = path_hash;
                Ok(())
            }
            Context::Proxy => {
                let ci = self.composite_index(r.read_guid()?)?;
                let id = r.read_guid()?;
                let function_type = r.read_guid()?;
                let extra_id = r.read_guid()?;
                let path = read_path(&mut r)?;
                self.stream.composites[ci].add_proxy(id, path, function_type).extra_id = extra_id;
                Ok(())
            }
            Context::Connector => {
                let composite = r.read_guid()?;
                let ci = self.composite_index(composite)?;
                let id = r.read_guid()?;
                let name = r.read_guid()?;
                let block = r.read_u8()?;
                let value_type = DataType::from_stream_block(block);
                if !value_type.is_known() {
                    self.diagnostics.push(Diagnostic::UnknownDataType { composite, tag: block as u32 });
                }
                self.stream.composites[ci].add_variable(id, name, value_type);
                Ok(())
            }
            Context::Behaviour => self.add_behaviour(&mut r),
            Context::Parameter => self.add_parameter(&mut r),
            Context::Link => {
                let composite = r.read_guid()?;
                let ci = self.composite_index(composite)?;
                let parent = r.read_guid()?;
                let connection = r.read_guid()?;
                let parent_param = r.read_guid()?;
                let child_param = r.read_guid()?;
                let child = r.read_guid()?;
                let (base, created) = self.stream.composites[ci].base_or_placeholder(parent);
                base.add_link(connection, parent_param, child, child_param);
                if created {
                    self.diagnostics.push(Diagnostic::PlaceholderEntity { composite, entity: parent });
                }
                Ok(())
            }
            Context::Resource => {
                let composite = r.read_guid()?;
                let ci = self.composite_index(composite)?;
                let reference = ResourceReference::read(&mut r)?;
                if !reference.kind.is_known() {
                    self.diagnostics.push(Diagnostic::UnknownResourceKind { composite, tag: reference.kind.tag() });
                }
                self.loose[ci].push(reference);
                Ok(())
            }
        }
    }

    fn add_template(&mut self, r: &mut ByteReader<'_>) -> Result<()> {
        let id = r.read_guid()?;
        let name = r.read_cstring()?;
        if self.options.verify_names && self.hasher.generate(&name) != id {
            self.diagnostics.push(Diagnostic::NameHashMismatch { composite: id, name: name.clone() });
        }
        match self.index.get(&id) {
            Some(&ci) => self.stream.composites[ci].name = name,
            None => {
                self.index.insert(id, self.stream.composites.len());
                self.stream.composites.push(Composite::with_id(id, name));
                self.loose.push(Vec::new());
            }
        }
        Ok(())
    }

    fn add_behaviour(&mut self, r: &mut ByteReader<'_>) -> Result<()> {
        let tag = r.read_guid()?;
        let composite = r.read_guid()?;
        let ci = self.composite_index(composite)?;
        let entity = r.read_guid()?;
        let Some(record) = BehaviourRecord::from_tag(tag) else {
            self.diagnostics.push(Diagnostic::UnknownBehaviour { composite, entity, tag });
            return Ok(());
        };

        let behaviour = match record {
            BehaviourRecord::Method => Behaviour::Method(MethodEntry {
                method: r.read_guid()?,
                relay: r.read_guid()?,
                finished: r.read_guid()?,
            }),
            BehaviourRecord::Sequence => {
                let timing = r.read_f32()?;
                Behaviour::Sequence(SequenceEntry { path: read_path(r)?, timing })
            }
            BehaviourRecord::Binding => {
                let id = r.read_guid()?;
                let track_id = r.read_guid()?;
                let parameter_id = r.read_guid()?;
                let block = r.read_u32()?;
                let parameter_sub_id = r.read_guid()?;
                let parameter_type = match u8::try_from(block) {
                    Ok(block) => DataType::from_stream_block(block),
                    Err(_) => DataType::Unknown(block),
                };
                if !parameter_type.is_known() {
                    self.diagnostics.push(Diagnostic::UnknownDataType { composite, tag: block });
                }
                Behaviour::Binding(AnimationConnection {
                    id,
                    track_id,
                    parameter_id,
                    parameter_type,
                    parameter_sub_id,
                    path: read_path(r)?,
                })
            }
            BehaviourRecord::FloatTrack => {
                let mut track = FloatTrack::new(r.read_guid()?);
                let count = r.read_u32()? as usize;
                r.ensure(count * FloatKeyframe::SIZE)?;
                for _ in 0..count {
                    track.keyframes.push(FloatKeyframe::read(r)?);
                }
                Behaviour::FloatTrack(track)
            }
            BehaviourRecord::EventTrack => {
                let mut track = EventTrack::new(r.read_guid()?);
                let count = r.read_u32()? as usize;
                r.ensure(count * EventKeyframe::SIZE)?;
                for _ in 0..count {
                    track.keyframes.push(EventKeyframe::read(r)?);
                }
                Behaviour::EventTrack(track)
            }
        };

        let function = self.behaviour_owner(ci, entity, record.is_animation());
        match (&mut function.kind, behaviour) {
            (FunctionKind::Sequence(data), Behaviour::Method(entry)) => data.methods.push(entry),
            (FunctionKind::Sequence(data), Behaviour::Sequence(entry)) => data.entries.push(entry),
            (FunctionKind::Animation(data), Behaviour::Binding(connection)) => data.connections.push(connection),
            (FunctionKind::Animation(data), Behaviour::FloatTrack(track)) => data.float_tracks.push(track),
            (FunctionKind::Animation(data), Behaviour::EventTrack(track)) => data.event_tracks.push(track),
            _ => {}
        }
        Ok(())
    }

    /// Function that owns a behaviour record. A missing function is created
    /// with the type the record implies; one of another kind is switched over.
    fn behaviour_owner(&mut self, ci: usize, entity: ShortGuid, animation: bool) -> &mut Function {
        let target = &mut self.stream.composites[ci];
        let composite = target.id;
        let i = match target.functions.iter().position(|f| f.base.id == entity) {
            Some(i) => i,
            None => {
                self.diagnostics.push(Diagnostic::MisplacedBehaviour { composite, entity });
                let ids = well_known();
                target.add_function(entity, if animation { ids.cage_animation } else { ids.trigger_sequence });
                target.functions.len() - 1
            }
        };
        let function = &mut target.functions[i];
        let placed = match function.kind {
            FunctionKind::Animation(_) => animation,
            FunctionKind::Sequence(_) => !animation,
            FunctionKind::Plain => false,
        };
        if !placed {
            self.diagnostics.push(Diagnostic::MisplacedBehaviour { composite, entity });
            function.kind = if animation {
                FunctionKind::Animation(AnimationData::default())
            } else {
                FunctionKind::Sequence(SequenceData::default())
            };
        }
        function
    }

    fn add_parameter(&mut self, r: &mut ByteReader<'_>) -> Result<()> {
        let composite = r.read_guid()?;
        let ci = self.composite_index(composite)?;
        let entity = r.read_guid()?;
        let name = r.read_guid()?;
        let tag = CommandTag::unpack(r.read_u32()?);
        let data_type = DataType::from_stream_block(tag.block);
        let end = r.pos() + tag.size as usize;
        let value = ParameterValue::read(r, data_type, Wire::Stream, end, self.hasher, &mut self.diagnostics)?;
        if let DataType::Unknown(tag) = data_type {
            self.diagnostics.push(Diagnostic::UnknownDataType { composite, tag });
        }

        let target = &mut self.stream.composites[ci];
        if name == well_known().name && !target.function(entity).is_some_and(|f| f.is_zone()) {
            if let ParameterValue::String(text) = value {
                target.entity_names.insert(entity, text);
                return Ok(());
            }
        }
        let (base, created) = target.base_or_placeholder(entity);
        base.add_parameter(name, value);
        if created {
            self.diagnostics.push(Diagnostic::PlaceholderEntity { composite, entity });
        }
        Ok(())
    }

    fn relink(&mut self) {
        let loose = std::mem::take(&mut self.loose);
        for (composite, references) in self.stream.composites.iter_mut().zip(loose) {
            relink::attach(composite, references, &mut self.diagnostics);
        }
    }
}

/// Count-prefixed id list.
fn read_path(r: &mut ByteReader<'_>) -> Result<EntityPath> {
    let count = r.read_u32()? as usize;
    r.ensure(count * 4)?;
    (0..count).map(|_| r.read_guid()).collect()
}
