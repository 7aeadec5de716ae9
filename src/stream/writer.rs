//! Command-stream encoding.
//!
//! Commands are emitted phase by phase (templates, root, entities,
//! behaviour records, resources, parameters, links), each phase walking
//! composites and entities in id order. Every payload starts on a 4-byte
//! boundary of the data buffer.

use super::format::*;
use crate::guid::{well_known, HasherContext, ShortGuid};
use crate::io::ByteWriter;
use crate::model::{
    AnimationData, CommandStream, Composite, EntityPath, EntityRef, Function, ParameterValue,
    ResourceReference, Wire,
};
use crate::options::EncodeOptions;
use crate::relink;
use crate::util::{map_slots, Error, Result};

/// Encode a command stream.
pub fn encode(stream: &CommandStream, hasher: &HasherContext, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut sorted: Vec<&Composite> = stream.composites.iter().collect();
    sorted.sort_by_key(|c| c.id);
    let layouts = map_slots(&sorted, options.parallel, |c| Layout::prepare(*c));

    let mut writer = CommandWriter::new(hasher);
    for layout in &layouts {
        let composite = layout.composite;
        writer.push(Context::Template, |w| {
            w.write_guid(composite.id);
            w.write_cstring(&composite.name);
            Ok(())
        })?;
    }
    if let Some(root) = stream.root {
        writer.push(Context::Root, |w| {
            w.write_guid(root);
            Ok(())
        })?;
    }
    for layout in &layouts {
        writer.write_entities(layout)?;
    }
    for layout in &layouts {
        writer.write_behaviours(layout)?;
    }
    for layout in &layouts {
        writer.write_resources(layout)?;
    }
    for layout in &layouts {
        writer.write_parameters(layout)?;
    }
    for layout in &layouts {
        writer.write_links(layout)?;
    }
    writer.finish()
}

/// Id-sorted view of one composite.
struct Layout<'c> {
    composite: &'c Composite,
    entities: Vec<EntityRef<'c>>,
    functions: Vec<&'c Function>,
    animations: Vec<(ShortGuid, AnimationData)>,
    resources: Vec<ResourceReference>,
}

impl<'c> Layout<'c> {
    fn prepare(composite: &'c Composite) -> Self {
        let mut entities = composite.all_entities();
        entities.sort_by_key(|e| e.id());
        let mut functions: Vec<&Function> = composite.functions.iter().collect();
        functions.sort_by_key(|f| f.base.id);
        let animations = functions
            .iter()
            .filter_map(|f| {
                f.animation().map(|data| {
                    let mut data = data.clone();
                    data.sort_keyframes();
                    (f.base.id, data)
                })
            })
            .collect();
        Self { composite, entities, functions, animations, resources: relink::gather(composite) }
    }
}

struct CommandWriter<'h> {
    data: ByteWriter,
    entries: Vec<(u32, i32)>,
    hasher: &'h HasherContext,
}

impl<'h> CommandWriter<'h> {
    fn new(hasher: &'h HasherContext) -> Self {
        Self { data: ByteWriter::new(), entries: Vec::new(), hasher }
    }

    /// Append one ADD command whose payload is produced by `write`.
    fn push(&mut self, context: Context, write: impl FnOnce(&mut ByteWriter) -> Result<()>) -> Result<()> {
        self.data.align(PAYLOAD_ALIGN);
        let at = self.data.pos();
        write(&mut self.data)?;
        let size = self.data.pos() - at;
        if size > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge(size));
        }
        let offset = i32::try_from(at).map_err(|_| Error::other("command data buffer exceeds 2 GiB"))?;
        self.entries.push((CommandTag::context(context, size as u16).pack(), offset));
        Ok(())
    }

    fn write_entities(&mut self, layout: &Layout<'_>) -> Result<()> {
        let composite = layout.composite.id;
        for entity in &layout.entities {
            match entity {
                EntityRef::Function(f) => self.push(Context::Entity, |w| {
                    w.write_guid(composite);
                    w.write_guid(f.base.id);
                    w.write_guid(f.function_type);
                    Ok(())
                })?,
                EntityRef::Alias(a) => self.push(Context::Alias, |w| {
                    w.write_guid(composite);
                    w.write_guid(a.base.id);
                    w.write_guid(a.path_hash);
                    write_path(w, &a.path)
                })?,
                EntityRef::Proxy(p) => self.push(Context::Proxy, |w| {
                    w.write_guid(composite);
                    w.write_guid(p.base.id);
                    w.write_guid(p.function_type);
                    w.write_guid(p.extra_id);
                    write_path(w, &p.path)
                })?,
                EntityRef::Variable(v) => self.push(Context::Connector, |w| {
                    w.write_guid(composite);
                    w.write_guid(v.base.id);
                    w.write_guid(v.name);
                    w.write_u8(v.value_type.stream_block())
                })?,
                // Recreated on decode by the parameters and links that name them.
                EntityRef::Placeholder(_) => {}
            }
        }
        Ok(())
    }

    fn behaviour(
        &mut self,
        record: BehaviourRecord,
        composite: ShortGuid,
        entity: ShortGuid,
        body: impl FnOnce(&mut ByteWriter) -> Result<()>,
    ) -> Result<()> {
        self.push(Context::Behaviour, |w| {
            w.write_guid(record.tag());
            w.write_guid(composite);
            w.write_guid(entity);
            body(w)
        })
    }

    fn write_behaviours(&mut self, layout: &Layout<'_>) -> Result<()> {
        let composite = layout.composite.id;
        for function in &layout.functions {
            let Some(data) = function.sequence() else { continue };
            let id = function.base.id;
            for method in &data.methods {
                self.behaviour(BehaviourRecord::Method, composite, id, |w| {
                    w.write_guid(method.method);
                    w.write_guid(method.relay);
                    w.write_guid(method.finished);
                    Ok(())
                })?;
            }
            for entry in &data.entries {
                self.behaviour(BehaviourRecord::Sequence, composite, id, |w| {
                    w.write_f32(entry.timing)?;
                    write_path(w, &entry.path)
                })?;
            }
        }

        for (id, data) in &layout.animations {
            for connection in &data.connections {
                self.behaviour(BehaviourRecord::Binding, composite, *id, |w| {
                    w.write_guid(connection.id);
                    w.write_guid(connection.track_id);
                    w.write_guid(connection.parameter_id);
                    w.write_u32(connection.parameter_type.stream_id())?;
                    w.write_guid(connection.parameter_sub_id);
                    write_path(w, &connection.path)
                })?;
            }
            for track in &data.float_tracks {
                self.behaviour(BehaviourRecord::FloatTrack, composite, *id, |w| {
                    w.write_guid(track.id);
                    w.write_u32(track.keyframes.len() as u32)?;
                    track.keyframes.iter().try_for_each(|key| key.write(w))
                })?;
            }
            for track in &data.event_tracks {
                self.behaviour(BehaviourRecord::EventTrack, composite, *id, |w| {
                    w.write_guid(track.id);
                    w.write_u32(track.keyframes.len() as u32)?;
                    track.keyframes.iter().try_for_each(|key| key.write(w))
                })?;
            }
        }
        Ok(())
    }

    fn write_resources(&mut self, layout: &Layout<'_>) -> Result<()> {
        let composite = layout.composite.id;
        for reference in &layout.resources {
            self.push(Context::Resource, |w| {
                w.write_guid(composite);
                reference.write(w)
            })?;
        }
        Ok(())
    }

    fn write_parameter(&mut self, composite: ShortGuid, entity: ShortGuid, name: ShortGuid, value: &ParameterValue) -> Result<()> {
        let mut payload = ByteWriter::new();
        value.write(&mut payload, Wire::Stream, self.hasher)?;
        let size = u16::try_from(payload.pos()).map_err(|_| Error::PayloadTooLarge(payload.pos()))?;
        let tag = CommandTag::data(value.data_type().stream_block(), size);
        self.push(Context::Parameter, |w| {
            w.write_guid(composite);
            w.write_guid(entity);
            w.write_guid(name);
            w.write_u32(tag.pack())?;
            w.write_bytes(payload.as_slice());
            Ok(())
        })
    }

    fn write_parameters(&mut self, layout: &Layout<'_>) -> Result<()> {
        let composite = layout.composite.id;
        for entity in &layout.entities {
            let base = entity.base();
            for parameter in &base.parameters {
                self.write_parameter(composite, base.id, parameter.name, &parameter.value)?;
            }
        }
        let name = well_known().name;
        for (entity, text) in &layout.composite.entity_names {
            self.write_parameter(composite, *entity, name, &ParameterValue::String(text.clone()))?;
        }
        Ok(())
    }

    fn write_links(&mut self, layout: &Layout<'_>) -> Result<()> {
        let composite = layout.composite.id;
        for entity in &layout.entities {
            let base = entity.base();
            for link in &base.links {
                self.push(Context::Link, |w| {
                    w.write_guid(composite);
                    w.write_guid(base.id);
                    w.write_guid(link.connection_id);
                    w.write_guid(link.parent_param_id);
                    w.write_guid(link.child_param_id);
                    w.write_guid(link.child_entity_id);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// Header, command array, then the data buffer.
    fn finish(mut self) -> Result<Vec<u8>> {
        self.data.align(PAYLOAD_ALIGN);
        let data = self.data.into_inner();
        let total = FILE_HEADER_SIZE + self.entries.len() * COMMAND_ENTRY_SIZE + data.len();
        let mut out = ByteWriter::with_capacity(total);
        out.write_u32(to_u32(total)?)?;
        out.write_u32(to_u32(self.entries.len())?)?;
        out.write_u32(to_u32(data.len())?)?;
        for (tag, offset) in &self.entries {
            out.write_u32(*tag)?;
            out.write_i32(*offset)?;
        }
        out.write_bytes(&data);
        tracing::debug!("stream: wrote {} commands, {} bytes", self.entries.len(), total);
        Ok(out.into_inner())
    }
}

fn write_path(w: &mut ByteWriter, path: &EntityPath) -> Result<()> {
    w.write_u32(to_u32(path.len())?)?;
    for id in path {
        w.write_guid(*id);
    }
    Ok(())
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::other(format!("{} does not fit in a u32 field", value)))
}
