//! Archive encoding.
//!
//! Per-composite preparation (sorting, picking the entities that appear in
//! each block, gathering resources) runs on rayon. Byte emission is one
//! ordered pass: referenced content is always written before the record
//! pointing at it, so only the header needs backpatching.

use std::collections::HashMap;

use super::format::*;
use crate::guid::{HasherContext, ShortGuid};
use crate::io::{to_words, ByteWriter};
use crate::model::{
    Alias, AnimationData, Commands, Composite, EntityPath, EventKeyframe, FloatKeyframe, Function,
    Keyframe, Link, Parameter, ParameterValue, Proxy, ResourceReference, SequenceData, Track, Variable, Wire,
};
use crate::options::EncodeOptions;
use crate::relink;
use crate::util::{map_slots, Error, Result};

/// Encode a whole archive.
pub fn encode(commands: &Commands, hasher: &HasherContext, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut sorted: Vec<&Composite> = commands.composites.iter().collect();
    sorted.sort_by_key(|c| c.id);
    let layouts = map_slots(&sorted, options.parallel, |c| Layout::prepare(*c));

    let mut writer = ArchiveWriter::new(hasher);
    Header::default().write(&mut writer.w)?;
    for layout in &layouts {
        writer.write_pool(layout)?;
    }

    let mut composite_offsets = Vec::with_capacity(layouts.len());
    for layout in &layouts {
        composite_offsets.push(writer.write_composite(layout)?);
    }

    let param_table = writer.w.pos();
    for &offset in &writer.pool_offsets {
        writer.w.write_u32(to_words(offset)?)?;
    }
    let composite_table = writer.w.pos();
    for &offset in &composite_offsets {
        writer.w.write_u32(to_words(offset)?)?;
    }

    let header = Header {
        root: commands.entry_points.root,
        global: commands.entry_points.global,
        pause_menu: commands.entry_points.pause_menu,
        param_table,
        param_count: writer.pool_offsets.len(),
        composite_table,
        composite_count: composite_offsets.len(),
    };
    header.patch(&mut writer.w)?;
    tracing::debug!(
        "archive: wrote {} pooled parameters, {} composites, {} bytes",
        header.param_count,
        header.composite_count,
        writer.w.pos()
    );

    writer.w.write_bytes(&commands.trailer);
    Ok(writer.w.into_inner())
}

/// Id-sorted view of one composite, split by block.
struct Layout<'c> {
    composite: &'c Composite,
    links: Vec<(ShortGuid, &'c [Link])>,
    parameters: Vec<(ShortGuid, &'c [Parameter])>,
    functions: Vec<&'c Function>,
    variables: Vec<&'c Variable>,
    aliases: Vec<&'c Alias>,
    proxies: Vec<&'c Proxy>,
    sequences: Vec<(ShortGuid, &'c SequenceData)>,
    animations: Vec<(ShortGuid, AnimationData)>,
    resources: Vec<ResourceReference>,
}

impl<'c> Layout<'c> {
    fn prepare(composite: &'c Composite) -> Self {
        let mut entities = composite.all_entities();
        entities.sort_by_key(|e| e.id());

        let links = entities
            .iter()
            .map(|e| e.base())
            .filter(|b| !b.links.is_empty())
            .map(|b| (b.id, b.links.as_slice()))
            .collect();
        let parameters = entities
            .iter()
            .map(|e| e.base())
            .filter(|b| !b.parameters.is_empty())
            .map(|b| (b.id, b.parameters.as_slice()))
            .collect();

        let mut functions: Vec<&Function> = composite.functions.iter().collect();
        functions.sort_by_key(|f| f.base.id);
        let mut variables: Vec<&Variable> = composite.variables.iter().collect();
        variables.sort_by_key(|v| v.base.id);
        let mut aliases: Vec<&Alias> = composite.aliases.iter().collect();
        aliases.sort_by_key(|a| a.base.id);
        let mut proxies: Vec<&Proxy> = composite.proxies.iter().collect();
        proxies.sort_by_key(|p| p.base.id);

        let sequences = functions
            .iter()
            .filter_map(|f| f.sequence().map(|data| (f.base.id, data)))
            .collect();
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

        Self {
            composite,
            links,
            parameters,
            functions,
            variables,
            aliases,
            proxies,
            sequences,
            animations,
            resources: relink::gather(composite),
        }
    }
}

struct ArchiveWriter<'h> {
    w: ByteWriter,
    hasher: &'h HasherContext,
    /// Byte offset of each pooled value, keyed by its pool key.
    pool: HashMap<ParameterValue, usize>,
    pool_offsets: Vec<usize>,
}

impl<'h> ArchiveWriter<'h> {
    fn new(hasher: &'h HasherContext) -> Self {
        Self {
            w: ByteWriter::with_capacity(1 << 20),
            hasher,
            pool: HashMap::new(),
            pool_offsets: Vec::new(),
        }
    }

    /// Append every not yet pooled parameter value of a composite.
    fn write_pool(&mut self, layout: &Layout<'_>) -> Result<()> {
        for (_, parameters) in &layout.parameters {
            for parameter in parameters.iter() {
                let key = parameter.value.pool_key();
                if self.pool.contains_key(&key) {
                    continue;
                }
                let at = self.w.pos();
                self.w.write_guid(key.data_type().archive_tag());
                key.write(&mut self.w, Wire::Archive, self.hasher)?;
                self.w.align(4);
                self.pool.insert(key, at);
                self.pool_offsets.push(at);
            }
        }
        Ok(())
    }

    fn pooled(&self, value: &ParameterValue) -> Result<usize> {
        self.pool
            .get(&value.pool_key())
            .copied()
            .ok_or_else(|| Error::other("parameter value missing from pool"))
    }

    fn set_block(record: &mut PointerRecord, slot: BlockSlot, at: usize, count: usize) -> Result<()> {
        record.set_raw(slot, (to_words(at)?, count as u32));
        Ok(())
    }

    fn write_path(&mut self, path: &EntityPath) -> usize {
        let at = self.w.pos();
        for id in path {
            self.w.write_guid(*id);
        }
        at
    }

    /// Write all blocks of one composite, then its pointer record.
    /// Returns the pointer record offset.
    fn write_composite(&mut self, layout: &Layout<'_>) -> Result<usize> {
        let c = layout.composite;
        let mut record = PointerRecord { id: c.id, preamble: c.opaque.preamble, ..Default::default() };

        let at = self.w.pos();
        self.w.write_guid(c.id);
        self.w.write_cstring(&c.name);
        self.w.align(4);
        record.set_raw(BlockSlot::CompositeHeader, (to_words(at)?, c.opaque.header_count));

        // Links
        let mut subs = Vec::with_capacity(layout.links.len());
        for (_, links) in &layout.links {
            subs.push(self.w.pos());
            for link in links.iter() {
                self.w.write_guid(link.connection_id);
                self.w.write_guid(link.parent_param_id);
                self.w.write_guid(link.child_param_id);
                self.w.write_guid(link.child_entity_id);
            }
        }
        let at = self.w.pos();
        for ((id, links), sub) in layout.links.iter().zip(&subs) {
            self.w.write_guid(*id);
            self.w.write_offset_pair(*sub, links.len())?;
        }
        Self::set_block(&mut record, BlockSlot::EntityConnections, at, layout.links.len())?;

        // Parameters
        let mut subs = Vec::with_capacity(layout.parameters.len());
        for (_, parameters) in &layout.parameters {
            subs.push(self.w.pos());
            for parameter in parameters.iter() {
                let value_at = self.pooled(&parameter.value)?;
                self.w.write_guid(parameter.name);
                self.w.write_u32(to_words(value_at)?)?;
            }
        }
        let at = self.w.pos();
        for ((id, parameters), sub) in layout.parameters.iter().zip(&subs) {
            self.w.write_guid(*id);
            self.w.write_offset_pair(*sub, parameters.len())?;
        }
        Self::set_block(&mut record, BlockSlot::EntityParameters, at, layout.parameters.len())?;

        // Aliases and their path hashes
        let subs: Vec<usize> = layout.aliases.iter().map(|a| self.write_path(&a.path)).collect();
        let at = self.w.pos();
        for (alias, sub) in layout.aliases.iter().zip(&subs) {
            self.w.write_guid(alias.base.id);
            self.w.write_offset_pair(*sub, alias.path.len())?;
        }
        Self::set_block(&mut record, BlockSlot::EntityOverrides, at, layout.aliases.len())?;
        let at = self.w.pos();
        for alias in &layout.aliases {
            self.w.write_guid(alias.base.id);
            self.w.write_guid(alias.path_hash);
        }
        Self::set_block(&mut record, BlockSlot::EntityOverridesChecksum, at, layout.aliases.len())?;

        // Variables
        let at = self.w.pos();
        for variable in &layout.variables {
            self.w.write_guid(variable.base.id);
            self.w.write_guid(variable.name);
            self.w.write_guid(variable.value_type.archive_tag());
        }
        Self::set_block(&mut record, BlockSlot::CompositeExposedParameters, at, layout.variables.len())?;

        // Proxies: the sub-array restates the proxy id before the path.
        let mut subs = Vec::with_capacity(layout.proxies.len());
        for proxy in &layout.proxies {
            subs.push(self.w.pos());
            self.w.write_guid(proxy.base.id);
            self.write_path(&proxy.path);
        }
        let at = self.w.pos();
        for (proxy, sub) in layout.proxies.iter().zip(&subs) {
            self.w.write_guid(proxy.base.id);
            self.w.write_offset_pair(*sub, proxy.path.len())?;
            self.w.write_guid(proxy.function_type);
            self.w.write_guid(proxy.extra_id);
        }
        Self::set_block(&mut record, BlockSlot::EntityProxies, at, layout.proxies.len())?;

        // Functions
        let at = self.w.pos();
        for function in &layout.functions {
            self.w.write_guid(function.base.id);
            self.w.write_guid(function.function_type);
        }
        Self::set_block(&mut record, BlockSlot::EntityFunctions, at, layout.functions.len())?;

        // Resources
        let at = self.w.pos();
        for reference in &layout.resources {
            reference.write(&mut self.w)?;
        }
        Self::set_block(&mut record, BlockSlot::ResourceReferences, at, layout.resources.len())?;

        // Behaviour data, each through a table of record pointers.
        let mut records = Vec::with_capacity(layout.sequences.len());
        for (id, data) in &layout.sequences {
            records.push(self.write_sequence(*id, data)?);
        }
        let at = self.write_pointer_table(&records)?;
        Self::set_block(&mut record, SEQUENCE_SLOT, at, records.len())?;

        let mut records = Vec::with_capacity(layout.animations.len());
        for (id, data) in &layout.animations {
            records.push(self.write_animation(*id, data)?);
        }
        let at = self.write_pointer_table(&records)?;
        Self::set_block(&mut record, ANIMATION_SLOT, at, records.len())?;

        record.set_raw(BlockSlot::Unused, c.opaque.unused);
        record.set_raw(BlockSlot::UnknownCounts, c.opaque.unknown_counts);

        let at = self.w.pos();
        record.write(&mut self.w)?;
        tracing::trace!("composite {} at {}", c.id, at);
        Ok(at)
    }

    fn write_pointer_table(&mut self, records: &[usize]) -> Result<usize> {
        let at = self.w.pos();
        for &offset in records {
            self.w.write_u32(to_words(offset)?)?;
        }
        Ok(at)
    }

    fn write_sequence(&mut self, id: ShortGuid, data: &SequenceData) -> Result<usize> {
        let paths: Vec<usize> = data.entries.iter().map(|e| self.write_path(&e.path)).collect();
        let entries_at = self.w.pos();
        for (entry, path_at) in data.entries.iter().zip(&paths) {
            self.w.write_f32(entry.timing)?;
            self.w.write_offset_pair(*path_at, entry.path.len())?;
        }
        let methods_at = self.w.pos();
        for method in &data.methods {
            self.w.write_guid(method.method);
            self.w.write_guid(method.relay);
            self.w.write_guid(method.finished);
        }

        let at = self.w.pos();
        self.w.write_guid(id);
        self.w.write_offset_pair(entries_at, data.entries.len())?;
        self.w.write_offset_pair(methods_at, data.methods.len())?;
        Ok(at)
    }

    fn write_animation(&mut self, id: ShortGuid, data: &AnimationData) -> Result<usize> {
        let paths: Vec<usize> = data.connections.iter().map(|c| self.write_path(&c.path)).collect();
        let connections_at = self.w.pos();
        for (conn, path_at) in data.connections.iter().zip(&paths) {
            self.w.write_guid(conn.id);
            self.w.write_guid(conn.track_id);
            self.w.write_guid(conn.parameter_id);
            self.w.write_guid(conn.parameter_type.archive_tag());
            self.w.write_guid(conn.parameter_sub_id);
            self.w.write_offset_pair(*path_at, conn.path.len())?;
        }

        let mut keys = Vec::with_capacity(data.float_tracks.len());
        for track in &data.float_tracks {
            keys.push(self.w.pos());
            for key in track.keyframes.iter().chain(std::iter::once(&FloatKeyframe::default())) {
                key.write(&mut self.w)?;
            }
        }
        let floats_at = self.w.pos();
        for (track, keys_at) in data.float_tracks.iter().zip(&keys) {
            self.write_group(track, *keys_at, FloatKeyframe::SIZE)?;
        }

        let mut keys = Vec::with_capacity(data.event_tracks.len());
        for track in &data.event_tracks {
            keys.push(self.w.pos());
            for key in track.keyframes.iter().chain(std::iter::once(&EventKeyframe::default())) {
                key.write(&mut self.w)?;
            }
        }
        let events_at = self.w.pos();
        for (track, keys_at) in data.event_tracks.iter().zip(&keys) {
            self.write_group(track, *keys_at, EventKeyframe::SIZE)?;
        }

        let at = self.w.pos();
        self.w.write_guid(id);
        self.w.write_offset_pair(connections_at, data.connections.len())?;
        self.w.write_offset_pair(floats_at, data.float_tracks.len())?;
        self.w.write_offset_pair(events_at, data.event_tracks.len())?;
        Ok(at)
    }

    /// Group record; min/max come from the sorted keys, the byte length
    /// includes the sentinel key.
    fn write_group<K: Keyframe>(&mut self, track: &Track<K>, keys_at: usize, stride: usize) -> Result<()> {
        self.w.write_guid(track.id);
        self.w.write_f32(track.min_time())?;
        self.w.write_f32(track.max_time())?;
        self.w.write_offset_pair(keys_at, track.keyframes.len())?;
        self.w.write_u32(((track.keyframes.len() + 1) * stride) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceValue;

    #[test]
    fn test_pool_deduplicates_values() {
        let hasher = HasherContext::empty();
        let mut c = Composite::with_id(ShortGuid::from_u32(1), "C");
        for id in 10..13 {
            let base = &mut c.add_function(ShortGuid::from_u32(id), ShortGuid::ZERO).base;
            base.add_parameter(ShortGuid::from_text("delay"), ParameterValue::Float(0.5));
            base.add_parameter(
                ShortGuid::from_text("resource"),
                ParameterValue::Resource(ResourceValue::new(ShortGuid::from_u32(99))),
            );
        }
        let layout = Layout::prepare(&c);
        let mut writer = ArchiveWriter::new(&hasher);
        writer.write_pool(&layout).unwrap();
        assert_eq!(writer.pool_offsets, vec![0, 8]);
    }

    #[test]
    fn test_layout_lists_only_entities_with_data() {
        let mut c = Composite::with_id(ShortGuid::from_u32(1), "C");
        c.add_function(ShortGuid::from_u32(5), ShortGuid::ZERO);
        c.add_function(ShortGuid::from_u32(4), ShortGuid::ZERO)
            .base
            .add_link(ShortGuid::from_u32(1), ShortGuid::ZERO, ShortGuid::from_u32(5), ShortGuid::ZERO);
        let layout = Layout::prepare(&c);
        assert_eq!(layout.links.len(), 1);
        assert!(layout.parameters.is_empty());
        assert_eq!(layout.functions[0].base.id, ShortGuid::from_u32(4));
    }
}
