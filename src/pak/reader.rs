//! Archive decoding.
//!
//! Layout walk: header, parameter table, composite table. Parameters are
//! decoded into a pool keyed by byte offset, then every composite is
//! decoded independently from its pointer record. Both steps run on rayon
//! when [`DecodeOptions::parallel`] is set; each task owns its own
//! [`ByteReader`] over the shared buffer and returns into its own slot.

use std::collections::HashMap;

use super::format::*;
use crate::guid::{well_known, HasherContext, ShortGuid};
use crate::io::ByteReader;
use crate::model::{
    Alias, AnimationConnection, AnimationData, Commands, Composite, CompositeOpaque, DataType,
    EntityPath, EntryPoints, EventKeyframe, EventTrack, FloatKeyframe, FloatTrack, Function,
    FunctionKind, Link, MethodEntry, Parameter, ParameterValue, Proxy, ResourceReference,
    RESOURCE_RECORD_SIZE, SequenceData, SequenceEntry, Variable, Wire,
};
use crate::options::DecodeOptions;
use crate::relink;
use crate::util::{map_slots, Decoded, Diagnostic, Error, Result};

/// Decode a whole archive.
pub fn decode(data: &[u8], hasher: &HasherContext, options: &DecodeOptions) -> Result<Decoded<Commands>> {
    let mut r = ByteReader::new(data);
    let header = Header::read(&mut r)?;
    tracing::debug!(
        "archive: {} parameters, {} composites, {} bytes",
        header.param_count,
        header.composite_count,
        data.len()
    );

    let param_offsets = read_offset_table(&r, header.param_table, header.param_count)?;
    let composite_offsets = read_offset_table(&r, header.composite_table, header.composite_count)?;
    let pointers = composite_offsets
        .iter()
        .map(|&offset| PointerRecord::read(&mut ByteReader::at(data, offset)?))
        .collect::<Result<Vec<_>>>()?;

    let pool = Pool::decode(data, &header, &param_offsets, &composite_offsets, &pointers, hasher, options)?;
    let mut diagnostics = pool.diagnostics.clone();

    let decoded = map_slots(&pointers, options.parallel, |record| {
        CompositeDecoder::new(data, record, &pool, hasher, options).decode()
    });
    let mut composites = Vec::with_capacity(decoded.len());
    for slot in decoded {
        let (composite, diags) = slot?;
        diagnostics.extend(diags);
        composites.push(composite);
    }

    let entry_points = EntryPoints {
        root: header.root,
        global: header.global,
        pause_menu: header.pause_menu,
    };
    for id in entry_points.as_array() {
        if !id.is_zero() && !composites.iter().any(|c| c.id == id) {
            return Err(Error::MissingEntryPoint(id));
        }
    }

    let end = header.payload_end();
    let trailer = data.get(end..).map(<[u8]>::to_vec).unwrap_or_default();
    if !trailer.is_empty() {
        tracing::debug!("archive: keeping {} trailing bytes", trailer.len());
    }

    diagnostics.iter().for_each(Diagnostic::emit);
    Ok(Decoded::new(Commands { entry_points, composites, trailer }, diagnostics))
}

fn read_offset_table(r: &ByteReader<'_>, offset: usize, count: usize) -> Result<Vec<usize>> {
    r.ensure_table(offset, count, 4)?;
    let mut table = ByteReader::at(r.data(), offset)?;
    (0..count).map(|_| Ok(table.read_u32()? as usize * 4)).collect()
}

/// Pooled parameter values keyed by byte offset.
struct Pool<'a> {
    data: &'a [u8],
    /// Sorted start offsets of every known structure, bounding unknown payloads.
    bounds: Vec<usize>,
    values: HashMap<usize, ParameterValue>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Pool<'a> {
    fn decode(
        data: &'a [u8],
        header: &Header,
        param_offsets: &[usize],
        composite_offsets: &[usize],
        pointers: &[PointerRecord],
        hasher: &HasherContext,
        options: &DecodeOptions,
    ) -> Result<Self> {
        let mut bounds: Vec<usize> = Vec::with_capacity(param_offsets.len() + pointers.len() * 14 + 3);
        bounds.extend_from_slice(param_offsets);
        bounds.extend_from_slice(composite_offsets);
        for record in pointers {
            // Slots 11 and 12 hold raw values, not offsets.
            bounds.extend(record.blocks[..BlockSlot::Unused as usize].iter().map(|(w, _)| *w as usize * 4));
        }
        bounds.extend([header.param_table, header.composite_table, data.len()]);
        bounds.sort_unstable();
        bounds.dedup();

        let mut pool = Self { data, bounds, values: HashMap::with_capacity(param_offsets.len()), diagnostics: Vec::new() };
        let decoded = map_slots(param_offsets, options.parallel, |&offset| pool.read_value(offset, hasher));
        for (&offset, slot) in param_offsets.iter().zip(decoded) {
            let (value, diags) = slot?;
            pool.diagnostics.extend(diags);
            pool.values.insert(offset, value);
        }
        Ok(pool)
    }

    fn read_value(&self, offset: usize, hasher: &HasherContext) -> Result<(ParameterValue, Vec<Diagnostic>)> {
        let mut r = ByteReader::at(self.data, offset)?;
        let data_type = DataType::from_archive_tag(r.read_guid()?);
        let i = self.bounds.partition_point(|&b| b <= offset);
        let end = self.bounds.get(i).copied().unwrap_or(self.data.len());
        let mut diags = Vec::new();
        let value = ParameterValue::read(&mut r, data_type, Wire::Archive, end, hasher, &mut diags)?;
        Ok((value, diags))
    }

    /// Value at `offset`, decoding it directly if it was not in the table.
    fn value_at(&self, offset: usize, hasher: &HasherContext, diagnostics: &mut Vec<Diagnostic>) -> Result<ParameterValue> {
        match self.values.get(&offset) {
            Some(value) => Ok(value.deep_clone()),
            None => {
                tracing::trace!("parameter at {} not in table", offset);
                let (value, diags) = self.read_value(offset, hasher)?;
                diagnostics.extend(diags);
                Ok(value)
            }
        }
    }
}

/// Decodes one composite from its pointer record.
struct CompositeDecoder<'a> {
    data: &'a [u8],
    record: &'a PointerRecord,
    pool: &'a Pool<'a>,
    hasher: &'a HasherContext,
    options: &'a DecodeOptions,
    composite: Composite,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CompositeDecoder<'a> {
    fn new(
        data: &'a [u8],
        record: &'a PointerRecord,
        pool: &'a Pool<'a>,
        hasher: &'a HasherContext,
        options: &'a DecodeOptions,
    ) -> Self {
        Self {
            data,
            record,
            pool,
            hasher,
            options,
            composite: Composite::with_id(record.id, String::new()),
            diagnostics: Vec::new(),
        }
    }

    fn decode(mut self) -> Result<(Composite, Vec<Diagnostic>)> {
        self.read_header()?;
        self.read_functions()?;
        self.read_variables()?;
        self.read_aliases()?;
        self.read_alias_hashes()?;
        self.read_proxies()?;
        self.read_links()?;
        self.read_parameters()?;
        self.read_sequences()?;
        self.read_animations()?;
        self.read_resources()?;
        tracing::trace!(
            "composite {} {:?}: {} entities",
            self.composite.id,
            self.composite.name,
            self.composite.entity_count()
        );
        Ok((self.composite, self.diagnostics))
    }

    /// Reader over a block's records, plus the record count.
    fn block(&self, slot: BlockSlot, stride: usize) -> Result<(ByteReader<'a>, usize)> {
        let (offset, count) = self.record.block(slot);
        if count == 0 {
            return Ok((ByteReader::new(self.data), 0));
        }
        let r = ByteReader::new(self.data);
        r.ensure_table(offset, count, stride)?;
        Ok((ByteReader::at(self.data, offset)?, count))
    }

    fn read_path(&self, offset: usize, count: usize) -> Result<EntityPath> {
        Ok(EntityPath::from_vec(ByteReader::new(self.data).guids_at(offset, count)?))
    }

    fn read_header(&mut self) -> Result<()> {
        let (offset, _) = self.record.block(BlockSlot::CompositeHeader);
        let mut r = ByteReader::at(self.data, offset)?;
        let id = r.read_guid()?;
        if id != self.record.id {
            return Err(Error::IdMismatch { expected: self.record.id, actual: id });
        }
        self.composite.name = r.read_cstring()?;
        self.composite.opaque = CompositeOpaque {
            preamble: self.record.preamble,
            header_count: self.record.raw(BlockSlot::CompositeHeader).1,
            unused: self.record.raw(BlockSlot::Unused),
            unknown_counts: self.record.raw(BlockSlot::UnknownCounts),
        };
        if self.options.verify_names && self.hasher.generate(&self.composite.name) != id {
            self.diagnostics.push(Diagnostic::NameHashMismatch {
                composite: id,
                name: self.composite.name.clone(),
            });
        }
        Ok(())
    }

    fn read_functions(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::EntityFunctions, FUNCTION_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let function_type = r.read_guid()?;
            self.composite.functions.push(Function::new(id, function_type));
        }
        Ok(())
    }

    fn read_variables(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::CompositeExposedParameters, VARIABLE_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let name = r.read_guid()?;
            let tag = r.read_guid()?;
            let value_type = DataType::from_archive_tag(tag);
            if !value_type.is_known() {
                self.diagnostics.push(Diagnostic::UnknownDataType { composite: self.composite.id, tag: tag.to_u32() });
            }
            self.composite.variables.push(Variable::new(id, name, value_type));
        }
        Ok(())
    }

    fn read_aliases(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::EntityOverrides, ENTITY_LIST_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let (offset, len) = r.read_offset_pair()?;
            let path = self.read_path(offset, len)?;
            self.composite.aliases.push(Alias::new(id, path));
        }
        Ok(())
    }

    fn read_alias_hashes(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::EntityOverridesChecksum, ALIAS_HASH_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let path_hash = r.read_guid()?;
            match self.composite.aliases.iter_mut().find(|a| a.base.id == id) {
                Some(alias) => alias.path_hash = path_hash,
                None => {
                    let mut alias = Alias::new(id, EntityPath::new());
                    alias.path_hash = path_hash;
                    self.composite.aliases.push(alias);
                }
            }
        }
        Ok(())
    }

    fn read_proxies(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::EntityProxies, PROXY_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let (offset, len) = r.read_offset_pair()?;
            let function_type = r.read_guid()?;
            let extra_id = r.read_guid()?;

            let ids = ByteReader::new(self.data).guids_at(offset, len + 1)?;
            if ids[0] != id {
                return Err(Error::IdMismatch { expected: id, actual: ids[0] });
            }
            let mut proxy = Proxy::new(id, EntityPath::from_slice(&ids[1..]), function_type);
            proxy.extra_id = extra_id;
            self.composite.proxies.push(proxy);
        }
        Ok(())
    }

    fn note_placeholder(&mut self, created: bool, entity: ShortGuid) {
        if created {
            self.diagnostics.push(Diagnostic::PlaceholderEntity { composite: self.composite.id, entity });
        }
    }

    fn read_links(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::EntityConnections, ENTITY_LIST_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let (offset, len) = r.read_offset_pair()?;
            r.ensure_table(offset, len, LINK_SIZE)?;
            let mut sub = ByteReader::at(self.data, offset)?;
            let mut links = Vec::with_capacity(len);
            for _ in 0..len {
                links.push(Link {
                    connection_id: sub.read_guid()?,
                    parent_param_id: sub.read_guid()?,
                    child_param_id: sub.read_guid()?,
                    child_entity_id: sub.read_guid()?,
                });
            }
            let (base, created) = self.composite.base_or_placeholder(id);
            base.links.extend(links);
            self.note_placeholder(created, id);
        }
        Ok(())
    }

    fn read_parameters(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::EntityParameters, ENTITY_LIST_STRIDE)?;
        for _ in 0..count {
            let id = r.read_guid()?;
            let (offset, len) = r.read_offset_pair()?;
            r.ensure_table(offset, len, PARAM_REF_SIZE)?;
            let mut sub = ByteReader::at(self.data, offset)?;
            let mut parameters = Vec::with_capacity(len);
            for _ in 0..len {
                let name = sub.read_guid()?;
                let value_offset = sub.read_u32()? as usize * 4;
                let value = self.pool.value_at(value_offset, self.hasher, &mut self.diagnostics)?;
                if let DataType::Unknown(tag) = value.data_type() {
                    self.diagnostics.push(Diagnostic::UnknownDataType { composite: self.composite.id, tag });
                }
                parameters.push(Parameter::new(name, value));
            }
            let (base, created) = self.composite.base_or_placeholder(id);
            base.parameters.extend(parameters);
            self.note_placeholder(created, id);
        }
        Ok(())
    }

    /// Function that owns behaviour data, created if the functions block lacked it.
    fn behaviour_owner(&mut self, id: ShortGuid, function_type: ShortGuid) -> &mut Function {
        let composite = self.composite.id;
        match self.composite.functions.iter().position(|f| f.base.id == id) {
            Some(i) => {
                if self.composite.functions[i].function_type != function_type {
                    self.diagnostics.push(Diagnostic::MisplacedBehaviour { composite, entity: id });
                }
                &mut self.composite.functions[i]
            }
            None => {
                self.diagnostics.push(Diagnostic::MisplacedBehaviour { composite, entity: id });
                self.composite.add_function(id, function_type)
            }
        }
    }

    fn read_sequences(&mut self) -> Result<()> {
        let (mut r, count) = self.block(SEQUENCE_SLOT, DATA_POINTER_STRIDE)?;
        for _ in 0..count {
            let offset = r.read_u32()? as usize * 4;
            let mut rec = ByteReader::at(self.data, offset)?;
            rec.ensure(SEQUENCE_RECORD_SIZE)?;
            let id = rec.read_guid()?;
            let (entries_at, entries_len) = rec.read_offset_pair()?;
            let (methods_at, methods_len) = rec.read_offset_pair()?;

            let mut data = SequenceData::default();
            rec.ensure_table(entries_at, entries_len, SEQUENCE_ENTRY_SIZE)?;
            let mut sub = ByteReader::at(self.data, entries_at)?;
            for _ in 0..entries_len {
                let timing = sub.read_f32()?;
                let (path_at, path_len) = sub.read_offset_pair()?;
                data.entries.push(SequenceEntry { path: self.read_path(path_at, path_len)?, timing });
            }
            rec.ensure_table(methods_at, methods_len, METHOD_ENTRY_SIZE)?;
            let mut sub = ByteReader::at(self.data, methods_at)?;
            for _ in 0..methods_len {
                data.methods.push(MethodEntry {
                    method: sub.read_guid()?,
                    relay: sub.read_guid()?,
                    finished: sub.read_guid()?,
                });
            }

            self.behaviour_owner(id, well_known().trigger_sequence).kind = FunctionKind::Sequence(data);
        }
        Ok(())
    }

    fn read_animations(&mut self) -> Result<()> {
        let (mut r, count) = self.block(ANIMATION_SLOT, DATA_POINTER_STRIDE)?;
        for _ in 0..count {
            let offset = r.read_u32()? as usize * 4;
            let mut rec = ByteReader::at(self.data, offset)?;
            rec.ensure(ANIMATION_RECORD_SIZE)?;
            let id = rec.read_guid()?;
            let (conn_at, conn_len) = rec.read_offset_pair()?;
            let (float_at, float_len) = rec.read_offset_pair()?;
            let (event_at, event_len) = rec.read_offset_pair()?;

            let mut data = AnimationData::default();
            rec.ensure_table(conn_at, conn_len, CONNECTION_RECORD_SIZE)?;
            let mut sub = ByteReader::at(self.data, conn_at)?;
            for _ in 0..conn_len {
                let conn_id = sub.read_guid()?;
                let track_id = sub.read_guid()?;
                let parameter_id = sub.read_guid()?;
                let tag = sub.read_guid()?;
                let parameter_sub_id = sub.read_guid()?;
                let (path_at, path_len) = sub.read_offset_pair()?;
                let parameter_type = DataType::from_archive_tag(tag);
                if !parameter_type.is_known() {
                    self.diagnostics.push(Diagnostic::UnknownDataType { composite: self.composite.id, tag: tag.to_u32() });
                }
                data.connections.push(AnimationConnection {
                    id: conn_id,
                    track_id,
                    parameter_id,
                    parameter_type,
                    parameter_sub_id,
                    path: self.read_path(path_at, path_len)?,
                });
            }

            rec.ensure_table(float_at, float_len, KEY_GROUP_SIZE)?;
            let mut sub = ByteReader::at(self.data, float_at)?;
            for _ in 0..float_len {
                let (track_id, keys_at, keys_len) = read_group(&mut sub)?;
                let mut track = FloatTrack::new(track_id);
                sub.ensure_table(keys_at, keys_len, FloatKeyframe::SIZE)?;
                let mut keys = ByteReader::at(self.data, keys_at)?;
                for _ in 0..keys_len {
                    track.keyframes.push(FloatKeyframe::read(&mut keys)?);
                }
                data.float_tracks.push(track);
            }

            rec.ensure_table(event_at, event_len, KEY_GROUP_SIZE)?;
            let mut sub = ByteReader::at(self.data, event_at)?;
            for _ in 0..event_len {
                let (track_id, keys_at, keys_len) = read_group(&mut sub)?;
                let mut track = EventTrack::new(track_id);
                sub.ensure_table(keys_at, keys_len, EventKeyframe::SIZE)?;
                let mut keys = ByteReader::at(self.data, keys_at)?;
                for _ in 0..keys_len {
                    track.keyframes.push(EventKeyframe::read(&mut keys)?);
                }
                data.event_tracks.push(track);
            }

            self.behaviour_owner(id, well_known().cage_animation).kind = FunctionKind::Animation(data);
        }
        Ok(())
    }

    fn read_resources(&mut self) -> Result<()> {
        let (mut r, count) = self.block(BlockSlot::ResourceReferences, RESOURCE_RECORD_SIZE)?;
        let mut loose: Vec<ResourceReference> = Vec::with_capacity(count);
        for _ in 0..count {
            let reference = ResourceReference::read(&mut r)?;
            if !reference.kind.is_known() {
                self.diagnostics.push(Diagnostic::UnknownResourceKind {
                    composite: self.composite.id,
                    tag: reference.kind.tag(),
                });
            }
            loose.push(reference);
        }
        relink::attach(&mut self.composite, loose, &mut self.diagnostics);
        Ok(())
    }
}

/// Keyframe group record: track id, cached min/max, keys pair, byte length.
/// The cached times and byte length are recomputed on encode.
fn read_group(r: &mut ByteReader<'_>) -> Result<(ShortGuid, usize, usize)> {
    let track_id = r.read_guid()?;
    let _min = r.read_f32()?;
    let _max = r.read_f32()?;
    let (keys_at, keys_len) = r.read_offset_pair()?;
    let _byte_len = r.read_u32()?;
    Ok((track_id, keys_at, keys_len))
}
