//! Integration tests for the offset-table archive codec.

mod common;

use cathode::io::ByteReader;
use cathode::model::{Commands, EntryPoints, FunctionKind, ParameterValue, ResourceKind, ResourceReference};
use cathode::pak::format::{BlockSlot, Header, PointerRecord, ANIMATION_SLOT, SEQUENCE_SLOT};
use cathode::prelude::{well_known, DecodeOptions, Diagnostic, EncodeOptions, Error, HasherContext, ShortGuid};
use common::{id, level_composite, small_composite};

use tempfile::TempDir;

fn sample(hasher: &HasherContext) -> Commands {
    let level = level_composite(hasher, "LEVELS\\TEST\\ROOT");
    let global = small_composite(hasher, "GLOBAL");
    let pause = small_composite(hasher, "PAUSEMENU");
    let mut commands = Commands::new(EntryPoints { root: level.id, global: global.id, pause_menu: pause.id });
    commands.composites = vec![global, level, pause];
    commands.trailer = b"custom names".to_vec();
    commands
}

fn encode(commands: &Commands, hasher: &HasherContext) -> Vec<u8> {
    cathode::pak::encode(commands, hasher, &EncodeOptions::default()).expect("encode failed")
}

fn decode(bytes: &[u8], hasher: &HasherContext) -> Commands {
    cathode::pak::decode(bytes, hasher, &DecodeOptions::default()).expect("decode failed").value
}

/// Pointer record of the composite with `id`.
fn pointer_record(bytes: &[u8], id: ShortGuid) -> PointerRecord {
    let header = Header::read(&mut ByteReader::new(bytes)).unwrap();
    let mut table = ByteReader::at(bytes, header.composite_table).unwrap();
    for _ in 0..header.composite_count {
        let offset = table.read_u32().unwrap() as usize * 4;
        let record = PointerRecord::read(&mut ByteReader::at(bytes, offset).unwrap()).unwrap();
        if record.id == id {
            return record;
        }
    }
    panic!("no pointer record for {}", id);
}

#[test]
fn test_roundtrip_graph_and_bytes() {
    let hasher = HasherContext::new();
    let mut original = sample(&hasher);
    let bytes = encode(&original, &hasher);

    let decoded = cathode::pak::decode(&bytes, &hasher, &DecodeOptions::default()).unwrap();
    let mut back = decoded.value;

    // The link from the unknown entity is the only finding.
    assert_eq!(
        decoded.diagnostics,
        vec![Diagnostic::PlaceholderEntity { composite: original.entry_points.root, entity: id(50) }]
    );

    assert_eq!(encode(&back, &hasher), bytes, "re-encode must be byte-identical");

    original.sort();
    back.sort();
    assert_eq!(back, original);
}

#[test]
fn test_entry_points_and_trailer() {
    let hasher = HasherContext::new();
    let original = sample(&hasher);
    let back = decode(&encode(&original, &hasher), &hasher);
    assert_eq!(back.entry_points, original.entry_points);
    assert_eq!(back.trailer, b"custom names");
    assert_eq!(back.root_composite().map(|c| c.name.as_str()), Some("LEVELS\\TEST\\ROOT"));
    assert!(back.composite_by_name("levels/test/root").is_some());
}

#[test]
fn test_composites_written_in_id_order() {
    let hasher = HasherContext::new();
    let bytes = encode(&sample(&hasher), &hasher);
    let back = decode(&bytes, &hasher);
    let ids: Vec<ShortGuid> = back.composites.iter().map(|c| c.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_missing_entry_point_fails() {
    let hasher = HasherContext::new();
    let mut commands = sample(&hasher);
    commands.entry_points.global = id(0x5555);
    let bytes = encode(&commands, &hasher);
    let err = cathode::pak::decode(&bytes, &hasher, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, cathode::Error::MissingEntryPoint(missing) if missing == id(0x5555)));
}

#[test]
fn test_sequence_and_animation_slots_are_swapped() {
    let hasher = HasherContext::new();
    let commands = sample(&hasher);
    let bytes = encode(&commands, &hasher);
    let record = pointer_record(&bytes, commands.entry_points.root);

    assert_eq!(SEQUENCE_SLOT as usize, 9);
    assert_eq!(record.block(SEQUENCE_SLOT).1, 1);
    assert_eq!(record.block(ANIMATION_SLOT).1, 1);

    // The sequence record in slot 9 starts with the TriggerSequence function id.
    let (table, _) = record.block(SEQUENCE_SLOT);
    let mut r = ByteReader::at(&bytes, table).unwrap();
    let seq_at = r.read_u32().unwrap() as usize * 4;
    assert_eq!(ByteReader::at(&bytes, seq_at).unwrap().read_guid().unwrap(), id(400));

    let back = decode(&bytes, &hasher);
    let level = back.root_composite().unwrap();
    assert!(matches!(level.function(id(400)).unwrap().kind, FunctionKind::Sequence(_)));
    assert!(matches!(level.function(id(300)).unwrap().kind, FunctionKind::Animation(_)));
}

#[test]
fn test_keyframe_arrays_carry_sentinel() {
    let hasher = HasherContext::new();
    let commands = sample(&hasher);
    let bytes = encode(&commands, &hasher);
    let record = pointer_record(&bytes, commands.entry_points.root);

    let (table, _) = record.block(ANIMATION_SLOT);
    let anim_at = ByteReader::at(&bytes, table).unwrap().read_u32().unwrap() as usize * 4;
    let mut anim = ByteReader::at(&bytes, anim_at).unwrap();
    assert_eq!(anim.read_guid().unwrap(), id(300));
    let _connections = anim.read_offset_pair().unwrap();
    let (groups_at, groups) = anim.read_offset_pair().unwrap();
    assert_eq!(groups, 1);

    let mut group = ByteReader::at(&bytes, groups_at).unwrap();
    assert_eq!(group.read_guid().unwrap(), id(302));
    assert_eq!(group.read_f32().unwrap(), 0.0);
    assert_eq!(group.read_f32().unwrap(), 2.0);
    let (_, keys) = group.read_offset_pair().unwrap();
    assert_eq!(keys, 3);
    // Byte length covers the keys plus the trailing sentinel key.
    assert_eq!(group.read_u32().unwrap() as usize, (keys + 1) * 32);
}

#[test]
fn test_unknown_tags_survive() {
    let hasher = HasherContext::new();
    let mut commands = sample(&hasher);
    let raw_tag = 0x0BAD_F00D;
    let unknown_kind = ResourceKind::Unknown { tag: id(0x7777_0001), raw: [1, 2, 3, 4, 5, 6, 7, 8] };
    {
        let level = commands.composite_mut(commands.entry_points.root).unwrap();
        let model = level.function_mut(id(200)).unwrap();
        model.base.add_parameter(
            hasher.generate("mystery"),
            ParameterValue::Unknown { tag: raw_tag, raw: vec![9, 8, 7, 6, 5, 4, 3, 2] },
        );
        model.base.resources.push(ResourceReference::new(id(200), unknown_kind));
    }
    let bytes = encode(&commands, &hasher);
    let decoded = cathode::pak::decode(&bytes, &hasher, &DecodeOptions::default()).unwrap();
    let root = commands.entry_points.root;
    assert!(decoded.diagnostics.contains(&Diagnostic::UnknownDataType { composite: root, tag: raw_tag }));
    assert!(decoded
        .diagnostics
        .contains(&Diagnostic::UnknownResourceKind { composite: root, tag: id(0x7777_0001) }));

    let model = decoded.value.composite(root).unwrap().function(id(200)).unwrap().clone();
    let mystery = model.base.parameter(hasher.generate("mystery")).unwrap();
    assert_eq!(mystery.value, ParameterValue::Unknown { tag: raw_tag, raw: vec![9, 8, 7, 6, 5, 4, 3, 2] });
    assert!(model.base.resources.iter().any(|r| r.kind == unknown_kind));

    assert_eq!(encode(&decoded.value, &hasher), bytes);
}

#[test]
fn test_relinking_after_decode() {
    let hasher = HasherContext::new();
    let back = decode(&encode(&sample(&hasher), &hasher), &hasher);
    let level = back.root_composite().unwrap();

    let zone = level.function(id(100)).unwrap();
    let value = zone.base.parameter(hasher.generate("resource")).unwrap().value.as_resource().unwrap();
    assert_eq!(value.entries.len(), 1);
    assert!(zone.base.resources.is_empty());

    assert_eq!(level.function(id(200)).unwrap().base.resources.len(), 1);
    let physics = level.function(id(250)).unwrap();
    assert!(physics.is_physics_system());
    assert_eq!(physics.base.resources.len(), 1);
    assert!(level.resources.is_empty());
}

#[test]
fn test_identical_values_are_pooled() {
    let hasher = HasherContext::new();
    let mut commands = sample(&hasher);
    let before = encode(&commands, &hasher).len();
    {
        let level = commands.composite_mut(commands.entry_points.root).unwrap();
        // Same value as the zone's "delay" parameter.
        level.function_mut(id(200)).unwrap().base.add_parameter(hasher.generate("delay"), ParameterValue::Float(0.25));
    }
    let after = encode(&commands, &hasher);
    let header = Header::read(&mut ByteReader::new(&after)).unwrap();
    let before_header = Header::read(&mut ByteReader::new(&encode(&sample(&hasher), &hasher))).unwrap();
    assert_eq!(header.param_count, before_header.param_count);
    // Only the 8-byte parameter reference is new.
    assert_eq!(after.len(), before + 8);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let hasher = HasherContext::new();
    let commands = sample(&hasher);
    let parallel = cathode::pak::encode(&commands, &hasher, &EncodeOptions { parallel: true }).unwrap();
    let sequential = cathode::pak::encode(&commands, &hasher, &EncodeOptions { parallel: false }).unwrap();
    assert_eq!(parallel, sequential);

    let a = cathode::pak::decode(&parallel, &hasher, &DecodeOptions::default()).unwrap();
    let b = cathode::pak::decode(&parallel, &hasher, &DecodeOptions::sequential()).unwrap();
    assert_eq!(a.value, b.value);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn test_truncated_archive_is_out_of_bounds() {
    let hasher = HasherContext::new();
    let bytes = encode(&sample(&hasher), &hasher);
    let err = cathode::pak::decode(&bytes[..bytes.len() / 2], &hasher, &DecodeOptions::default()).unwrap_err();
    assert!(err.is_out_of_bounds());
}

#[test]
fn test_name_hash_check() {
    let hasher = HasherContext::new();
    let mut commands = sample(&hasher);
    let global = commands.entry_points.global;
    commands.composite_mut(global).unwrap().name = "RENAMED".into();
    let bytes = encode(&commands, &hasher);

    let checked = cathode::pak::decode(&bytes, &hasher, &DecodeOptions::default()).unwrap();
    assert!(checked
        .diagnostics
        .contains(&Diagnostic::NameHashMismatch { composite: global, name: "RENAMED".into() }));

    let options = DecodeOptions { verify_names: false, ..DecodeOptions::default() };
    let unchecked = cathode::pak::decode(&bytes, &hasher, &options).unwrap();
    assert!(!unchecked.diagnostics.iter().any(|d| matches!(d, Diagnostic::NameHashMismatch { .. })));
}

#[test]
fn test_file_helpers() {
    let hasher = HasherContext::new();
    let commands = sample(&hasher);
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("COMMANDS.PAK");

    cathode::pak::save(&path, &commands, &hasher, &EncodeOptions::default()).unwrap();
    let loaded = cathode::pak::open(&path, &hasher, &DecodeOptions::default()).unwrap();
    assert_eq!(loaded.value.composites.len(), 3);
    assert_eq!(std::fs::read(&path).unwrap(), encode(&loaded.value, &hasher));

    let missing = cathode::pak::open(dir.path().join("missing.pak"), &hasher, &DecodeOptions::default());
    assert!(matches!(missing, Err(cathode::Error::FileNotFound(_))));
}

#[test]
fn test_zone_keeps_name_parameter() {
    let hasher = HasherContext::new();
    let back = decode(&encode(&sample(&hasher), &hasher), &hasher);
    let zone = back.root_composite().unwrap().function(id(100)).unwrap();
    assert_eq!(
        zone.base.parameter(well_known().name).and_then(|p| p.value.as_str()),
        Some("zone_a")
    );
}

#[test]
fn test_restated_ids_must_match() {
    let hasher = HasherContext::new();
    let commands = sample(&hasher);
    let root = commands.entry_points.root;
    let bytes = encode(&commands, &hasher);
    let record = pointer_record(&bytes, root);
    let decode_err = |bytes: &[u8]| {
        cathode::pak::decode(bytes, &hasher, &DecodeOptions::sequential()).unwrap_err()
    };

    // First id of the proxy's path restates the proxy id.
    let (proxies, count) = record.block(BlockSlot::EntityProxies);
    assert_eq!(count, 1);
    let mut r = ByteReader::at(&bytes, proxies).unwrap();
    assert_eq!(r.read_guid().unwrap(), id(800));
    let path_at = r.read_u32().unwrap() as usize * 4;
    let mut corrupt = bytes.clone();
    corrupt[path_at..path_at + 4].copy_from_slice(&id(801).to_bytes());
    match decode_err(&corrupt) {
        Error::IdMismatch { expected, actual } => {
            assert_eq!(expected, id(800));
            assert_eq!(actual, id(801));
        }
        other => panic!("unexpected error {:?}", other),
    }

    // Composite header restates the pointer record id.
    let (header_at, _) = record.block(BlockSlot::CompositeHeader);
    let mut corrupt = bytes.clone();
    corrupt[header_at..header_at + 4].copy_from_slice(&id(7).to_bytes());
    assert!(matches!(decode_err(&corrupt), Error::IdMismatch { expected, .. } if expected == root));
}
