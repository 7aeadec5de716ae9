//! Graph builders shared by the integration tests.

#![allow(dead_code)]

use cathode::model::{
    AnimationConnection, Composite, DataType, EntityPath, EnumValue, EventKeyframe, EventTrack,
    FloatKeyframe, FloatTrack, MethodEntry, ParameterValue, ResourceKind, ResourceReference,
    ResourceValue, SequenceEntry, Transform,
};
use cathode::prelude::{well_known, HasherContext, ShortGuid};
use glam::{Vec2, Vec3};

pub fn id(n: u32) -> ShortGuid {
    ShortGuid::from_u32(n)
}

pub fn path(ids: &[u32]) -> EntityPath {
    ids.iter().map(|&n| id(n)).collect()
}

/// A composite exercising every entity kind, parameter type and
/// resource-owner rule.
pub fn level_composite(hasher: &HasherContext, name: &str) -> Composite {
    let ids = well_known();
    let mut c = Composite::new(hasher, name);

    let zone = c.add_function(id(100), ids.zone);
    zone.base.add_parameter(ids.name, ParameterValue::String("zone_a".into()));
    zone.base.add_parameter(hasher.generate("delay"), ParameterValue::Float(0.25));
    zone.base.add_parameter(hasher.generate("count"), ParameterValue::Integer(-7));
    zone.base.add_parameter(hasher.generate("enabled"), ParameterValue::Bool(true));
    zone.base.add_parameter(hasher.generate("colour"), ParameterValue::Vector(Vec3::new(0.5, 1.0, 2.0)));
    zone.base.add_parameter(
        hasher.generate("position"),
        ParameterValue::Transform(Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(10.0, 20.0, 30.0))),
    );
    zone.base.add_parameter(
        hasher.generate("mode"),
        ParameterValue::Enum(EnumValue { enum_id: hasher.generate("FOLLOW_TYPE"), index: 2 }),
    );
    zone.base.add_parameter(
        hasher.generate("points"),
        ParameterValue::Spline(vec![
            Transform::new(Vec3::ZERO, Vec3::ZERO),
            Transform::new(Vec3::ONE, Vec3::new(0.0, 90.0, 0.0)),
        ]),
    );
    zone.base.add_parameter(hasher.generate("none"), ParameterValue::NoType);
    zone.base.add_parameter(hasher.generate("resource"), ParameterValue::Resource(ResourceValue::new(id(900))));
    zone.base.add_link(id(1), hasher.generate("on_enter"), id(200), hasher.generate("trigger"));

    let model = c.add_function(id(200), hasher.generate("ModelReference"));
    model.base.add_parameter(hasher.generate("text"), ParameterValue::String("hello".into()));
    model.base.add_link(id(2), hasher.generate("finished"), id(300), hasher.generate("start"));

    c.add_function(id(250), ids.physics_system);

    let anim = c.add_function(id(300), ids.cage_animation);
    if let Some(data) = anim.animation_mut() {
        data.connections.push(AnimationConnection {
            id: id(301),
            track_id: id(302),
            parameter_id: hasher.generate("position"),
            parameter_type: DataType::Transform,
            parameter_sub_id: ShortGuid::ZERO,
            path: path(&[100]),
        });
        let mut floats = FloatTrack::new(id(302));
        for (i, time) in [0.0f32, 0.5, 2.0].into_iter().enumerate() {
            floats.keyframes.push(FloatKeyframe {
                mode: 1,
                time,
                value: Vec2::new(i as f32, 0.0),
                tan_in: Vec2::new(-0.1, 0.0),
                tan_out: Vec2::new(0.1, 0.0),
            });
        }
        data.float_tracks.push(floats);
        let mut events = EventTrack::new(id(303));
        events.keyframes.push(EventKeyframe {
            mode: 0,
            time: 1.0,
            forward: hasher.generate("open"),
            reverse: hasher.generate("close"),
            track_type: ShortGuid::ZERO,
            duration: 0.0,
        });
        data.event_tracks.push(events);
    }

    let seq = c.add_function(id(400), ids.trigger_sequence);
    if let Some(data) = seq.sequence_mut() {
        data.entries.push(SequenceEntry { path: path(&[100]), timing: 0.0 });
        data.entries.push(SequenceEntry { path: path(&[200, 201]), timing: 1.5 });
        data.methods.push(MethodEntry {
            method: hasher.generate("trigger"),
            relay: hasher.generate("triggered"),
            finished: hasher.generate("finished"),
        });
    }

    c.add_variable(id(500), hasher.generate("input"), DataType::Float);
    c.add_alias(id(600), path(&[700, 701])).path_hash = id(0xABCD);
    c.add_proxy(id(800), path(&[1, 2, 3]), ids.zone).extra_id = id(0x1234);

    // Link whose parent exists nowhere else.
    c.base_or_placeholder(id(50)).0.add_link(id(3), ShortGuid::ZERO, id(100), ShortGuid::ZERO);

    // Owned by the resource parameter value.
    let mut by_param = ResourceReference::new(id(900), ResourceKind::RenderableInstance { index: 4, count: 2 });
    by_param.position = Vec3::new(5.0, 6.0, 7.0);
    if let Some(value) = c
        .function_mut(id(100))
        .and_then(|f| f.base.parameter_mut(hasher.generate("resource")))
        .and_then(|p| p.value.as_resource_mut())
    {
        value.entries.push(by_param);
    }
    // Owned by the entity itself.
    if let Some(model) = c.function_mut(id(200)) {
        model.base.resources.push(ResourceReference::new(id(200), ResourceKind::AnimatedModel { index: 9 }));
    }
    // Physics resource with no owner: parked on the physics-system function.
    if let Some(physics) = c.function_mut(id(250)) {
        physics.base.resources.push(ResourceReference::new(id(9999), ResourceKind::DynamicPhysicsSystem { index: 1 }));
    }
    c
}

/// A composite with one empty zone, for entry points.
pub fn small_composite(hasher: &HasherContext, name: &str) -> Composite {
    let mut c = Composite::new(hasher, name);
    c.add_function(id(1), well_known().zone);
    c
}
