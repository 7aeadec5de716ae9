//! Resource relinking.
//!
//! Both formats store a composite's resource references as one flat list.
//! After decoding, [`attach`] hands each reference to the parameter or
//! entity that owns it; before encoding, [`gather`] collects them back.
//!
//! Owner resolution order:
//! 1. a `Resource` parameter whose value id equals the owner id
//! 2. the entity whose id equals the owner id
//! 3. the composite's physics-system function, for physics-system kinds
//!
//! Anything left stays on [`Composite::resources`].

use std::collections::HashMap;

use crate::guid::ShortGuid;
use crate::model::{Composite, EntityBase, ResourceReference};
use crate::util::Diagnostic;

#[derive(Clone, Copy)]
enum Target {
    Parameter { entity: usize, parameter: usize },
    Entity(usize),
}

/// Attach loose references to their owners inside `composite`.
///
/// Entity indices below are positions in [`Composite::all_entities`] order,
/// which matches [`Composite::all_bases_mut`].
pub fn attach(composite: &mut Composite, loose: Vec<ResourceReference>, diagnostics: &mut Vec<Diagnostic>) {
    if loose.is_empty() {
        return;
    }

    let mut by_param: HashMap<ShortGuid, (usize, usize)> = HashMap::new();
    let mut by_entity: HashMap<ShortGuid, usize> = HashMap::new();
    for (i, entity) in composite.all_entities().iter().enumerate() {
        let base = entity.base();
        by_entity.entry(base.id).or_insert(i);
        for (p, param) in base.parameters.iter().enumerate() {
            if let Some(value) = param.value.as_resource() {
                by_param.entry(value.id).or_insert((i, p));
            }
        }
    }
    // Functions come first in entity order, so the function index is the entity index.
    let physics = composite
        .functions
        .iter()
        .position(|f| f.is_physics_system());

    let mut assigned: Vec<(Target, ResourceReference)> = Vec::with_capacity(loose.len());
    let mut leftovers = Vec::new();
    for reference in loose {
        let target = if let Some(&(entity, parameter)) = by_param.get(&reference.owner_id) {
            Some(Target::Parameter { entity, parameter })
        } else if let Some(&entity) = by_entity.get(&reference.owner_id) {
            Some(Target::Entity(entity))
        } else if reference.kind.is_physics_system() {
            physics.map(Target::Entity)
        } else {
            None
        };
        match target {
            Some(target) => assigned.push((target, reference)),
            None => leftovers.push(reference),
        }
    }

    let mut bases: Vec<&mut EntityBase> = composite.all_bases_mut().collect();
    for (target, reference) in assigned {
        match target {
            Target::Parameter { entity, parameter } => {
                if let Some(value) = bases[entity].parameters[parameter].value.as_resource_mut() {
                    value.entries.push(reference);
                }
            }
            Target::Entity(entity) => bases[entity].resources.push(reference),
        }
    }

    let lone_physics = leftovers.len() == 1 && leftovers[0].kind.is_physics_system();
    if !leftovers.is_empty() && !lone_physics {
        diagnostics.push(Diagnostic::UnassignedResources {
            composite: composite.id,
            count: leftovers.len(),
        });
    }
    tracing::trace!(
        "composite {}: {} resource reference(s) unassigned",
        composite.id,
        leftovers.len()
    );
    composite.resources.extend(leftovers);
}

/// Collect every attached and unassigned reference back into one list.
///
/// Entities are visited in id order; each contributes its resource
/// parameter entries first, then its own references. Unassigned references
/// come last. Bit-identical duplicates are dropped.
pub fn gather(composite: &Composite) -> Vec<ResourceReference> {
    let mut entities = composite.all_entities();
    entities.sort_by_key(|e| e.id());

    let mut out: Vec<ResourceReference> = Vec::new();
    let mut push = |reference: &ResourceReference| {
        if !out.iter().any(|r| r.same_bits(reference)) {
            out.push(*reference);
        }
    };
    for entity in &entities {
        let base = entity.base();
        for param in &base.parameters {
            if let Some(value) = param.value.as_resource() {
                value.entries.iter().for_each(&mut push);
            }
        }
        base.resources.iter().for_each(&mut push);
    }
    composite.resources.iter().for_each(&mut push);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::well_known;
    use crate::model::{ParameterValue, ResourceKind, ResourceValue};

    fn reference(owner: ShortGuid, kind: ResourceKind) -> ResourceReference {
        ResourceReference::new(owner, kind)
    }

    #[test]
    fn test_parameter_wins_over_entity() {
        let owner = ShortGuid::from_u32(500);
        let mut c = Composite::default();
        c.add_function(ShortGuid::from_u32(1), ShortGuid::from_text("ModelReference"))
            .base
            .add_parameter(
                ShortGuid::from_text("resource"),
                ParameterValue::Resource(ResourceValue::new(owner)),
            );
        c.add_function(owner, ShortGuid::from_text("ModelReference"));

        let mut diags = Vec::new();
        attach(&mut c, vec![reference(owner, ResourceKind::TraversalSegment)], &mut diags);

        let param = c.function(ShortGuid::from_u32(1)).unwrap().base.parameters[0].value.clone();
        assert_eq!(param.as_resource().unwrap().entries.len(), 1);
        assert!(c.function(owner).unwrap().base.resources.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_entity_then_physics_fallback() {
        let entity = ShortGuid::from_u32(2);
        let mut c = Composite::default();
        c.add_function(entity, ShortGuid::from_text("ModelReference"));
        c.add_function(ShortGuid::from_u32(3), well_known().physics_system);

        let mut diags = Vec::new();
        let stray = reference(ShortGuid::from_u32(999), ResourceKind::DynamicPhysicsSystem { index: 4 });
        attach(
            &mut c,
            vec![reference(entity, ResourceKind::NavMeshBarrierResource), stray],
            &mut diags,
        );

        assert_eq!(c.function(entity).unwrap().base.resources.len(), 1);
        assert_eq!(c.function(ShortGuid::from_u32(3)).unwrap().base.resources, vec![stray]);
        assert!(c.resources.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_leftovers_reported() {
        let mut c = Composite::default();
        let mut diags = Vec::new();
        attach(
            &mut c,
            vec![reference(ShortGuid::from_u32(9), ResourceKind::DynamicPhysicsSystem { index: 0 })],
            &mut diags,
        );
        assert_eq!(c.resources.len(), 1);
        assert!(diags.is_empty());

        attach(
            &mut c,
            vec![
                reference(ShortGuid::from_u32(9), ResourceKind::TraversalSegment),
                reference(ShortGuid::from_u32(8), ResourceKind::TraversalSegment),
            ],
            &mut diags,
        );
        assert_eq!(c.resources.len(), 3);
        assert!(matches!(diags[..], [Diagnostic::UnassignedResources { count: 2, .. }]));
    }

    #[test]
    fn test_gather_order_and_dedup() {
        let mut c = Composite::default();
        let late = ShortGuid::from_u32(20);
        let early = ShortGuid::from_u32(10);
        c.add_function(late, ShortGuid::ZERO);
        c.add_function(early, ShortGuid::ZERO);
        let a = reference(late, ResourceKind::TraversalSegment);
        let b = reference(early, ResourceKind::NavMeshBarrierResource);
        let stray = reference(ShortGuid::from_u32(30), ResourceKind::ExclusiveMasterStateResource);

        let mut diags = Vec::new();
        attach(&mut c, vec![a, b, a, stray], &mut diags);
        assert_eq!(gather(&c), vec![b, a, stray]);
    }
}
