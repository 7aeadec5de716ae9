//! Entities: the nodes of a composite graph.
//!
//! Every entity kind embeds an [`EntityBase`] with the fields common to all
//! of them. Uniform access goes through the [`EntityRef`] / [`EntityMut`]
//! views, which are matched on rather than downcast.

use super::{
    AnimationData, DataType, EntityPath, Parameter, ParameterValue, ResourceReference, SequenceData,
};
use crate::guid::{well_known, ShortGuid};

/// Directed wire from a parameter on the owning entity to a parameter on
/// `child_entity_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub connection_id: ShortGuid,
    pub parent_param_id: ShortGuid,
    pub child_param_id: ShortGuid,
    pub child_entity_id: ShortGuid,
}

/// Fields shared by every entity kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityBase {
    pub id: ShortGuid,
    pub links: Vec<Link>,
    pub parameters: Vec<Parameter>,
    pub resources: Vec<ResourceReference>,
}

impl EntityBase {
    pub fn new(id: ShortGuid) -> Self {
        Self { id, ..Default::default() }
    }

    /// Find a parameter by name.
    pub fn parameter(&self, name: ShortGuid) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_mut(&mut self, name: ShortGuid) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    /// Set a parameter, replacing any existing value with the same name.
    pub fn add_parameter(&mut self, name: ShortGuid, value: ParameterValue) -> &mut Parameter {
        match self.parameters.iter().position(|p| p.name == name) {
            Some(i) => {
                self.parameters[i].value = value;
                &mut self.parameters[i]
            }
            None => {
                self.parameters.push(Parameter::new(name, value));
                let last = self.parameters.len() - 1;
                &mut self.parameters[last]
            }
        }
    }

    /// Wire `parent_param` on this entity to `child_param` on `child`.
    pub fn add_link(
        &mut self,
        connection_id: ShortGuid,
        parent_param: ShortGuid,
        child: ShortGuid,
        child_param: ShortGuid,
    ) {
        self.links.push(Link {
            connection_id,
            parent_param_id: parent_param,
            child_param_id: child_param,
            child_entity_id: child,
        });
    }

    /// True if nothing but the id is set.
    pub fn is_bare(&self) -> bool {
        self.links.is_empty() && self.parameters.is_empty() && self.resources.is_empty()
    }
}

/// Behaviour-specific payload of a function entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FunctionKind {
    #[default]
    Plain,
    Animation(AnimationData),
    Sequence(SequenceData),
}

/// Entity that runs a built-in behaviour or instances another composite.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub base: EntityBase,
    pub function_type: ShortGuid,
    pub kind: FunctionKind,
}

impl Function {
    /// Create a function, choosing the kind from the function type.
    pub fn new(id: ShortGuid, function_type: ShortGuid) -> Self {
        let ids = well_known();
        let kind = if function_type == ids.cage_animation {
            FunctionKind::Animation(AnimationData::default())
        } else if function_type == ids.trigger_sequence {
            FunctionKind::Sequence(SequenceData::default())
        } else {
            FunctionKind::Plain
        };
        Self { base: EntityBase::new(id), function_type, kind }
    }

    pub fn animation(&self) -> Option<&AnimationData> {
        match &self.kind {
            FunctionKind::Animation(data) => Some(data),
            _ => None,
        }
    }

    pub fn animation_mut(&mut self) -> Option<&mut AnimationData> {
        match &mut self.kind {
            FunctionKind::Animation(data) => Some(data),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<&SequenceData> {
        match &self.kind {
            FunctionKind::Sequence(data) => Some(data),
            _ => None,
        }
    }

    pub fn sequence_mut(&mut self) -> Option<&mut SequenceData> {
        match &mut self.kind {
            FunctionKind::Sequence(data) => Some(data),
            _ => None,
        }
    }

    #[inline]
    pub fn is_zone(&self) -> bool {
        self.function_type == well_known().zone
    }

    #[inline]
    pub fn is_physics_system(&self) -> bool {
        self.function_type == well_known().physics_system
    }
}

/// Entity standing in for an entity inside another composite.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    pub base: EntityBase,
    pub path: EntityPath,
    /// Function type of the entity pointed to.
    pub function_type: ShortGuid,
    /// Unidentified id stored after the function type.
    pub extra_id: ShortGuid,
}

impl Proxy {
    pub fn new(id: ShortGuid, path: EntityPath, function_type: ShortGuid) -> Self {
        Self { base: EntityBase::new(id), path, function_type, extra_id: ShortGuid::ZERO }
    }
}

/// Override applied to an entity inside a nested composite instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub base: EntityBase,
    pub path: EntityPath,
    /// Lookup hash of the path, stored verbatim.
    pub path_hash: ShortGuid,
}

impl Alias {
    pub fn new(id: ShortGuid, path: EntityPath) -> Self {
        Self { base: EntityBase::new(id), path, path_hash: ShortGuid::ZERO }
    }
}

/// Pin exposed on a composite when it is instanced.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub base: EntityBase,
    pub name: ShortGuid,
    pub value_type: DataType,
}

impl Variable {
    pub fn new(id: ShortGuid, name: ShortGuid, value_type: DataType) -> Self {
        Self { base: EntityBase::new(id), name, value_type }
    }
}

/// Borrowed view of any entity.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Function(&'a Function),
    Proxy(&'a Proxy),
    Alias(&'a Alias),
    Variable(&'a Variable),
    /// Synthesised for references to ids that no other list contains.
    Placeholder(&'a EntityBase),
}

impl<'a> EntityRef<'a> {
    pub fn base(&self) -> &'a EntityBase {
        match *self {
            Self::Function(e) => &e.base,
            Self::Proxy(e) => &e.base,
            Self::Alias(e) => &e.base,
            Self::Variable(e) => &e.base,
            Self::Placeholder(b) => b,
        }
    }

    #[inline]
    pub fn id(&self) -> ShortGuid {
        self.base().id
    }

    /// Short label of the entity kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Function(f) => match f.kind {
                FunctionKind::Plain => "function",
                FunctionKind::Animation(_) => "animation",
                FunctionKind::Sequence(_) => "sequence",
            },
            Self::Proxy(_) => "proxy",
            Self::Alias(_) => "alias",
            Self::Variable(_) => "variable",
            Self::Placeholder(_) => "placeholder",
        }
    }
}

/// Mutable view of any entity.
#[derive(Debug)]
pub enum EntityMut<'a> {
    Function(&'a mut Function),
    Proxy(&'a mut Proxy),
    Alias(&'a mut Alias),
    Variable(&'a mut Variable),
    Placeholder(&'a mut EntityBase),
}

impl<'a> EntityMut<'a> {
    pub fn base(&mut self) -> &mut EntityBase {
        match self {
            Self::Function(e) => &mut e.base,
            Self::Proxy(e) => &mut e.base,
            Self::Alias(e) => &mut e.base,
            Self::Variable(e) => &mut e.base,
            Self::Placeholder(b) => b,
        }
    }

    pub fn into_base(self) -> &'a mut EntityBase {
        match self {
            Self::Function(e) => &mut e.base,
            Self::Proxy(e) => &mut e.base,
            Self::Alias(e) => &mut e.base,
            Self::Variable(e) => &mut e.base,
            Self::Placeholder(b) => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_kind_from_type() {
        let ids = well_known();
        let anim = Function::new(ShortGuid::from_u32(1), ids.cage_animation);
        assert!(anim.animation().is_some());
        let seq = Function::new(ShortGuid::from_u32(2), ids.trigger_sequence);
        assert!(seq.sequence().is_some());
        let plain = Function::new(ShortGuid::from_u32(3), ids.zone);
        assert_eq!(plain.kind, FunctionKind::Plain);
        assert!(plain.is_zone());
    }

    #[test]
    fn test_add_parameter_replaces() {
        let mut base = EntityBase::new(ShortGuid::from_u32(1));
        let name = ShortGuid::from_text("delay");
        base.add_parameter(name, ParameterValue::Float(1.0));
        base.add_parameter(name, ParameterValue::Float(2.0));
        assert_eq!(base.parameters.len(), 1);
        assert_eq!(base.parameter(name).map(|p| &p.value), Some(&ParameterValue::Float(2.0)));
    }

    #[test]
    fn test_entity_ref_kind_names() {
        let var = Variable::new(ShortGuid::from_u32(4), ShortGuid::from_text("input"), DataType::Bool);
        let view = EntityRef::Variable(&var);
        assert_eq!(view.kind_name(), "variable");
        assert_eq!(view.id(), ShortGuid::from_u32(4));
    }
}
