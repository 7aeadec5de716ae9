//! Composites: named subroutine graphs owning their entities.

use std::collections::BTreeMap;

use super::{
    Alias, DataType, EntityBase, EntityMut, EntityPath, EntityRef, Function, Proxy,
    ResourceReference, Variable,
};
use crate::guid::{HasherContext, ShortGuid};

/// Archive fields with no known meaning, carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositeOpaque {
    /// Word between the composite id and the block table.
    pub preamble: u32,
    /// Count field of the composite header block.
    pub header_count: u32,
    /// Raw `(offset, count)` of the UNUSED block slot.
    pub unused: (u32, u32),
    /// Raw `(offset, count)` of the UNKNOWN_COUNTS block slot.
    pub unknown_counts: (u32, u32),
}

/// A named, id-addressed graph of entities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    pub id: ShortGuid,
    pub name: String,
    pub functions: Vec<Function>,
    pub proxies: Vec<Proxy>,
    pub aliases: Vec<Alias>,
    pub variables: Vec<Variable>,
    /// Entities only known from links or parameters that reference them.
    pub placeholders: Vec<EntityBase>,
    /// Resource references no entity or parameter claimed.
    pub resources: Vec<ResourceReference>,
    /// Entity display names carried by command-stream "name" parameters.
    pub entity_names: BTreeMap<ShortGuid, String>,
    pub opaque: CompositeOpaque,
}

impl Composite {
    /// Create an empty composite whose id is the hash of `name`.
    pub fn new(hasher: &HasherContext, name: impl Into<String>) -> Self {
        let name = name.into();
        Self { id: hasher.generate(&name), name, ..Default::default() }
    }

    /// Create an empty composite with an explicit id.
    pub fn with_id(id: ShortGuid, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), ..Default::default() }
    }

    /// Find any entity by id. Every kind list is searched.
    pub fn find_entity(&self, id: ShortGuid) -> Option<EntityRef<'_>> {
        if let Some(e) = self.functions.iter().find(|e| e.base.id == id) {
            return Some(EntityRef::Function(e));
        }
        if let Some(e) = self.proxies.iter().find(|e| e.base.id == id) {
            return Some(EntityRef::Proxy(e));
        }
        if let Some(e) = self.aliases.iter().find(|e| e.base.id == id) {
            return Some(EntityRef::Alias(e));
        }
        if let Some(e) = self.variables.iter().find(|e| e.base.id == id) {
            return Some(EntityRef::Variable(e));
        }
        self.placeholders.iter().find(|e| e.id == id).map(EntityRef::Placeholder)
    }

    pub fn find_entity_mut(&mut self, id: ShortGuid) -> Option<EntityMut<'_>> {
        if let Some(e) = self.functions.iter_mut().find(|e| e.base.id == id) {
            return Some(EntityMut::Function(e));
        }
        if let Some(e) = self.proxies.iter_mut().find(|e| e.base.id == id) {
            return Some(EntityMut::Proxy(e));
        }
        if let Some(e) = self.aliases.iter_mut().find(|e| e.base.id == id) {
            return Some(EntityMut::Alias(e));
        }
        if let Some(e) = self.variables.iter_mut().find(|e| e.base.id == id) {
            return Some(EntityMut::Variable(e));
        }
        self.placeholders.iter_mut().find(|e| e.id == id).map(EntityMut::Placeholder)
    }

    pub fn contains_entity(&self, id: ShortGuid) -> bool {
        self.find_entity(id).is_some()
    }

    /// Base of the entity with `id`, creating a placeholder if none exists.
    /// The flag is true when a placeholder was created.
    pub fn base_or_placeholder(&mut self, id: ShortGuid) -> (&mut EntityBase, bool) {
        if let Some(i) = self.functions.iter().position(|e| e.base.id == id) {
            return (&mut self.functions[i].base, false);
        }
        if let Some(i) = self.proxies.iter().position(|e| e.base.id == id) {
            return (&mut self.proxies[i].base, false);
        }
        if let Some(i) = self.aliases.iter().position(|e| e.base.id == id) {
            return (&mut self.aliases[i].base, false);
        }
        if let Some(i) = self.variables.iter().position(|e| e.base.id == id) {
            return (&mut self.variables[i].base, false);
        }
        if let Some(i) = self.placeholders.iter().position(|e| e.id == id) {
            return (&mut self.placeholders[i], false);
        }
        self.placeholders.push(EntityBase::new(id));
        let last = self.placeholders.len() - 1;
        (&mut self.placeholders[last], true)
    }

    /// Every entity, in no particular order.
    pub fn all_entities(&self) -> Vec<EntityRef<'_>> {
        let mut all = Vec::with_capacity(self.entity_count());
        all.extend(self.functions.iter().map(EntityRef::Function));
        all.extend(self.proxies.iter().map(EntityRef::Proxy));
        all.extend(self.aliases.iter().map(EntityRef::Alias));
        all.extend(self.variables.iter().map(EntityRef::Variable));
        all.extend(self.placeholders.iter().map(EntityRef::Placeholder));
        all
    }

    /// Mutable bases of every entity.
    pub fn all_bases_mut(&mut self) -> impl Iterator<Item = &mut EntityBase> {
        self.functions
            .iter_mut()
            .map(|e| &mut e.base)
            .chain(self.proxies.iter_mut().map(|e| &mut e.base))
            .chain(self.aliases.iter_mut().map(|e| &mut e.base))
            .chain(self.variables.iter_mut().map(|e| &mut e.base))
            .chain(self.placeholders.iter_mut())
    }

    pub fn entity_count(&self) -> usize {
        self.functions.len()
            + self.proxies.len()
            + self.aliases.len()
            + self.variables.len()
            + self.placeholders.len()
    }

    /// Stable sort of every entity list by numeric id.
    pub fn sort_entities(&mut self) {
        self.functions.sort_by_key(|e| e.base.id);
        self.proxies.sort_by_key(|e| e.base.id);
        self.aliases.sort_by_key(|e| e.base.id);
        self.variables.sort_by_key(|e| e.base.id);
        self.placeholders.sort_by_key(|e| e.id);
    }

    pub fn function(&self, id: ShortGuid) -> Option<&Function> {
        self.functions.iter().find(|e| e.base.id == id)
    }

    pub fn function_mut(&mut self, id: ShortGuid) -> Option<&mut Function> {
        self.functions.iter_mut().find(|e| e.base.id == id)
    }

    /// Add a function entity and return it for further setup.
    pub fn add_function(&mut self, id: ShortGuid, function_type: ShortGuid) -> &mut Function {
        self.functions.push(Function::new(id, function_type));
        let last = self.functions.len() - 1;
        &mut self.functions[last]
    }

    pub fn add_proxy(&mut self, id: ShortGuid, path: EntityPath, function_type: ShortGuid) -> &mut Proxy {
        self.proxies.push(Proxy::new(id, path, function_type));
        let last = self.proxies.len() - 1;
        &mut self.proxies[last]
    }

    pub fn add_alias(&mut self, id: ShortGuid, path: EntityPath) -> &mut Alias {
        self.aliases.push(Alias::new(id, path));
        let last = self.aliases.len() - 1;
        &mut self.aliases[last]
    }

    pub fn add_variable(&mut self, id: ShortGuid, name: ShortGuid, value_type: DataType) -> &mut Variable {
        self.variables.push(Variable::new(id, name, value_type));
        let last = self.variables.len() - 1;
        &mut self.variables[last]
    }

    /// Remove an entity and every link pointing at it.
    pub fn remove_entity(&mut self, id: ShortGuid) -> bool {
        let before = self.entity_count();
        self.functions.retain(|e| e.base.id != id);
        self.proxies.retain(|e| e.base.id != id);
        self.aliases.retain(|e| e.base.id != id);
        self.variables.retain(|e| e.base.id != id);
        self.placeholders.retain(|e| e.id != id);
        if self.entity_count() == before {
            return false;
        }
        for base in self.all_bases_mut() {
            base.links.retain(|l| l.child_entity_id != id);
        }
        self.entity_names.remove(&id);
        true
    }

    /// Id of the first physics-system function, if any.
    pub fn physics_system(&self) -> Option<ShortGuid> {
        self.functions.iter().find(|f| f.is_physics_system()).map(|f| f.base.id)
    }
}
