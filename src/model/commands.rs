//! Top-level containers produced by the two codecs.

use super::Composite;
use crate::guid::ShortGuid;

/// The three composites the engine starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryPoints {
    pub root: ShortGuid,
    pub global: ShortGuid,
    pub pause_menu: ShortGuid,
}

impl EntryPoints {
    pub fn as_array(&self) -> [ShortGuid; 3] {
        [self.root, self.global, self.pause_menu]
    }
}

/// A decoded `COMMANDS.PAK` archive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Commands {
    pub entry_points: EntryPoints,
    pub composites: Vec<Composite>,
    /// Bytes after the last table, carried through unchanged.
    pub trailer: Vec<u8>,
}

impl Commands {
    pub fn new(entry_points: EntryPoints) -> Self {
        Self { entry_points, ..Default::default() }
    }

    pub fn composite(&self, id: ShortGuid) -> Option<&Composite> {
        self.composites.iter().find(|c| c.id == id)
    }

    pub fn composite_mut(&mut self, id: ShortGuid) -> Option<&mut Composite> {
        self.composites.iter_mut().find(|c| c.id == id)
    }

    /// Lookup by path-like name, ignoring case and slash direction.
    pub fn composite_by_name(&self, name: &str) -> Option<&Composite> {
        let wanted = normalize_name(name);
        self.composites.iter().find(|c| normalize_name(&c.name) == wanted)
    }

    /// Insert a composite, replacing any existing one with the same id.
    pub fn add_composite(&mut self, composite: Composite) -> Option<Composite> {
        match self.composites.iter().position(|c| c.id == composite.id) {
            Some(i) => Some(std::mem::replace(&mut self.composites[i], composite)),
            None => {
                self.composites.push(composite);
                None
            }
        }
    }

    pub fn remove_composite(&mut self, id: ShortGuid) -> Option<Composite> {
        let i = self.composites.iter().position(|c| c.id == id)?;
        Some(self.composites.remove(i))
    }

    pub fn root_composite(&self) -> Option<&Composite> {
        self.composite(self.entry_points.root)
    }

    /// Sort composites and their entity lists by id.
    pub fn sort(&mut self) {
        self.composites.sort_by_key(|c| c.id);
        self.composites.iter_mut().for_each(Composite::sort_entities);
    }

    pub fn entity_count(&self) -> usize {
        self.composites.iter().map(Composite::entity_count).sum()
    }
}

/// A decoded `COMMANDS.BIN` command stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandStream {
    /// Composite named by the ROOT command, if any.
    pub root: Option<ShortGuid>,
    pub composites: Vec<Composite>,
}

impl CommandStream {
    pub fn composite(&self, id: ShortGuid) -> Option<&Composite> {
        self.composites.iter().find(|c| c.id == id)
    }

    pub fn composite_mut(&mut self, id: ShortGuid) -> Option<&mut Composite> {
        self.composites.iter_mut().find(|c| c.id == id)
    }

    pub fn sort(&mut self) {
        self.composites.sort_by_key(|c| c.id);
        self.composites.iter_mut().for_each(Composite::sort_entities);
    }
}

fn normalize_name(name: &str) -> String {
    name.replace('/', "\\").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_same_id() {
        let mut cmds = Commands::default();
        assert!(cmds.add_composite(Composite::with_id(ShortGuid::from_u32(1), "A")).is_none());
        let old = cmds.add_composite(Composite::with_id(ShortGuid::from_u32(1), "B"));
        assert_eq!(old.map(|c| c.name), Some("A".to_string()));
        assert_eq!(cmds.composites.len(), 1);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut cmds = Commands::default();
        cmds.add_composite(Composite::with_id(ShortGuid::from_u32(1), "GLOBAL\\Ai\\Patrol"));
        assert!(cmds.composite_by_name("global/ai/patrol").is_some());
        assert!(cmds.composite_by_name("global/ai").is_none());
    }

    #[test]
    fn test_root_and_remove() {
        let root = ShortGuid::from_u32(7);
        let mut cmds = Commands::new(EntryPoints { root, ..Default::default() });
        cmds.add_composite(Composite::with_id(root, "ROOT"));
        assert_eq!(cmds.root_composite().map(|c| c.id), Some(root));
        assert!(cmds.remove_composite(root).is_some());
        assert!(cmds.root_composite().is_none());
    }
}
