//! Cached string → ShortGuid hashing.
//!
//! A [`HasherContext`] is built once (usually at process start) and then
//! shared by reference with every decode/encode call. The vanilla table is
//! immutable after construction; identifiers generated at runtime go into
//! the custom table, which sits behind a `parking_lot::RwLock` so rayon
//! decode tasks can hash concurrently.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use rayon::prelude::*;

use super::ShortGuid;
use crate::util::{Error, Result};

/// Strings bundled with the crate, one per line.
const VOCABULARY: &str = include_str!("vocabulary.txt");

#[derive(Default)]
struct Table {
    forward: HashMap<String, ShortGuid>,
    reverse: HashMap<ShortGuid, String>,
}

impl Table {
    fn insert(&mut self, text: String, id: ShortGuid) {
        // First string wins the reverse slot on collision.
        self.reverse.entry(id).or_insert_with(|| text.clone());
        self.forward.insert(text, id);
    }
}

/// Bidirectional identifier cache seeded from a known vocabulary.
pub struct HasherContext {
    vanilla: Table,
    custom: RwLock<Table>,
}

impl HasherContext {
    /// Create a context seeded from the bundled vocabulary.
    pub fn new() -> Self {
        Self::with_vocabulary(vocabulary_lines(VOCABULARY))
    }

    /// Create a context seeded from the bundled vocabulary plus a
    /// dictionary file with one string per line.
    pub fn with_dictionary(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Ok(Self::with_vocabulary(
            vocabulary_lines(VOCABULARY).chain(vocabulary_lines(&text)),
        ))
    }

    /// Create a context with no seeded strings.
    pub fn empty() -> Self {
        Self {
            vanilla: Table::default(),
            custom: RwLock::new(Table::default()),
        }
    }

    /// Create a context seeded from caller-provided strings.
    pub fn with_vocabulary<'a>(strings: impl IntoIterator<Item = &'a str>) -> Self {
        let strings: Vec<&str> = strings.into_iter().collect();
        let hashed: Vec<(String, ShortGuid)> = strings
            .par_iter()
            .map(|s| (s.to_string(), ShortGuid::from_text(s)))
            .collect();

        let mut vanilla = Table::default();
        for (text, id) in hashed {
            vanilla.insert(text, id);
        }
        tracing::debug!("hasher seeded with {} strings", vanilla.forward.len());

        Self {
            vanilla,
            custom: RwLock::new(Table::default()),
        }
    }

    /// Hash `text`, caching the result.
    pub fn generate(&self, text: &str) -> ShortGuid {
        if let Some(id) = self.vanilla.forward.get(text) {
            return *id;
        }
        if let Some(id) = self.custom.read().forward.get(text) {
            return *id;
        }

        let id = ShortGuid::from_text(text);
        let mut custom = self.custom.write();
        // Another task may have inserted it between the locks.
        if !custom.forward.contains_key(text) {
            custom.insert(text.to_string(), id);
        }
        id
    }

    /// Reverse lookup without a fallback.
    pub fn lookup(&self, id: ShortGuid) -> Option<String> {
        if let Some(text) = self.vanilla.reverse.get(&id) {
            return Some(text.clone());
        }
        self.custom.read().reverse.get(&id).cloned()
    }

    /// Reverse lookup, falling back to the hex rendering of the id.
    pub fn find_string(&self, id: ShortGuid) -> String {
        self.lookup(id).unwrap_or_else(|| id.to_string())
    }

    /// True if `id` came from the bundled or seeded vocabulary.
    pub fn is_vanilla(&self, id: ShortGuid) -> bool {
        self.vanilla.reverse.contains_key(&id)
    }

    /// Number of seeded strings.
    pub fn vanilla_len(&self) -> usize {
        self.vanilla.forward.len()
    }

    /// Snapshot of the runtime-generated strings, sorted by id.
    pub fn custom_entries(&self) -> Vec<(ShortGuid, String)> {
        let custom = self.custom.read();
        let mut entries: Vec<_> = custom
            .reverse
            .iter()
            .map(|(id, text)| (*id, text.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Forget every runtime-generated string.
    pub fn clear_custom(&self) {
        let mut custom = self.custom.write();
        custom.forward.clear();
        custom.reverse.clear();
    }
}

fn vocabulary_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

impl Default for HasherContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_generate_is_cached() {
        let ctx = HasherContext::empty();
        let a = ctx.generate("MyCustomEntity");
        let b = ctx.generate("MyCustomEntity");
        assert_eq!(a, b);
        assert_eq!(ctx.custom_entries().len(), 1);
    }

    #[test]
    fn test_vanilla_hits_do_not_grow_custom() {
        let ctx = HasherContext::with_vocabulary(["position", "rotation"]);
        assert_eq!(ctx.vanilla_len(), 2);
        let id = ctx.generate("position");
        assert!(ctx.is_vanilla(id));
        assert!(ctx.custom_entries().is_empty());
    }

    #[test]
    fn test_find_string_fallback() {
        let ctx = HasherContext::empty();
        let id = ShortGuid::from_bytes([1, 2, 3, 4]);
        assert_eq!(ctx.find_string(id), "01-02-03-04");
        assert!(ctx.lookup(id).is_none());

        let named = ctx.generate("trigger");
        assert_eq!(ctx.find_string(named), "trigger");
    }

    #[test]
    fn test_bundled_vocabulary_seeds() {
        let ctx = HasherContext::new();
        assert!(ctx.vanilla_len() > 100);
        let id = ShortGuid::from_text("CAGEAnimation");
        assert_eq!(ctx.lookup(id).as_deref(), Some("CAGEAnimation"));
    }

    #[test]
    fn test_dictionary_file_extends_vocabulary() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("strings.txt");
        std::fs::write(&path, "# extra\nDoorUnlockRelay\n\n  LiftPanelActive  \n").unwrap();

        let ctx = HasherContext::with_dictionary(&path).unwrap();
        assert_eq!(ctx.vanilla_len(), HasherContext::new().vanilla_len() + 2);
        let id = ShortGuid::from_text("LiftPanelActive");
        assert!(ctx.is_vanilla(id));
        assert_eq!(ctx.find_string(id), "LiftPanelActive");

        let missing = HasherContext::with_dictionary(dir.path().join("none.txt"));
        assert!(matches!(missing, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_clear_custom() {
        let ctx = HasherContext::empty();
        ctx.generate("temporary");
        ctx.clear_custom();
        assert!(ctx.custom_entries().is_empty());
    }

    #[test]
    fn test_concurrent_generate() {
        let ctx = Arc::new(HasherContext::empty());
        let ids: Vec<ShortGuid> = (0..64)
            .into_par_iter()
            .map(|i| ctx.generate(&format!("entity_{}", i % 8)))
            .collect();
        assert_eq!(ctx.custom_entries().len(), 8);
        assert_eq!(ids[0], ids[8]);
    }
}
