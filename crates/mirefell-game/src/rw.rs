// rw.rs — per-type reader-writer strategy and the type-key registry

use log::warn;
use mirefell_common::SaveError;

use crate::context::SaveContext;
use crate::entity::{Entity, EntityRef};

/// Name-based entity lookup handed to `ReaderWriter::read` so that
/// cross-references resolve against shells that already exist. During
/// a two-phase load this is the entity graph store itself.
pub trait EntityLookup {
    fn find_entity(&self, name: &str) -> Option<EntityRef>;
}

/// Lookup for single-object reads outside a two-phase pass: resolves
/// nothing.
pub struct EmptyLookup;

impl EntityLookup for EmptyLookup {
    fn find_entity(&self, _name: &str) -> Option<EntityRef> {
        None
    }
}

/// The per-type persistence strategy: construct a named empty shell,
/// serialize and deserialize field payloads, and opt a type (or a
/// single entity) out of saving entirely.
pub trait ReaderWriter {
    /// The stable type key this strategy is registered under.
    fn type_key(&self) -> &'static str;

    /// Construct a named, empty instance. No field data is populated;
    /// the shell only has to exist so name references can land on it.
    fn construct(&self, name: &str) -> EntityRef;

    fn write(&self, ent: &dyn Entity, ctx: &mut SaveContext) -> Result<(), SaveError>;

    fn read(
        &self,
        ent: &mut dyn Entity,
        ctx: &mut SaveContext,
        scene: &dyn EntityLookup,
    ) -> Result<(), SaveError>;

    /// Final opt-out hook. Types regenerated deterministically at load
    /// time return false here and are never persisted.
    fn should_save(&self, _ent: &dyn Entity) -> bool {
        true
    }

    /// Post-construction setup, invoked after the entity's body has
    /// been deserialized.
    fn post_read(&self, _ent: &mut dyn Entity) {}
}

// ============================================================
// RwRegistry — type key -> reader-writer
// ============================================================

/// Lookup table from stable type keys to reader-writers, plus a legacy
/// alias table so renamed types keep loading from old saves.
///
/// Populated once at startup and read-only afterwards. The table is
/// small, so lookups are a linear scan in registration order.
#[derive(Default)]
pub struct RwRegistry {
    writers: Vec<Box<dyn ReaderWriter>>,
    aliases: Vec<(String, String)>, // (legacy key, current key)
}

impl RwRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Register a reader-writer under its type key. Registering the
    /// same key twice replaces the earlier entry; that is a wiring
    /// mistake worth a warning, not an abort.
    pub fn register(&mut self, rw: Box<dyn ReaderWriter>) {
        let key = rw.type_key();
        if let Some(pos) = self.writers.iter().position(|w| w.type_key() == key) {
            warn!("reader-writer for type key \"{}\" registered twice, replacing", key);
            self.writers[pos] = rw;
        } else {
            self.writers.push(rw);
        }
    }

    /// Map a deprecated type key to its current name. Applied before
    /// every lookup, so saves written before a rename still resolve.
    pub fn register_alias(&mut self, legacy: &str, current: &str) {
        self.aliases
            .push((legacy.to_string(), current.to_string()));
    }

    /// Remap a possibly-legacy key to its current form.
    pub fn resolve_key<'a>(&'a self, key: &'a str) -> &'a str {
        for (legacy, current) in &self.aliases {
            if legacy == key {
                return current;
            }
        }
        key
    }

    /// Required lookup: failure means save data references a type this
    /// build cannot reconstruct.
    pub fn get(&self, key: &str) -> Result<&dyn ReaderWriter, SaveError> {
        self.try_get(key).ok_or_else(|| SaveError::MissingReaderWriter {
            type_key: key.to_string(),
        })
    }

    /// Optional lookup, used when filtering save candidates.
    pub fn try_get(&self, key: &str) -> Option<&dyn ReaderWriter> {
        let key = self.resolve_key(key);
        self.writers
            .iter()
            .find(|w| w.type_key() == key)
            .map(|w| w.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture_registry, PropRw};

    #[test]
    fn test_try_get_known_and_unknown() {
        let registry = fixture_registry();
        assert!(registry.try_get("prop").is_some());
        assert!(registry.try_get("wisp").is_none());
    }

    #[test]
    fn test_get_missing_is_error() {
        let registry = fixture_registry();
        let err = registry.get("wisp").err().unwrap();
        assert!(matches!(
            err,
            SaveError::MissingReaderWriter { type_key } if type_key == "wisp"
        ));
    }

    #[test]
    fn test_alias_remaps_legacy_key() {
        let registry = fixture_registry();
        // fixture_registry aliases the pre-rename "world_prop" key
        assert_eq!(registry.resolve_key("world_prop"), "prop");
        assert!(registry.try_get("world_prop").is_some());
        assert_eq!(registry.try_get("world_prop").unwrap().type_key(), "prop");
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let mut registry = fixture_registry();
        let before = registry.len();
        registry.register(Box::new(PropRw));
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_empty_lookup_finds_nothing() {
        assert!(EmptyLookup.find_entity("anything").is_none());
    }
}
