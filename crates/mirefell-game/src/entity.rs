// entity.rs — entity model and live-scene collaborators

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::data_store::DataStore;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        /// Eligible for persistence. Ephemeral/regenerated content
        /// leaves this clear and is never written to a save.
        const SAVED  = 0x00000001;
        /// Currently tracked by a scene state's added-entities list.
        const STORED = 0x00000002;
    }
}

/// Bookkeeping shared by every entity type: its unique name, its
/// persistence flags, and the live scene (if any) that owns it.
/// Concrete entity types embed one of these and hand it out through
/// [`Entity::core`].
#[derive(Clone, Debug, Default)]
pub struct EntityCore {
    pub name: String,
    pub flags: EntityFlags,
    pub owner_scene: Option<String>,
}

impl EntityCore {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flags: EntityFlags::SAVED,
            owner_scene: None,
        }
    }
}

/// A persistable world entity. The save engine only ever sees this
/// contract; the gameplay classes behind it are collaborators.
///
/// Within one scene's persistence scope the name is the sole
/// cross-reference key, so it must be unique there.
pub trait Entity: Any {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Stable type identifier resolvable through the reader-writer
    /// registry. Never a language/reflection name.
    fn type_key(&self) -> &'static str;

    /// Apply a persisted per-entity data store onto this live entity.
    /// Called during scene initialization.
    fn apply_stored_data(&mut self, _data: &DataStore) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn name(&self) -> &str {
        &self.core().name
    }

    fn is_saved(&self) -> bool {
        self.core().flags.contains(EntityFlags::SAVED)
    }

    fn is_stored(&self) -> bool {
        self.core().flags.contains(EntityFlags::STORED)
    }

    fn set_stored(&mut self, stored: bool) {
        self.core_mut().flags.set(EntityFlags::STORED, stored);
    }
}

/// Shared handle to an entity. The engine is single-threaded by
/// design, so plain `Rc<RefCell<..>>` handles carry all shared
/// ownership between scene states and live scenes.
pub type EntityRef = Rc<RefCell<dyn Entity>>;

// ============================================================
// LiveScene — the active-region collaborator
// ============================================================

/// The live, simulated side of a region: name plus ordered entity
/// membership. The persistence engine only attaches and detaches
/// entities here; simulation is someone else's job.
#[derive(Default)]
pub struct LiveScene {
    pub name: String,
    entities: Vec<EntityRef>,
}

impl LiveScene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entities: Vec::new(),
        }
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn contains(&self, ent: &EntityRef) -> bool {
        self.entities.iter().any(|e| Rc::ptr_eq(e, ent))
    }

    pub fn find(&self, name: &str) -> Option<EntityRef> {
        self.entities
            .iter()
            .find(|e| e.borrow().name() == name)
            .cloned()
    }

    /// Attach an entity to this scene, marking it as owned here.
    /// Attaching an already-attached entity is a no-op.
    pub fn attach(&mut self, ent: &EntityRef) {
        if !self.contains(ent) {
            self.entities.push(ent.clone());
        }
        ent.borrow_mut().core_mut().owner_scene = Some(self.name.clone());
    }

    /// Detach an entity from this scene. Returns false if it was not
    /// a member.
    pub fn detach(&mut self, ent: &EntityRef) -> bool {
        let Some(pos) = self.entities.iter().position(|e| Rc::ptr_eq(e, ent)) else {
            return false;
        };
        self.entities.remove(pos);
        let mut e = ent.borrow_mut();
        if e.core().owner_scene.as_deref() == Some(self.name.as_str()) {
            e.core_mut().owner_scene = None;
        }
        true
    }
}

pub type LiveSceneRef = Rc<RefCell<LiveScene>>;

/// Retained live scenes by name: the currently active region plus any
/// inactive-but-cached ones. Owned by the world state, never
/// serialized.
pub type SceneCache = BTreeMap<String, LiveSceneRef>;

pub fn live_scene(name: &str) -> LiveSceneRef {
    Rc::new(RefCell::new(LiveScene::new(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::prop;

    #[test]
    fn test_entity_core_defaults_to_saved() {
        let core = EntityCore::named("torch_1");
        assert!(core.flags.contains(EntityFlags::SAVED));
        assert!(!core.flags.contains(EntityFlags::STORED));
        assert_eq!(core.name, "torch_1");
    }

    #[test]
    fn test_set_stored_flag() {
        let e = prop("barrel_3", 10);
        e.borrow_mut().set_stored(true);
        assert!(e.borrow().is_stored());
        e.borrow_mut().set_stored(false);
        assert!(!e.borrow().is_stored());
    }

    #[test]
    fn test_attach_sets_owner() {
        let scene = live_scene("crypt");
        let e = prop("barrel_3", 10);
        scene.borrow_mut().attach(&e);
        assert!(scene.borrow().contains(&e));
        assert_eq!(e.borrow().core().owner_scene.as_deref(), Some("crypt"));
    }

    #[test]
    fn test_attach_twice_is_noop() {
        let scene = live_scene("crypt");
        let e = prop("barrel_3", 10);
        scene.borrow_mut().attach(&e);
        scene.borrow_mut().attach(&e);
        assert_eq!(scene.borrow().entities().len(), 1);
    }

    #[test]
    fn test_detach_clears_owner() {
        let scene = live_scene("crypt");
        let e = prop("barrel_3", 10);
        scene.borrow_mut().attach(&e);
        assert!(scene.borrow_mut().detach(&e));
        assert!(e.borrow().core().owner_scene.is_none());
        assert!(!scene.borrow_mut().detach(&e));
    }

    #[test]
    fn test_find_by_name() {
        let scene = live_scene("crypt");
        let e = prop("lantern_9", 1);
        scene.borrow_mut().attach(&e);
        assert!(scene.borrow().find("lantern_9").is_some());
        assert!(scene.borrow().find("lantern_10").is_none());
    }
}
