// scene_state.rs — the persisted record for one world region

use std::collections::BTreeSet;
use std::rc::Rc;

use log::debug;
use mirefell_common::SaveError;

use crate::context::SaveContext;
use crate::data_store::{DataStore, EntityDataStore};
use crate::entity::{EntityRef, LiveSceneRef, SceneCache};
use crate::entity_store::EntityGraphStore;
use crate::fog::FogOfWar;

pub const SCENE_STATE_VERSION: i32 = 5;
pub const SCENE_STATE_MIN_VERSION: i32 = 1;

// Versions at which optional sections were introduced
const VERSION_FOG: i32 = 2;
const VERSION_DATA_STORE: i32 = 3;
const VERSION_ENTITY_DATA: i32 = 4;
const VERSION_ADDED_ENTITIES: i32 = 5;

/// Persisted state of one region: names of removed persistent
/// entities, dynamically added entities, keyed data stores, and the
/// fog-of-war bitmap. Created the first time a region is visited,
/// registered once into the world state, and retained for the rest of
/// the session whether or not its region is active.
#[derive(Default)]
pub struct SceneState {
    name: String,
    /// Lazily allocated; once a name is recorded here it never leaves.
    removed: Option<BTreeSet<String>>,
    added: Vec<EntityRef>,
    pub data: DataStore,
    pub entity_data: EntityDataStore,
    pub fog: FogOfWar,
}

impl SceneState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn added_entities(&self) -> &[EntityRef] {
        &self.added
    }

    // ============================================================
    // Added-entity tracking
    // ============================================================

    /// Track a dynamically added entity. Adding the same handle twice
    /// is a no-op.
    pub fn add_entity(&mut self, ent: &EntityRef) {
        if self.added.iter().any(|e| Rc::ptr_eq(e, ent)) {
            return;
        }
        ent.borrow_mut().set_stored(true);
        self.added.push(ent.clone());
    }

    /// Stop tracking an added entity. Idempotent: returns false if the
    /// entity was not tracked.
    pub fn remove_entity(&mut self, ent: &EntityRef) -> bool {
        let Some(pos) = self.added.iter().position(|e| Rc::ptr_eq(e, ent)) else {
            return false;
        };
        self.added.remove(pos);
        ent.borrow_mut().set_stored(false);
        true
    }

    // ============================================================
    // Removed persistent entities
    // ============================================================

    /// Record a persistent entity name as permanently removed from
    /// this region. Spawners must consult
    /// [`has_persistent_entity_been_removed`](Self::has_persistent_entity_been_removed)
    /// before re-placing persistent content on region re-entry.
    pub fn remove_persistent_entity(&mut self, name: &str) {
        self.removed
            .get_or_insert_with(BTreeSet::new)
            .insert(name.to_string());
    }

    pub fn has_persistent_entity_been_removed(&self, name: &str) -> bool {
        self.removed
            .as_ref()
            .is_some_and(|set| set.contains(name))
    }

    pub fn removed_count(&self) -> usize {
        self.removed.as_ref().map_or(0, |set| set.len())
    }

    // ============================================================
    // Scene activation
    // ============================================================

    /// Apply this record onto a (re)activated live scene: push stored
    /// per-entity data onto the live entities, then re-parent every
    /// tracked added entity into `live`. An added entity still owned
    /// by a different live scene is detached from it first, so live
    /// ownership stays single.
    pub fn initialize_scene(&self, live: &LiveSceneRef, cache: &SceneCache) {
        for ent in live.borrow().entities() {
            let name = ent.borrow().name().to_string();
            if let Some(data) = self.entity_data.get(&name) {
                ent.borrow_mut().apply_stored_data(data);
            }
        }

        for ent in &self.added {
            let owner = ent.borrow().core().owner_scene.clone();
            if let Some(owner) = owner {
                if owner != live.borrow().name {
                    if let Some(prev) = cache.get(&owner) {
                        prev.borrow_mut().detach(ent);
                    }
                }
            }
            live.borrow_mut().attach(ent);

            let name = ent.borrow().name().to_string();
            if let Some(data) = self.entity_data.get(&name) {
                ent.borrow_mut().apply_stored_data(data);
            }
        }
        debug!(
            "initialized scene \"{}\": {} added entities re-parented",
            self.name,
            self.added.len()
        );
    }

    // ============================================================
    // Serialization (current version 5)
    // ============================================================

    pub fn write_state(&self, ctx: &mut SaveContext) -> Result<(), SaveError> {
        ctx.write_version(SCENE_STATE_VERSION);
        ctx.buf.write_string(&self.name);

        ctx.buf.write_i32(self.removed_count() as i32);
        if let Some(removed) = &self.removed {
            for name in removed {
                ctx.buf.write_string(name);
            }
        }

        self.fog.write(ctx.buf);
        self.data.write(ctx.buf);
        self.entity_data.write(ctx.buf);

        // Added entities: an independently-versioned sub-block holding
        // the two-phase header/body pair.
        let store = EntityGraphStore::select(&self.added, ctx.registry);
        ctx.write_default_header();
        store.write_header(ctx)?;
        store.write_bodies(ctx)?;
        Ok(())
    }

    /// Read a scene state. Sections introduced after `version` are
    /// skipped entirely and left at their defaults, which is how saves
    /// from older builds keep loading.
    pub fn read_state(ctx: &mut SaveContext) -> Result<Self, SaveError> {
        let version = ctx.read_version(
            "scene state",
            SCENE_STATE_MIN_VERSION,
            SCENE_STATE_VERSION,
        )?;

        let mut scene = SceneState::new(&ctx.buf.read_string()?);

        let removed_count = ctx.buf.read_i32()?;
        if removed_count < 0 {
            return Err(SaveError::Format {
                label: format!("removed-entity count in scene \"{}\"", scene.name),
            });
        }
        for _ in 0..removed_count {
            let name = ctx.buf.read_string()?;
            scene.remove_persistent_entity(&name);
        }

        if version >= VERSION_FOG {
            scene.fog = FogOfWar::read(ctx.buf)?;
        }
        if version >= VERSION_DATA_STORE {
            scene.data = DataStore::read(ctx.buf)?;
        }
        if version >= VERSION_ENTITY_DATA {
            scene.entity_data = EntityDataStore::read(ctx.buf)?;
        }
        if version >= VERSION_ADDED_ENTITIES {
            ctx.read_default_header("added entities")?;
            let store = EntityGraphStore::read_header(ctx)?;
            store.read_bodies(ctx)?;
            for ent in store.entities() {
                scene.add_entity(&ent);
            }
        }
        Ok(scene)
    }
}
