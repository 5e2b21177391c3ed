// entity_store.rs — two-phase (header/body) entity graph protocol
//
// Entities reference each other by name inside their own field data,
// so the wire carries a header pass (names only) and a body pass
// (full payloads). Reading the header constructs every shell before
// any body is deserialized; by the time a body resolves a name, its
// target exists. Header and body walk the same explicitly ordered
// group vector, so the two traversals cannot diverge by construction.

use log::{debug, warn};
use mirefell_common::SaveError;

use std::collections::BTreeSet;

use crate::context::SaveContext;
use crate::entity::EntityRef;
use crate::rw::{EntityLookup, RwRegistry};

pub const ENTITY_STORE_VERSION: i32 = 1;
pub const ENTITY_STORE_MIN_VERSION: i32 = 1;

/// Entities of one concrete type, in their original relative order.
/// `order` carries each entity's position in the pre-grouping
/// sequence so the interleaved order survives the round trip.
pub struct EntityGroup {
    pub type_key: String,
    pub entities: Vec<EntityRef>,
    pub order: Vec<i32>,
}

/// The persisted form of a set of live entities: type groups in
/// first-appearance order. Deliberately a vector, never a map — the
/// header/body binding depends on identical traversal order in both
/// passes.
#[derive(Default)]
pub struct EntityGraphStore {
    groups: Vec<EntityGroup>,
}

impl EntityGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[EntityGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entities.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored entities, in their original pre-grouping order.
    pub fn entities(&self) -> Vec<EntityRef> {
        let mut ordered: Vec<(i32, EntityRef)> = Vec::with_capacity(self.len());
        for group in &self.groups {
            for (ent, &order) in group.entities.iter().zip(&group.order) {
                ordered.push((order, ent.clone()));
            }
        }
        ordered.sort_by_key(|(order, _)| *order);
        ordered.into_iter().map(|(_, ent)| ent).collect()
    }

    fn push(&mut self, type_key: &str, ent: EntityRef, order: i32) {
        if let Some(group) = self.groups.iter_mut().find(|g| g.type_key == type_key) {
            group.entities.push(ent);
            group.order.push(order);
        } else {
            self.groups.push(EntityGroup {
                type_key: type_key.to_string(),
                entities: vec![ent],
                order: vec![order],
            });
        }
    }

    // ============================================================
    // Selection
    // ============================================================

    /// Decide which live entities get persisted, and group them by
    /// type. Exclusions, in order: entities not flagged as saved;
    /// entities whose type has no reader-writer (logged, non-fatal);
    /// entities their own reader-writer opts out of; entities whose
    /// name collides with an earlier one in this scope (logged —
    /// persisting the collision would corrupt name resolution at load
    /// time).
    pub fn select(live: &[EntityRef], registry: &RwRegistry) -> Self {
        let mut store = Self::new();
        let mut seen_names: BTreeSet<String> = BTreeSet::new();
        let mut order: i32 = 0;

        for ent in live {
            let e = ent.borrow();
            if !e.is_saved() {
                continue;
            }
            let key = e.type_key();
            let Some(rw) = registry.try_get(key) else {
                warn!(
                    "no reader-writer for type key \"{}\", entity \"{}\" will not be saved",
                    key,
                    e.name()
                );
                continue;
            };
            if !rw.should_save(&*e) {
                continue;
            }
            if !seen_names.insert(e.name().to_string()) {
                warn!(
                    "duplicate entity name \"{}\" in save scope, keeping the first",
                    e.name()
                );
                continue;
            }
            drop(e);
            store.push(key, ent.clone(), order);
            order += 1;
        }
        store
    }

    // ============================================================
    // Write: header pass, then body pass
    // ============================================================

    /// Phase 1 of the write: per type group, only type key, count,
    /// and each entity's (name, original order). No field data.
    pub fn write_header(&self, ctx: &mut SaveContext) -> Result<(), SaveError> {
        ctx.write_version(ENTITY_STORE_VERSION);
        ctx.buf.write_i32(self.groups.len() as i32);
        for group in &self.groups {
            ctx.buf.write_string(&group.type_key);
            ctx.buf.write_i32(group.entities.len() as i32);
            for (ent, &order) in group.entities.iter().zip(&group.order) {
                ctx.buf.write_string(ent.borrow().name());
                ctx.buf.write_i32(order);
            }
        }
        debug!("wrote entity header: {} groups, {} entities", self.groups.len(), self.len());
        Ok(())
    }

    /// Phase 2 of the write: same traversal, full field payloads.
    pub fn write_bodies(&self, ctx: &mut SaveContext) -> Result<(), SaveError> {
        ctx.write_version(ENTITY_STORE_VERSION);
        ctx.buf.write_i32(self.groups.len() as i32);
        for group in &self.groups {
            ctx.buf.write_string(&group.type_key);
            ctx.buf.write_i32(group.entities.len() as i32);
            let rw = ctx.registry.get(&group.type_key)?;
            for ent in &group.entities {
                rw.write(&*ent.borrow(), ctx)?;
            }
        }
        Ok(())
    }

    // ============================================================
    // Read: construct every shell, then fill every body
    // ============================================================

    /// Phase 1 of the read: construct a named, empty shell for every
    /// recorded entity. Touches no field data. A type key without a
    /// reader-writer is fatal here — the body data that follows is
    /// unreadable without one.
    pub fn read_header(ctx: &mut SaveContext) -> Result<Self, SaveError> {
        ctx.read_version(
            "entity store header",
            ENTITY_STORE_MIN_VERSION,
            ENTITY_STORE_VERSION,
        )?;
        let group_count = ctx.buf.read_i32()?;
        if group_count < 0 {
            return Err(SaveError::Format {
                label: "entity store group count".to_string(),
            });
        }

        let mut store = Self::new();
        for _ in 0..group_count {
            let key = ctx.buf.read_string()?;
            let key = ctx.registry.resolve_key(&key).to_string();
            let count = ctx.buf.read_i32()?;
            if count < 0 {
                return Err(SaveError::Format {
                    label: format!("entity count for type \"{}\"", key),
                });
            }
            let rw = ctx.registry.get(&key)?;
            for _ in 0..count {
                let name = ctx.buf.read_string()?;
                let order = ctx.buf.read_i32()?;
                store.push(&key, rw.construct(&name), order);
            }
        }
        debug!("read entity header: {} groups, {} shells", store.groups.len(), store.len());
        Ok(store)
    }

    /// Phase 2 of the read: walk the identical traversal order and
    /// deserialize the i-th shell of each group in place. The repeated
    /// type keys and counts on the wire are cross-checked against the
    /// header result; a disagreement is corruption, reported against
    /// the offending group.
    pub fn read_bodies(&self, ctx: &mut SaveContext) -> Result<(), SaveError> {
        ctx.read_version(
            "entity store body",
            ENTITY_STORE_MIN_VERSION,
            ENTITY_STORE_VERSION,
        )?;
        let group_count = ctx.buf.read_i32()?;
        if group_count as usize != self.groups.len() {
            return Err(SaveError::Format {
                label: "entity store body group count".to_string(),
            });
        }

        for group in &self.groups {
            let key = ctx.buf.read_string()?;
            let key = ctx.registry.resolve_key(&key).to_string();
            if key != group.type_key {
                return Err(SaveError::Format {
                    label: format!("entity body group \"{}\"", group.type_key),
                });
            }
            let count = ctx.buf.read_i32()?;
            if count as usize != group.entities.len() {
                return Err(SaveError::Format {
                    label: format!("entity count for type \"{}\"", group.type_key),
                });
            }
            let rw = ctx.registry.get(&key)?;
            for ent in &group.entities {
                let mut e = ent.borrow_mut();
                rw.read(&mut *e, ctx, self)?;
                rw.post_read(&mut *e);
            }
        }
        Ok(())
    }
}

impl EntityLookup for EntityGraphStore {
    // During a body pass the entity being deserialized is mutably
    // borrowed, so it is skipped here. An entity never needs a lookup
    // to reach itself.
    fn find_entity(&self, name: &str) -> Option<EntityRef> {
        for group in &self.groups {
            for ent in &group.entities {
                match ent.try_borrow() {
                    Ok(e) if e.name() == name => return Some(ent.clone()),
                    _ => {}
                }
            }
        }
        None
    }
}
