// testutil.rs — fixture entity types and registry for the test suite

use std::cell::RefCell;
use std::rc::Rc;

use mirefell_common::SaveError;

use crate::context::SaveContext;
use crate::data_store::DataStore;
use crate::entity::{Entity, EntityCore, EntityRef};
use crate::rw::{EntityLookup, ReaderWriter, RwRegistry};

const PROP_VERSION: i32 = 1;
const CHEST_VERSION: i32 = 1;

// ============================================================
// Prop — the workhorse fixture: fields, a name cross-reference,
// and observable read hooks
// ============================================================

pub struct Prop {
    pub core: EntityCore,
    pub hit_points: i32,
    pub linked_to: Option<String>,
    /// Set during body read if `linked_to` resolved through the lookup.
    pub link_resolved: bool,
    pub post_read_ran: bool,
}

impl Entity for Prop {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn type_key(&self) -> &'static str {
        "prop"
    }

    fn apply_stored_data(&mut self, data: &DataStore) {
        if let Some(hp) = data.int("hit_points") {
            self.hit_points = hp;
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

pub struct PropRw;

impl ReaderWriter for PropRw {
    fn type_key(&self) -> &'static str {
        "prop"
    }

    fn construct(&self, name: &str) -> EntityRef {
        prop(name, 0)
    }

    fn write(&self, ent: &dyn Entity, ctx: &mut SaveContext) -> Result<(), SaveError> {
        let p = ent.as_any().downcast_ref::<Prop>().expect("prop fixture");
        ctx.write_version(PROP_VERSION);
        ctx.buf.write_i32(p.hit_points);
        ctx.buf.write_bool(p.linked_to.is_some());
        if let Some(target) = &p.linked_to {
            ctx.buf.write_string(target);
        }
        Ok(())
    }

    fn read(
        &self,
        ent: &mut dyn Entity,
        ctx: &mut SaveContext,
        scene: &dyn EntityLookup,
    ) -> Result<(), SaveError> {
        ctx.read_version("prop", 1, PROP_VERSION)?;
        let hit_points = ctx.buf.read_i32()?;
        let linked_to = if ctx.buf.read_bool()? {
            Some(ctx.buf.read_string()?)
        } else {
            None
        };
        let link_resolved = linked_to
            .as_deref()
            .is_some_and(|target| scene.find_entity(target).is_some());

        let p = ent.as_any_mut().downcast_mut::<Prop>().expect("prop fixture");
        p.hit_points = hit_points;
        p.linked_to = linked_to;
        p.link_resolved = link_resolved;
        Ok(())
    }

    fn post_read(&self, ent: &mut dyn Entity) {
        let p = ent.as_any_mut().downcast_mut::<Prop>().expect("prop fixture");
        p.post_read_ran = true;
    }
}

// ============================================================
// Chest — a second concrete type, for grouping tests
// ============================================================

pub struct Chest {
    pub core: EntityCore,
    pub locked: bool,
}

impl Entity for Chest {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn type_key(&self) -> &'static str {
        "chest"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

pub struct ChestRw;

impl ReaderWriter for ChestRw {
    fn type_key(&self) -> &'static str {
        "chest"
    }

    fn construct(&self, name: &str) -> EntityRef {
        chest(name)
    }

    fn write(&self, ent: &dyn Entity, ctx: &mut SaveContext) -> Result<(), SaveError> {
        let c = ent.as_any().downcast_ref::<Chest>().expect("chest fixture");
        ctx.write_version(CHEST_VERSION);
        ctx.buf.write_bool(c.locked);
        Ok(())
    }

    fn read(
        &self,
        ent: &mut dyn Entity,
        ctx: &mut SaveContext,
        _scene: &dyn EntityLookup,
    ) -> Result<(), SaveError> {
        ctx.read_version("chest", 1, CHEST_VERSION)?;
        let locked = ctx.buf.read_bool()?;
        let c = ent.as_any_mut().downcast_mut::<Chest>().expect("chest fixture");
        c.locked = locked;
        Ok(())
    }
}

// ============================================================
// Marker — has a reader-writer that opts the whole type out
// ============================================================

pub struct Marker {
    pub core: EntityCore,
}

impl Entity for Marker {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn type_key(&self) -> &'static str {
        "marker"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

pub struct MarkerRw;

impl ReaderWriter for MarkerRw {
    fn type_key(&self) -> &'static str {
        "marker"
    }

    fn construct(&self, name: &str) -> EntityRef {
        marker(name)
    }

    fn write(&self, _ent: &dyn Entity, _ctx: &mut SaveContext) -> Result<(), SaveError> {
        Ok(())
    }

    fn read(
        &self,
        _ent: &mut dyn Entity,
        _ctx: &mut SaveContext,
        _scene: &dyn EntityLookup,
    ) -> Result<(), SaveError> {
        Ok(())
    }

    // Markers are regenerated from region data at load time
    fn should_save(&self, _ent: &dyn Entity) -> bool {
        false
    }
}

// ============================================================
// Ghost — an entity type with no reader-writer at all
// ============================================================

pub struct Ghost {
    pub core: EntityCore,
}

impl Entity for Ghost {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn type_key(&self) -> &'static str {
        "ghost"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================
// Constructors and the fixture registry
// ============================================================

pub fn prop(name: &str, hit_points: i32) -> EntityRef {
    Rc::new(RefCell::new(Prop {
        core: EntityCore::named(name),
        hit_points,
        linked_to: None,
        link_resolved: false,
        post_read_ran: false,
    }))
}

pub fn linked_prop(name: &str, linked_to: Option<&str>) -> EntityRef {
    Rc::new(RefCell::new(Prop {
        core: EntityCore::named(name),
        hit_points: 1,
        linked_to: linked_to.map(str::to_string),
        link_resolved: false,
        post_read_ran: false,
    }))
}

pub fn chest(name: &str) -> EntityRef {
    Rc::new(RefCell::new(Chest {
        core: EntityCore::named(name),
        locked: false,
    }))
}

pub fn marker(name: &str) -> EntityRef {
    Rc::new(RefCell::new(Marker {
        core: EntityCore::named(name),
    }))
}

pub fn ghost(name: &str) -> EntityRef {
    Rc::new(RefCell::new(Ghost {
        core: EntityCore::named(name),
    }))
}

/// Registry with every fixture reader-writer plus the legacy
/// "world_prop" alias for the prop type.
pub fn fixture_registry() -> RwRegistry {
    let mut registry = RwRegistry::new();
    registry.register(Box::new(PropRw));
    registry.register(Box::new(ChestRw));
    registry.register(Box::new(MarkerRw));
    registry.register_alias("world_prop", "prop");
    registry
}
