// lib.rs — game-side persistence: entity model, scene and world state

pub mod context;
pub mod data_store;
pub mod entity;
pub mod entity_store;
pub mod fog;
pub mod rw;
pub mod save_file;
pub mod scene_state;
pub mod world_state;

#[cfg(test)]
pub(crate) mod testutil;

pub use context::SaveContext;
pub use entity::{Entity, EntityRef};
pub use rw::{ReaderWriter, RwRegistry};
pub use world_state::WorldState;
