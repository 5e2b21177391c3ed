// data_store.rs — keyed auxiliary data carried inside scene and world states

use std::collections::BTreeMap;

use mirefell_common::{SaveError, WireBuf};

pub const DATA_STORE_VERSION: i32 = 1;
pub const ENTITY_DATA_STORE_VERSION: i32 = 1;

// Wire tags for StoreValue
const TAG_INT: u8 = 0;
const TAG_FLOAT: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_STR: u8 = 3;

/// A single value in a data store, tag-dispatched on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
}

impl StoreValue {
    fn write(&self, buf: &mut WireBuf) {
        match self {
            StoreValue::Int(v) => {
                buf.write_u8(TAG_INT);
                buf.write_i32(*v);
            }
            StoreValue::Float(v) => {
                buf.write_u8(TAG_FLOAT);
                buf.write_f32(*v);
            }
            StoreValue::Bool(v) => {
                buf.write_u8(TAG_BOOL);
                buf.write_bool(*v);
            }
            StoreValue::Str(v) => {
                buf.write_u8(TAG_STR);
                buf.write_string(v);
            }
        }
    }

    fn read(buf: &mut WireBuf) -> Result<Self, SaveError> {
        let tag = buf.read_u8()?;
        Ok(match tag {
            TAG_INT => StoreValue::Int(buf.read_i32()?),
            TAG_FLOAT => StoreValue::Float(buf.read_f32()?),
            TAG_BOOL => StoreValue::Bool(buf.read_bool()?),
            TAG_STR => StoreValue::Str(buf.read_string()?),
            _ => {
                return Err(SaveError::Format {
                    label: format!("data store value tag {}", tag),
                })
            }
        })
    }
}

/// Generic keyed map for state not modeled as first-class entity
/// fields. `BTreeMap` keeps the wire order deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataStore {
    values: BTreeMap<String, StoreValue>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn set(&mut self, key: &str, value: StoreValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&StoreValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StoreValue> {
        self.values.remove(key)
    }

    pub fn set_int(&mut self, key: &str, v: i32) {
        self.set(key, StoreValue::Int(v));
    }

    pub fn set_float(&mut self, key: &str, v: f32) {
        self.set(key, StoreValue::Float(v));
    }

    pub fn set_bool(&mut self, key: &str, v: bool) {
        self.set(key, StoreValue::Bool(v));
    }

    pub fn set_str(&mut self, key: &str, v: &str) {
        self.set(key, StoreValue::Str(v.to_string()));
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        match self.values.get(key) {
            Some(StoreValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f32> {
        match self.values.get(key) {
            Some(StoreValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(StoreValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(StoreValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn write(&self, buf: &mut WireBuf) {
        buf.write_i32(DATA_STORE_VERSION);
        buf.write_i32(self.values.len() as i32);
        for (key, value) in &self.values {
            buf.write_string(key);
            value.write(buf);
        }
    }

    pub fn read(buf: &mut WireBuf) -> Result<Self, SaveError> {
        let version = buf.read_i32()?;
        if version < 1 || version > DATA_STORE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                record: "data store",
                version,
                min: 1,
                max: DATA_STORE_VERSION,
            });
        }
        let count = buf.read_i32()?;
        if count < 0 {
            return Err(SaveError::Format {
                label: "data store entry count".to_string(),
            });
        }
        let mut store = DataStore::new();
        for _ in 0..count {
            let key = buf.read_string()?;
            let value = StoreValue::read(buf)?;
            store.values.insert(key, value);
        }
        Ok(store)
    }
}

/// Per-entity data stores, keyed by entity name. Applied back onto
/// live entities when a scene is initialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityDataStore {
    stores: BTreeMap<String, DataStore>,
}

impl EntityDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// The store for an entity name, lazily allocated.
    pub fn entry(&mut self, name: &str) -> &mut DataStore {
        self.stores.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&DataStore> {
        self.stores.get(name)
    }

    pub fn write(&self, buf: &mut WireBuf) {
        buf.write_i32(ENTITY_DATA_STORE_VERSION);
        buf.write_i32(self.stores.len() as i32);
        for (name, store) in &self.stores {
            buf.write_string(name);
            store.write(buf);
        }
    }

    pub fn read(buf: &mut WireBuf) -> Result<Self, SaveError> {
        let version = buf.read_i32()?;
        if version < 1 || version > ENTITY_DATA_STORE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                record: "entity data store",
                version,
                min: 1,
                max: ENTITY_DATA_STORE_VERSION,
            });
        }
        let count = buf.read_i32()?;
        if count < 0 {
            return Err(SaveError::Format {
                label: "entity data store entry count".to_string(),
            });
        }
        let mut out = EntityDataStore::new();
        for _ in 0..count {
            let name = buf.read_string()?;
            let store = DataStore::read(buf)?;
            out.stores.insert(name, store);
        }
        Ok(out)
    }
}
