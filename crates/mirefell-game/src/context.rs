// context.rs — save/load context, default headers, polymorphic objects

use mirefell_common::{SaveError, WireBuf};

use crate::entity::EntityRef;
use crate::rw::{EmptyLookup, RwRegistry};

/// Marker bounding an independently-versioned sub-block ("MRFH").
pub const DEFAULT_HEADER_MARKER: u32 = 0x4D52_4648;
pub const DEFAULT_HEADER_VERSION: i32 = 1;

/// Everything one in-flight save or load needs: the ordered channel
/// and the reader-writer registry. Exclusively owned for the whole
/// operation and threaded explicitly through every serialize and
/// deserialize call; there is no ambient service access.
pub struct SaveContext<'a> {
    pub buf: &'a mut WireBuf,
    pub registry: &'a RwRegistry,
}

impl<'a> SaveContext<'a> {
    pub fn new(buf: &'a mut WireBuf, registry: &'a RwRegistry) -> Self {
        Self { buf, registry }
    }

    // ============================================================
    // Default headers — (marker, version) pairs bounding sub-blocks
    // ============================================================

    pub fn write_default_header(&mut self) {
        self.buf.write_u32(DEFAULT_HEADER_MARKER);
        self.buf.write_i32(DEFAULT_HEADER_VERSION);
    }

    /// Read a default header, failing with a `Format` error naming
    /// `label` if the marker is absent. Corruption is reported against
    /// the sub-block, not the whole file.
    pub fn read_default_header(&mut self, label: &str) -> Result<i32, SaveError> {
        let marker = self.buf.read_u32()?;
        if marker != DEFAULT_HEADER_MARKER {
            return Err(SaveError::Format {
                label: label.to_string(),
            });
        }
        let version = self.buf.read_i32()?;
        if version < 1 || version > DEFAULT_HEADER_VERSION {
            return Err(SaveError::UnsupportedVersion {
                record: "sub-block header",
                version,
                min: 1,
                max: DEFAULT_HEADER_VERSION,
            });
        }
        Ok(version)
    }

    // ============================================================
    // Versioned-record convention
    // ============================================================

    /// Every serializable unit starts with a 32-bit schema version.
    pub fn write_version(&mut self, version: i32) {
        self.buf.write_i32(version);
    }

    /// Read and validate a record version against `[min, max]`.
    /// Readers then gate later-added fields on `version >= N`.
    pub fn read_version(
        &mut self,
        record: &'static str,
        min: i32,
        max: i32,
    ) -> Result<i32, SaveError> {
        let version = self.buf.read_i32()?;
        if version < min || version > max {
            return Err(SaveError::UnsupportedVersion {
                record,
                version,
                min,
                max,
            });
        }
        Ok(version)
    }

    // ============================================================
    // Polymorphic single-object contract
    // ============================================================

    /// Write one entity: type key, name, then the type's own payload.
    pub fn write_object(&mut self, ent: &EntityRef) -> Result<(), SaveError> {
        let e = ent.borrow();
        let rw = self.registry.get(e.type_key())?;
        self.buf.write_string(e.type_key());
        self.buf.write_string(e.name());
        rw.write(&*e, self)
    }

    /// Read one entity: resolve the type key (legacy aliases apply),
    /// construct a named shell, delegate to the type's deserializer.
    /// An unresolvable key means the schema drifted: the type existed
    /// when the file was written and no longer does.
    pub fn read_object(&mut self) -> Result<EntityRef, SaveError> {
        let key = self.buf.read_string()?;
        let name = self.buf.read_string()?;
        let Some(rw) = self.registry.try_get(&key) else {
            return Err(SaveError::TypeResolution { type_key: key });
        };
        let ent = rw.construct(&name);
        {
            let mut e = ent.borrow_mut();
            rw.read(&mut *e, self, &EmptyLookup)?;
            rw.post_read(&mut *e);
        }
        Ok(ent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::testutil::{fixture_registry, prop, Prop};

    #[test]
    fn test_default_header_roundtrip() {
        let registry = fixture_registry();
        let mut buf = WireBuf::new();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        ctx.write_default_header();
        ctx.buf.begin_reading();
        assert_eq!(ctx.read_default_header("test block").unwrap(), DEFAULT_HEADER_VERSION);
    }

    #[test]
    fn test_default_header_bad_marker_names_label() {
        let registry = fixture_registry();
        let mut buf = WireBuf::new();
        buf.write_u32(0xDEAD_BEEF);
        buf.write_i32(1);
        buf.begin_reading();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        match ctx.read_default_header("added entities") {
            Err(SaveError::Format { label }) => assert_eq!(label, "added entities"),
            other => panic!("expected Format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_version_in_range_accepted() {
        let registry = fixture_registry();
        let mut buf = WireBuf::new();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        ctx.write_version(4);
        ctx.buf.begin_reading();
        assert_eq!(ctx.read_version("scene state", 1, 5).unwrap(), 4);
    }

    #[test]
    fn test_version_above_range_rejected() {
        let registry = fixture_registry();
        let mut buf = WireBuf::new();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        ctx.write_version(6);
        ctx.buf.begin_reading();
        let err = ctx.read_version("scene state", 1, 5).err().unwrap();
        assert!(matches!(
            err,
            SaveError::UnsupportedVersion {
                record: "scene state",
                version: 6,
                min: 1,
                max: 5,
            }
        ));
    }

    #[test]
    fn test_object_roundtrip() {
        let registry = fixture_registry();
        let mut buf = WireBuf::new();
        let original = prop("torch_1", 25);
        {
            let mut ctx = SaveContext::new(&mut buf, &registry);
            ctx.write_object(&original).unwrap();
        }
        buf.begin_reading();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        let loaded = ctx.read_object().unwrap();
        let e = loaded.borrow();
        assert_eq!(e.name(), "torch_1");
        let p = e.as_any().downcast_ref::<Prop>().unwrap();
        assert_eq!(p.hit_points, 25);
    }

    #[test]
    fn test_read_object_unknown_key_is_type_resolution() {
        let registry = fixture_registry();
        let mut buf = WireBuf::new();
        buf.write_string("wisp"); // type that no longer exists
        buf.write_string("wisp_7");
        buf.begin_reading();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        let err = ctx.read_object().err().unwrap();
        assert!(matches!(
            err,
            SaveError::TypeResolution { type_key } if type_key == "wisp"
        ));
    }

    #[test]
    fn test_read_object_through_legacy_alias() {
        let registry = fixture_registry();
        // Write the record the way a pre-rename build would have:
        // legacy type key, then the unchanged payload.
        let original = prop("torch_1", 3);
        let mut buf = WireBuf::new();
        buf.write_string("world_prop");
        buf.write_string("torch_1");
        {
            let mut ctx = SaveContext::new(&mut buf, &registry);
            let rw = registry.get("prop").unwrap();
            rw.write(&*original.borrow(), &mut ctx).unwrap();
        }
        buf.begin_reading();
        let mut ctx = SaveContext::new(&mut buf, &registry);
        let loaded = ctx.read_object().unwrap();
        assert_eq!(loaded.borrow().type_key(), "prop");
        assert_eq!(loaded.borrow().name(), "torch_1");
    }
}
