// save_file.rs — the on-disk envelope: magic, checksum, deflate payload

use std::fs;
use std::path::Path;

use log::info;
use mirefell_common::compression::{compress_block, decompress_block};
use mirefell_common::crc::crc_block;
use mirefell_common::{SaveError, WireBuf};

use crate::context::SaveContext;
use crate::rw::RwRegistry;
use crate::world_state::WorldState;

// "MIRE"
pub const SAVE_MAGIC: u32 = 0x4D49_5245;
pub const SAVE_FORMAT_VERSION: i32 = 1;

/// Serialize the world state and write it to `path`.
///
/// Layout: magic, format version, CRC-32 of the uncompressed payload,
/// uncompressed length, then the deflate-compressed payload.
pub fn write_save(world: &WorldState, registry: &RwRegistry, path: &Path) -> Result<(), SaveError> {
    let mut payload = WireBuf::new();
    {
        let mut ctx = SaveContext::new(&mut payload, registry);
        world.write_state(&mut ctx)?;
    }
    let raw = payload.into_bytes();
    let checksum = crc_block(&raw);
    let compressed = compress_block(&raw)?;

    let mut envelope = WireBuf::with_capacity(compressed.len() + 16);
    envelope.write_u32(SAVE_MAGIC);
    envelope.write_i32(SAVE_FORMAT_VERSION);
    envelope.write_u32(checksum);
    envelope.write_i32(raw.len() as i32);
    envelope.write_bytes(&compressed);

    fs::write(path, envelope.as_bytes())?;
    info!(
        "wrote save {}: {} bytes ({} compressed)",
        path.display(),
        raw.len(),
        compressed.len()
    );
    Ok(())
}

/// Read a save file back into a world state. Any problem with the
/// envelope itself (magic, format version, checksum, compression)
/// is a `BadSaveFile`; corruption inside the payload surfaces as the
/// usual format and version errors.
pub fn read_save(path: &Path, registry: &RwRegistry) -> Result<WorldState, SaveError> {
    let mut envelope = WireBuf::from_bytes(fs::read(path)?);

    let magic = envelope.read_u32()?;
    if magic != SAVE_MAGIC {
        return Err(SaveError::BadSaveFile {
            reason: format!("bad magic 0x{:08x}", magic),
        });
    }
    let format_version = envelope.read_i32()?;
    if format_version != SAVE_FORMAT_VERSION {
        return Err(SaveError::BadSaveFile {
            reason: format!("unsupported save format version {}", format_version),
        });
    }
    let checksum = envelope.read_u32()?;
    let raw_len = envelope.read_i32()?;
    if raw_len < 0 {
        return Err(SaveError::BadSaveFile {
            reason: format!("bad payload length {}", raw_len),
        });
    }
    let compressed = envelope.read_byte_block()?;

    let raw = decompress_block(&compressed, raw_len as usize).map_err(|e| {
        SaveError::BadSaveFile {
            reason: format!("decompression failed: {}", e),
        }
    })?;
    if crc_block(&raw) != checksum {
        return Err(SaveError::BadSaveFile {
            reason: "checksum mismatch".to_string(),
        });
    }

    let mut payload = WireBuf::from_bytes(raw);
    let mut ctx = SaveContext::new(&mut payload, registry);
    let world = WorldState::read_state(&mut ctx)?;
    info!("read save {}", path.display());
    Ok(world)
}
