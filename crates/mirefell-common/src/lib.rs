// Shared wire-level code for the Mirefell save engine: the ordered
// primitive channel, the error taxonomy, and the payload
// checksum/compression helpers used by the save-file front-end.

pub mod compression;
pub mod crc;
pub mod error;
pub mod wire;

pub use error::{SaveError, WireError};
pub use wire::WireBuf;
