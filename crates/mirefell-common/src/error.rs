// error.rs — error taxonomy for the save/persistence engine

use thiserror::Error;

/// Errors from the raw primitive channel. These always indicate a
/// truncated or corrupt payload, never a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unexpected end of save data: wanted {wanted} bytes, {remaining} remaining")]
    UnexpectedEof { wanted: usize, remaining: usize },

    #[error("bad length prefix in save data: {0}")]
    BadLength(i32),

    #[error("string in save data is not valid utf-8")]
    BadUtf8,
}

/// The single error type surfaced by save and load operations.
///
/// Everything here is fatal to the operation in flight: a failed save
/// or load leaves no partial state to repair, the caller discards the
/// result. Non-fatal conditions (an entity with no reader-writer at
/// save time) are logged and skipped instead of reported here.
#[derive(Debug, Error)]
pub enum SaveError {
    /// A default-header marker did not match while reading the named
    /// sub-block. Localizes corruption to that block.
    #[error("bad sub-block marker while reading {label}")]
    Format { label: String },

    /// A record's schema version is outside the range this build can read.
    #[error("{record} version {version} is outside the accepted range [{min}, {max}]")]
    UnsupportedVersion {
        record: &'static str,
        version: i32,
        min: i32,
        max: i32,
    },

    /// A type key in the save data no longer resolves to any known type.
    #[error("unknown entity type key \"{type_key}\" in save data")]
    TypeResolution { type_key: String },

    /// A required reader-writer is not registered for this type key.
    #[error("no reader-writer registered for type key \"{type_key}\"")]
    MissingReaderWriter { type_key: String },

    /// A scene state with this name is already registered.
    #[error("scene state \"{name}\" is already registered")]
    DuplicateScene { name: String },

    #[error("save data corrupt: {0}")]
    Wire(#[from] WireError),

    #[error("save file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The save-file envelope itself is unusable (magic, format
    /// version, checksum, or compression).
    #[error("bad save file: {reason}")]
    BadSaveFile { reason: String },
}
