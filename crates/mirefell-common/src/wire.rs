// wire.rs — ordered primitive read/write channel for save data

use crate::error::WireError;

/// Upper bound on a single length-prefixed field. Anything larger is
/// treated as corruption rather than an allocation request.
pub const MAX_FIELD_LEN: i32 = 64 << 20;

// ============================================================
// WireBuf — growable byte buffer with separate read cursor
// ============================================================

/// An ordered, little-endian byte channel. One `WireBuf` is either
/// being written or being read; `begin_reading` switches it to read
/// mode by resetting the cursor. There is no field tagging: a reader
/// must consume values in exactly the order the writer produced them.
#[derive(Debug, Clone, Default)]
pub struct WireBuf {
    data: Vec<u8>,
    readcount: usize,
}

impl WireBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            readcount: 0,
        }
    }

    /// Wrap an existing payload for reading.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, readcount: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.readcount
    }

    /// Reset the read cursor to the start of the buffer.
    pub fn begin_reading(&mut self) {
        self.readcount = 0;
    }

    // ============================================================
    // Writes — infallible, the buffer grows
    // ============================================================

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.data.push(v as u8);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    /// Length-prefixed string: i32 byte length, then UTF-8 bytes.
    pub fn write_string(&mut self, s: &str) {
        self.write_i32(s.len() as i32);
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Length-prefixed raw byte block.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.data.extend_from_slice(bytes);
    }

    // ============================================================
    // Reads — fail on underflow instead of returning sentinels
    // ============================================================

    fn take(&mut self, wanted: usize) -> Result<&[u8], WireError> {
        if self.remaining() < wanted {
            return Err(WireError::UnexpectedEof {
                wanted,
                remaining: self.remaining(),
            });
        }
        let start = self.readcount;
        self.readcount += wanted;
        Ok(&self.data[start..start + wanted])
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_i32()?;
        if len < 0 || len > MAX_FIELD_LEN {
            return Err(WireError::BadLength(len));
        }
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::BadUtf8)
    }

    pub fn read_byte_block(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.read_i32()?;
        if len < 0 || len > MAX_FIELD_LEN {
            return Err(WireError::BadLength(len));
        }
        Ok(self.take(len as usize)?.to_vec())
    }
}
