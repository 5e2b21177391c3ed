// fog.rs — per-region fog-of-war reveal bitmap

use mirefell_common::{SaveError, WireBuf};

pub const FOG_VERSION: i32 = 1;

/// Bit-packed map of which cells of a region the player has revealed.
/// Out-of-range coordinates are ignored on reveal and read back as
/// hidden.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FogOfWar {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl FogOfWar {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize * height as usize).div_ceil(8);
        Self {
            width,
            height,
            bits: vec![0u8; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn bit_index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn reveal(&mut self, x: u32, y: u32) {
        if let Some(idx) = self.bit_index(x, y) {
            self.bits[idx / 8] |= 1 << (idx % 8);
        }
    }

    pub fn reveal_all(&mut self) {
        for b in &mut self.bits {
            *b = 0xff;
        }
    }

    pub fn is_revealed(&self, x: u32, y: u32) -> bool {
        match self.bit_index(x, y) {
            Some(idx) => self.bits[idx / 8] & (1 << (idx % 8)) != 0,
            None => false,
        }
    }

    pub fn write(&self, buf: &mut WireBuf) {
        buf.write_i32(FOG_VERSION);
        buf.write_u32(self.width);
        buf.write_u32(self.height);
        buf.write_bytes(&self.bits);
    }

    pub fn read(buf: &mut WireBuf) -> Result<Self, SaveError> {
        let version = buf.read_i32()?;
        if version < 1 || version > FOG_VERSION {
            return Err(SaveError::UnsupportedVersion {
                record: "fog of war",
                version,
                min: 1,
                max: FOG_VERSION,
            });
        }
        let width = buf.read_u32()?;
        let height = buf.read_u32()?;
        let bits = buf.read_byte_block()?;
        let expected = (width as usize * height as usize).div_ceil(8);
        if bits.len() != expected {
            return Err(SaveError::Format {
                label: "fog of war bitmap".to_string(),
            });
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }
}
