// crc.rs — CRC-32 checksum over save payloads
// Delegates to the `crc` crate (CRC-32/ISO-HDLC, the common zlib/PNG polynomial).

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC_CALC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the checksum for an entire block of data.
pub fn crc_block(data: &[u8]) -> u32 {
    CRC_CALC.checksum(data)
}
