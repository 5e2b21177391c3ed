// compression.rs — raw-deflate compression for save payloads
//
// Save files store the uncompressed payload size next to the
// compressed block, so decompression always runs with a known target
// size. Raw deflate (no zlib header), windowBits = -15 equivalent.

use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use log::trace;
use std::io::{self, Read};

/// Maximum decompressed payload size, to reject decompression bombs
/// before allocating.
pub const MAX_DECOMPRESS_SIZE: usize = 256 << 20;

/// Compress a payload unconditionally using raw deflate.
pub fn compress_block(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(data, Compression::default());
    let mut compressed = Vec::with_capacity(data.len() / 2 + 64);
    encoder.read_to_end(&mut compressed)?;
    trace!("deflate: {} -> {} bytes", data.len(), compressed.len());
    Ok(compressed)
}

/// Decompress a payload whose uncompressed size is known.
///
/// Fails if the size exceeds [`MAX_DECOMPRESS_SIZE`] or the
/// decompressed data does not come out at exactly the expected size.
pub fn decompress_block(data: &[u8], uncompressed_size: usize) -> io::Result<Vec<u8>> {
    if uncompressed_size > MAX_DECOMPRESS_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "uncompressed size {} exceeds maximum {}",
                uncompressed_size, MAX_DECOMPRESS_SIZE
            ),
        ));
    }

    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::with_capacity(uncompressed_size);
    decoder.take(uncompressed_size as u64 + 1).read_to_end(&mut decompressed)?;

    if decompressed.len() != uncompressed_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "size mismatch: expected {}, got {}",
                uncompressed_size,
                decompressed.len()
            ),
        ));
    }

    Ok(decompressed)
}
