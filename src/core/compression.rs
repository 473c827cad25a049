//! Compression support for geometry files.
//!
//! Geometry documents may be stored gzip-compressed (`*.geo.gz`).

use std::io::{Read, Write};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::util::Result;

/// Gzip member header magic.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compress data using gzip.
///
/// # Arguments
/// * `data` - Data to compress
/// * `level` - Compression level (0-9, where 0 is no compression, 9 is max)
///
/// Level 0 returns the data unchanged.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    if level == 0 {
        return Ok(data.to_vec());
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress gzip data. Data without the gzip header is returned as-is.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if !is_compressed(data) {
        return Ok(data.to_vec());
    }

    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Check if data starts with the gzip header signature.
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= GZIP_MAGIC.len() && data[..2] == GZIP_MAGIC
}
