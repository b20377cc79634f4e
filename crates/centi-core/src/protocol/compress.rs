// ============================================
// File: crates/centi-core/src/protocol/compress.rs
// ============================================
//! # Payload Compression
//!
//! Gzip is applied before fragmentation and kept only when it actually
//! shrinks the payload. Decompression is capped so a peer cannot make us
//! inflate an arbitrarily large message.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CoreError, Result};

/// Largest payload [`decompress`] will produce.
pub const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Compresses `data` if that makes it strictly smaller.
///
/// # Returns
/// `(payload, compressed)` where `payload` is either the gzip stream
/// or a copy of `data`.
///
/// # Errors
/// - `Compression`: the encoder failed
pub fn compress(data: &[u8]) -> Result<(Vec<u8>, bool)> {
    if data.is_empty() {
        return Ok((Vec::new(), false));
    }

    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CoreError::compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CoreError::compression(e.to_string()))?;

    if compressed.len() < data.len() {
        Ok((compressed, true))
    } else {
        Ok((data.to_vec(), false))
    }
}

/// Inflates a gzip stream produced by [`compress`].
///
/// # Errors
/// - `Compression`: corrupt stream or output above [`MAX_DECOMPRESSED_SIZE`]
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(MAX_DECOMPRESSED_SIZE as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CoreError::compression(e.to_string()))?;

    if out.len() > MAX_DECOMPRESSED_SIZE {
        return Err(CoreError::compression("decompressed payload too large"));
    }
    Ok(out)
}
