//! Per-chunk block compression
//!
//! Chunks are compressed independently with zlib. Compression is kept only
//! when it strictly shrinks the payload; every failure on the compress side
//! falls back to storing the chunk raw.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::trace;

use crate::{Error, Result};

/// Try to compress `data` at the given level.
///
/// Returns `None` when level 0 disables compression, when the encoder
/// fails, or when the result would not be strictly smaller than the input.
/// The caller stores the chunk raw in all of those cases; a `None` here is
/// never a session failure.
pub fn compress_block(data: &[u8], level: u8) -> Option<Vec<u8>> {
    if level == 0 {
        return None;
    }

    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len()),
        Compression::new(u32::from(level)),
    );
    encoder.write_all(data).ok()?;
    let compressed = encoder.finish().ok()?;

    if compressed.len() >= data.len() {
        trace!(
            "Compression gained nothing ({} -> {} bytes), storing raw",
            data.len(),
            compressed.len()
        );
        return None;
    }

    Some(compressed)
}

/// Decompress a block into exactly `raw_len` bytes.
///
/// The declared decompressed length comes from the chunk header; any
/// mismatch is an error.
pub fn decompress_block(data: &[u8], raw_len: u32) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(raw_len as usize);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(format!("zlib: {e}")))?;

    if out.len() != raw_len as usize {
        return Err(Error::DecompressedSizeMismatch {
            expected: u64::from(raw_len),
            actual: out.len() as u64,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressible_round_trip() -> Result<()> {
        let data = vec![0xAB; 4096];
        let compressed = compress_block(&data, 6).expect("repeated bytes should compress");
        assert!(compressed.len() < data.len());

        let restored = decompress_block(&compressed, data.len() as u32)?;
        assert_eq!(restored, data);
        Ok(())
    }

    #[test]
    fn test_level_zero_disables_compression() {
        assert!(compress_block(&[0xAB; 4096], 0).is_none());
    }

    #[test]
    fn test_incompressible_falls_back() {
        // Compressed output has no redundancy left, so a second pass
        // cannot shrink it further.
        let data = compress_block(&vec![0x5A; 4096], 9).unwrap();
        assert!(compress_block(&data, 9).is_none());
    }

    #[test]
    fn test_length_mismatch() {
        let compressed = compress_block(&vec![0xAB; 4096], 6).unwrap();
        let err = decompress_block(&compressed, 4095).unwrap_err();
        assert!(
            matches!(
                err,
                Error::DecompressedSizeMismatch {
                    expected: 4095,
                    actual: 4096,
                }
            ),
            "actual: {err:?}",
        );
    }

    #[test]
    fn test_garbage_input() {
        let err = decompress_block(b"not a zlib stream", 64).unwrap_err();
        assert!(matches!(err, Error::DecompressionFailed(_)), "actual: {err:?}");
    }
}
