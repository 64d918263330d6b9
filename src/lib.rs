//! Multiplexed stream storage for seekable archive files
//!
//! This crate packs N independent logical byte streams into one region of a
//! seekable file, compressing each stream's data chunk by chunk. It is the
//! storage substrate for an archiver: callers write to and read from any of
//! the N streams without caring how the bytes are interleaved on disk.
//!
//! ## On-disk layout
//!
//! A stream set starts with N back-to-back 13-byte chunk headers, one per
//! stream. Every chunk is a 13-byte header followed by its payload:
//!
//! | Offset | Width  | Field      | Meaning                                   |
//! |--------|--------|------------|-------------------------------------------|
//! | 0      | u8     | tag        | 3 = raw, 4 = zlib-compressed              |
//! | 1      | u32 LE | stored_len | payload length on disk                    |
//! | 5      | u32 LE | raw_len    | payload length after decompression        |
//! | 9      | u32 LE | next_head  | offset of the stream's next chunk header  |
//!
//! Chunks from different streams are appended in flush order and chained per
//! stream through `next_head`, which is back-patched into the previous
//! header once the following chunk's offset is known. A zero `next_head`
//! together with a zero `raw_len` marks the end of a stream.
//!
//! All offsets are relative to where the set begins, so a set can live at
//! any position inside a larger file. Offsets are 32-bit on the wire, which
//! bounds one set to 4 GiB.
//!
//! ## Usage
//!
//! [`StreamSetWriter`] buffers writes per stream and emits one chunk per
//! full buffer; [`StreamSetReader`] follows each stream's chunk chain and
//! decompresses on demand. Both hand the underlying file back through
//! `finish()`.

pub mod codec;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use codec::{compress_block, decompress_block};
pub use error::{Error, Result};
pub use header::{ChunkHeader, RawChunkHeader, CHUNK_HEADER_LEN, NEXT_HEAD_OFFSET};
pub use reader::{StreamSetReader, StreamSource};
pub use writer::{StreamSetWriter, StreamSink};

/// Per-stream buffer capacity at compression level 0 and 1.
pub const BASE_BUF_SIZE: u32 = 100 * 1024;

/// Largest per-stream buffer capacity any level can produce, and the upper
/// bound a reader accepts for a single chunk's stored or decompressed size.
pub const MAX_BUF_SIZE: u32 = BASE_BUF_SIZE * MAX_LEVEL as u32;

/// Highest compression level accepted by [`StreamSetWriter::create`].
pub const MAX_LEVEL: u8 = 9;

/// Chunk payload encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// Payload stored as-is (tag 3)
    Raw = 3,
    /// Payload zlib-compressed (tag 4)
    ZLib = 4,
}

impl ChunkKind {
    /// Parse a chunk kind from its tag byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            3 => Some(Self::Raw),
            4 => Some(Self::ZLib),
            _ => None,
        }
    }

    /// Get the tag byte representation
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}
