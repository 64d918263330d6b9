//! Error types for stream set I/O

use thiserror::Error;

/// Result type for stream set operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stream set error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error, including short reads, short writes and failed seeks
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk header carries a tag byte that is neither raw nor compressed
    #[error("Unknown chunk tag: {0:#04x}")]
    UnknownChunkKind(u8),

    /// Initial header of a stream has an unexpected tag byte
    #[error("Unexpected initial tag {tag:#04x} for stream {stream}")]
    InvalidInitialTag { stream: usize, tag: u8 },

    /// Initial header of a stream declares a nonzero payload
    #[error("Nonzero initial lengths for stream {stream}: stored {stored_len}, decompressed {raw_len}")]
    InvalidInitialHeader {
        stream: usize,
        stored_len: u32,
        raw_len: u32,
    },

    /// Stream index is outside the set
    #[error("Stream index {index} out of range ({num_streams} streams)")]
    StreamIndexOutOfRange { index: usize, num_streams: usize },

    /// Compression level outside the supported range
    #[error("Compression level {0} out of range (0-9)")]
    InvalidLevel(u8),

    /// A raw chunk declares different stored and decompressed lengths
    #[error("Raw chunk length mismatch: stored {stored_len}, decompressed {raw_len}")]
    RawLengthMismatch { stored_len: u32, raw_len: u32 },

    /// Chunk header declares a payload larger than any writer emits
    #[error("Chunk size exceeded: {len} > {max}")]
    ChunkSizeExceeded { len: u32, max: u32 },

    /// Decompression failed
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Decompressed payload does not match the declared length
    #[error("Decompressed length mismatch: expected {expected} bytes, got {actual}")]
    DecompressedSizeMismatch { expected: u64, actual: u64 },

    /// Appending another chunk would push an offset past the 4 GiB limit
    #[error("Stream set exceeds the 4 GiB offset limit")]
    SetFull,
}
