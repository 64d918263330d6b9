//! Chunk header encoding and decoding
//!
//! Every chunk on disk begins with a fixed 13-byte header: a one-byte
//! payload tag, the stored payload length, the decompressed payload length
//! and the offset of the stream's next chunk header. All multi-byte fields
//! are little-endian. Positioning is the caller's concern; this module only
//! reads and writes at the current position.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::{ChunkKind, Error, Result};

/// Size of an encoded chunk header on disk.
pub const CHUNK_HEADER_LEN: u32 = 13;

/// Byte offset of the `next_head` field within an encoded header.
///
/// Writers back-patch this field of a previously emitted header once the
/// offset of the stream's following chunk is known.
pub const NEXT_HEAD_OFFSET: u32 = 9;

/// Fixed-size header preceding every chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// How the payload is encoded.
    pub kind: ChunkKind,
    /// Payload length on disk.
    pub stored_len: u32,
    /// Payload length after decompression. Equals `stored_len` for
    /// [`ChunkKind::Raw`] chunks.
    pub raw_len: u32,
    /// Offset of the stream's next chunk header, relative to the start of
    /// the set, or 0 while the next chunk has not been written.
    pub next_head: u32,
}

impl ChunkHeader {
    /// The placeholder header reserved per stream when a set is created.
    ///
    /// Its `next_head` field is back-patched when the stream's first real
    /// chunk is emitted.
    pub const fn placeholder() -> Self {
        Self {
            kind: ChunkKind::Raw,
            stored_len: 0,
            raw_len: 0,
            next_head: 0,
        }
    }

    /// Parse a header at the reader's current position.
    pub fn parse<R: Read>(f: &mut R) -> Result<Self> {
        RawChunkHeader::parse(f)?.decode()
    }

    /// Write the header at the writer's current position.
    pub fn write<W: Write>(&self, f: &mut W) -> Result<()> {
        f.write_u8(self.kind.as_byte())?;
        f.write_u32::<LittleEndian>(self.stored_len)?;
        f.write_u32::<LittleEndian>(self.raw_len)?;
        f.write_u32::<LittleEndian>(self.next_head)?;
        Ok(())
    }
}

/// Undecoded header fields, exactly as laid out on disk.
///
/// Used where the tag byte has to be inspected before it is known to name a
/// valid [`ChunkKind`], such as the placeholder headers at the front of a
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunkHeader {
    pub tag: u8,
    pub stored_len: u32,
    pub raw_len: u32,
    pub next_head: u32,
}

impl RawChunkHeader {
    /// Parse the raw header fields at the reader's current position.
    pub fn parse<R: Read>(f: &mut R) -> Result<Self> {
        let tag = f.read_u8()?;
        let stored_len = f.read_u32::<LittleEndian>()?;
        let raw_len = f.read_u32::<LittleEndian>()?;
        let next_head = f.read_u32::<LittleEndian>()?;
        Ok(Self {
            tag,
            stored_len,
            raw_len,
            next_head,
        })
    }

    /// Decode the tag byte into a typed [`ChunkHeader`].
    pub fn decode(self) -> Result<ChunkHeader> {
        let kind = ChunkKind::from_byte(self.tag).ok_or(Error::UnknownChunkKind(self.tag))?;
        Ok(ChunkHeader {
            kind,
            stored_len: self.stored_len,
            raw_len: self.raw_len,
            next_head: self.next_head,
        })
    }

    /// `true` for the 13-zero-byte header some legacy writers emitted
    /// ahead of the real stream set.
    pub fn is_zero_sentinel(&self) -> bool {
        self.tag == 0 && self.stored_len == 0 && self.raw_len == 0 && self.next_head == 0
    }
}
