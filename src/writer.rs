//! Write side of a stream set
//!
//! [`StreamSetWriter`] buffers caller bytes per stream and emits one chunk
//! whenever a stream's buffer fills. Chunks are appended at the end of the
//! set in flush order, so data from different streams interleaves on disk;
//! each stream stays readable on its own because every chunk header links
//! to the stream's next chunk.
//!
//! The file is written out of order: a flush first seeks back to the
//! stream's previous header and patches its `next_head` field with the
//! offset of the chunk about to be appended, then seeks to the end of the
//! set and writes the new header and payload.

use std::io;
use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, trace};

use crate::codec::compress_block;
use crate::header::{ChunkHeader, CHUNK_HEADER_LEN, NEXT_HEAD_OFFSET};
use crate::{ChunkKind, Error, Result, BASE_BUF_SIZE, MAX_LEVEL};

/// Buffered write state for one logical stream.
#[derive(Debug)]
struct WriteStream {
    /// Offset of the `next_head` field to patch when this stream's next
    /// chunk is emitted, relative to the start of the set.
    patch_pos: u32,
    /// Bytes queued for the next flush.
    buf: Vec<u8>,
}

/// Writer for a set of multiplexed streams.
///
/// The set begins at the file's position at creation time and grows by
/// appending; the writer assumes sole use of the file until
/// [`finish`](Self::finish) returns it.
///
/// Every flush seeks between the previous header and the end of the set,
/// so wrapping the file in a [`std::io::BufWriter`] buys little: the seek
/// drains the buffer each time. The per-stream buffers already batch the
/// small writes.
#[derive(Debug)]
pub struct StreamSetWriter<F> {
    file: F,
    streams: Vec<WriteStream>,
    /// Per-stream buffer capacity. One chunk is emitted per `bufsize`
    /// bytes of stream data, except for the final partial chunk.
    bufsize: u32,
    /// Offset of the next appended byte, relative to `base`.
    cur_pos: u32,
    /// Absolute file offset where the set begins.
    base: u64,
    /// Compression level for chunk payloads, 0 stores everything raw.
    level: u8,
}

impl<F: Write + Seek> StreamSetWriter<F> {
    /// Create a writer for `num_streams` streams at the file's current
    /// position.
    ///
    /// Reserves one placeholder header per stream; the placeholders become
    /// the heads of the per-stream chunk chains. `level` selects the zlib
    /// level for chunk payloads and also sizes the per-stream buffers:
    /// 100 KiB at levels 0 and 1, scaling linearly up to 900 KiB at 9.
    pub fn create(mut file: F, num_streams: usize, level: u8) -> Result<Self> {
        if level > MAX_LEVEL {
            return Err(Error::InvalidLevel(level));
        }
        let bufsize = BASE_BUF_SIZE * u32::from(level.max(1));
        let base = file.stream_position()?;

        debug!("Creating stream set: {num_streams} streams, level {level}, base offset {base}");

        let mut streams = Vec::with_capacity(num_streams);
        let mut cur_pos = 0u32;
        for _ in 0..num_streams {
            let next = cur_pos
                .checked_add(CHUNK_HEADER_LEN)
                .ok_or(Error::SetFull)?;
            streams.push(WriteStream {
                patch_pos: cur_pos + NEXT_HEAD_OFFSET,
                buf: Vec::with_capacity(bufsize as usize),
            });
            ChunkHeader::placeholder().write(&mut file)?;
            cur_pos = next;
        }

        Ok(Self {
            file,
            streams,
            bufsize,
            cur_pos,
            base,
            level,
        })
    }

    /// Append `data` to stream `stream`.
    ///
    /// Bytes are buffered until the stream's buffer fills, then flushed as
    /// one chunk. A call either accepts all of `data` or fails; there is no
    /// partial-write result.
    pub fn write_stream(&mut self, stream: usize, mut data: &[u8]) -> Result<()> {
        self.check_stream(stream)?;
        while !data.is_empty() {
            let room = self.bufsize as usize - self.streams[stream].buf.len();
            let n = room.min(data.len());
            self.streams[stream].buf.extend_from_slice(&data[..n]);
            data = &data[n..];

            if self.streams[stream].buf.len() == self.bufsize as usize {
                self.flush_stream(stream)?;
            }
        }
        Ok(())
    }

    /// Borrow stream `stream` as an [`io::Write`] implementation.
    ///
    /// Bytes written through the sink are buffered like
    /// [`write_stream`](Self::write_stream); `flush` on the sink is a
    /// no-op, buffered data is emitted by [`finish`](Self::finish).
    pub fn sink(&mut self, stream: usize) -> Result<StreamSink<'_, F>> {
        self.check_stream(stream)?;
        Ok(StreamSink {
            writer: self,
            stream,
        })
    }

    /// Flush every stream's remaining bytes and return the file.
    ///
    /// Streams whose buffer is empty emit no final chunk; their last
    /// header keeps a zero next-chunk link, which readers treat as
    /// end-of-stream.
    pub fn finish(mut self) -> Result<F> {
        for i in 0..self.streams.len() {
            if !self.streams[i].buf.is_empty() {
                self.flush_stream(i)?;
            }
        }
        debug!("Closed stream set: {} bytes", self.cur_pos);
        Ok(self.file)
    }

    /// Number of streams in the set.
    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Per-stream buffer capacity, the maximum decompressed chunk size.
    pub fn bufsize(&self) -> u32 {
        self.bufsize
    }

    /// Length of the set so far, excluding buffered data.
    pub fn position(&self) -> u32 {
        self.cur_pos
    }

    /// Bytes currently buffered for `stream`.
    pub fn buffered(&self, stream: usize) -> Result<usize> {
        self.check_stream(stream)?;
        Ok(self.streams[stream].buf.len())
    }

    /// Emit the stream's buffered bytes as one chunk at the end of the
    /// set, linking it from the stream's previous chunk header.
    fn flush_stream(&mut self, stream: usize) -> Result<()> {
        let raw_len = self.streams[stream].buf.len() as u32;

        // Fail before touching the file if the chunk cannot fit under the
        // 4 GiB offset limit. The stored payload never exceeds raw_len.
        self.cur_pos
            .checked_add(CHUNK_HEADER_LEN + raw_len)
            .ok_or(Error::SetFull)?;

        // Patch the previous header so it points at the chunk about to be
        // appended.
        let patch_pos = self.streams[stream].patch_pos;
        self.seek_to(patch_pos)?;
        self.file.write_u32::<LittleEndian>(self.cur_pos)?;
        self.streams[stream].patch_pos = self.cur_pos + NEXT_HEAD_OFFSET;

        self.seek_to(self.cur_pos)?;

        let buf = std::mem::take(&mut self.streams[stream].buf);
        let (kind, payload) = match compress_block(&buf, self.level) {
            Some(compressed) => (ChunkKind::ZLib, compressed),
            None => (ChunkKind::Raw, buf),
        };

        let header = ChunkHeader {
            kind,
            stored_len: payload.len() as u32,
            raw_len,
            next_head: 0,
        };
        header.write(&mut self.file)?;
        self.cur_pos += CHUNK_HEADER_LEN;

        self.file.write_all(&payload)?;
        self.cur_pos += header.stored_len;

        trace!(
            "Flushed stream {stream}: {} -> {} bytes ({kind:?}), set now {} bytes",
            raw_len,
            header.stored_len,
            self.cur_pos
        );

        self.streams[stream].buf = Vec::with_capacity(self.bufsize as usize);
        Ok(())
    }

    /// Seek to an offset relative to the start of the set.
    fn seek_to(&mut self, pos: u32) -> Result<()> {
        self.file.seek(SeekFrom::Start(self.base + u64::from(pos)))?;
        Ok(())
    }

    fn check_stream(&self, stream: usize) -> Result<()> {
        if stream >= self.streams.len() {
            return Err(Error::StreamIndexOutOfRange {
                index: stream,
                num_streams: self.streams.len(),
            });
        }
        Ok(())
    }
}

/// [`io::Write`] adapter for one stream of a [`StreamSetWriter`].
pub struct StreamSink<'a, F> {
    writer: &'a mut StreamSetWriter<F>,
    stream: usize,
}

impl<F: Write + Seek> io::Write for StreamSink<'_, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer
            .write_stream(self.stream, buf)
            .map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
