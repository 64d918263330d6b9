//! Read side of a stream set
//!
//! [`StreamSetReader`] follows each stream's chunk chain on demand: when a
//! stream's buffer runs dry, the next chunk header is fetched through the
//! previous header's link, its payload is read and decompressed, and the
//! caller keeps draining bytes. Reads are sequential per stream; streams
//! can be consumed in any interleaving.

use std::io;
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace, warn};

use crate::codec::decompress_block;
use crate::header::{ChunkHeader, RawChunkHeader, CHUNK_HEADER_LEN};
use crate::{ChunkKind, Error, Result, MAX_BUF_SIZE};

/// Buffered read state for one logical stream.
#[derive(Debug)]
struct ReadStream {
    /// Offset of the next chunk header to read, relative to the start of
    /// the set. A zero link on an exhausted buffer means end-of-stream.
    next_head: u32,
    /// Decompressed payload of the current chunk.
    buf: Vec<u8>,
    /// Read cursor within `buf`.
    pos: usize,
}

/// Reader for a set of multiplexed streams.
///
/// The set is expected at the file's position at open time. The reader
/// assumes sole use of the file until [`finish`](Self::finish) returns it.
#[derive(Debug)]
pub struct StreamSetReader<F> {
    file: F,
    streams: Vec<ReadStream>,
    /// Absolute file offset where the set begins.
    base: u64,
    /// Header and payload bytes consumed so far.
    total_read: u64,
}

impl<F: Read + Seek> StreamSetReader<F> {
    /// Open a set of `num_streams` streams at the file's current position.
    ///
    /// Validates the placeholder header of every stream. A leading run of
    /// 13 zero bytes before stream 0 is skipped once; some legacy writers
    /// emitted such a sentinel ahead of the real headers.
    pub fn open(mut file: F, num_streams: usize) -> Result<Self> {
        let mut base = file.stream_position()?;

        debug!("Opening stream set: {num_streams} streams at offset {base}");

        let mut streams = Vec::with_capacity(num_streams);
        let mut total_read = 0u64;
        let mut sentinel_skipped = false;

        for i in 0..num_streams {
            let mut raw = RawChunkHeader::parse(&mut file)?;

            if i == 0 && !sentinel_skipped && raw.is_zero_sentinel() {
                warn!("Skipping leading zero sentinel before stream set");
                base += u64::from(CHUNK_HEADER_LEN);
                sentinel_skipped = true;
                raw = RawChunkHeader::parse(&mut file)?;
            }

            if raw.tag != ChunkKind::Raw.as_byte() {
                return Err(Error::InvalidInitialTag {
                    stream: i,
                    tag: raw.tag,
                });
            }
            if raw.stored_len != 0 || raw.raw_len != 0 {
                return Err(Error::InvalidInitialHeader {
                    stream: i,
                    stored_len: raw.stored_len,
                    raw_len: raw.raw_len,
                });
            }

            total_read += u64::from(CHUNK_HEADER_LEN);
            streams.push(ReadStream {
                next_head: raw.next_head,
                buf: Vec::new(),
                pos: 0,
            });
        }

        Ok(Self {
            file,
            streams,
            base,
            total_read,
        })
    }

    /// Read up to `dst.len()` bytes from stream `stream`.
    ///
    /// Returns the number of bytes copied. A short count only means the
    /// stream ended; every other condition is an error, and an error
    /// discards whatever progress the call had made.
    pub fn read_stream(&mut self, stream: usize, dst: &mut [u8]) -> Result<usize> {
        self.check_stream(stream)?;

        let mut copied = 0;
        while copied < dst.len() {
            let s = &mut self.streams[stream];
            let n = (s.buf.len() - s.pos).min(dst.len() - copied);
            if n > 0 {
                dst[copied..copied + n].copy_from_slice(&s.buf[s.pos..s.pos + n]);
                s.pos += n;
                copied += n;
            }

            if copied < dst.len() {
                self.fill_stream(stream)?;
                if self.streams[stream].buf.is_empty() {
                    break;
                }
            }
        }

        Ok(copied)
    }

    /// Borrow stream `stream` as an [`io::Read`] implementation.
    ///
    /// The source reports end-of-stream the usual way, by returning 0.
    pub fn source(&mut self, stream: usize) -> Result<StreamSource<'_, F>> {
        self.check_stream(stream)?;
        Ok(StreamSource {
            reader: self,
            stream,
        })
    }

    /// Position the file just past the last byte consumed and return it.
    ///
    /// Leaves the caller ready to keep reading whatever follows the set.
    pub fn finish(mut self) -> Result<F> {
        self.file
            .seek(SeekFrom::Start(self.base + self.total_read))?;
        Ok(self.file)
    }

    /// Number of streams in the set.
    pub fn num_streams(&self) -> usize {
        self.streams.len()
    }

    /// Header and payload bytes consumed so far, excluding any skipped
    /// sentinel.
    pub fn bytes_consumed(&self) -> u64 {
        self.total_read
    }

    /// Load the stream's next chunk: follow the header link, read the
    /// payload and decompress it into the stream buffer.
    fn fill_stream(&mut self, stream: usize) -> Result<()> {
        self.seek_to(self.streams[stream].next_head)?;
        let header = ChunkHeader::parse(&mut self.file)?;
        self.streams[stream].next_head = header.next_head;
        self.total_read += u64::from(CHUNK_HEADER_LEN);

        if header.stored_len > MAX_BUF_SIZE {
            return Err(Error::ChunkSizeExceeded {
                len: header.stored_len,
                max: MAX_BUF_SIZE,
            });
        }
        if header.raw_len > MAX_BUF_SIZE {
            return Err(Error::ChunkSizeExceeded {
                len: header.raw_len,
                max: MAX_BUF_SIZE,
            });
        }

        if header.stored_len == 0 && header.raw_len == 0 {
            // Terminal chunk, the stream has no more data.
            let s = &mut self.streams[stream];
            s.buf = Vec::new();
            s.pos = 0;
            return Ok(());
        }

        let mut payload = vec![0u8; header.stored_len as usize];
        self.file.read_exact(&mut payload)?;
        self.total_read += u64::from(header.stored_len);

        let buf = match header.kind {
            ChunkKind::Raw => {
                if header.stored_len != header.raw_len {
                    return Err(Error::RawLengthMismatch {
                        stored_len: header.stored_len,
                        raw_len: header.raw_len,
                    });
                }
                payload
            }
            ChunkKind::ZLib => decompress_block(&payload, header.raw_len)?,
        };

        trace!(
            "Filled stream {stream}: {} -> {} bytes ({:?})",
            header.stored_len,
            buf.len(),
            header.kind
        );

        let s = &mut self.streams[stream];
        s.buf = buf;
        s.pos = 0;
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

/// [`io::Read`] adapter for one stream of a [`StreamSetReader`].
pub struct StreamSource<'a, F> {
    reader: &'a mut StreamSetReader<F>,
    stream: usize,
}

impl<F: Read + Seek> io::Read for StreamSource<'_, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader
            .read_stream(self.stream, buf)
            .map_err(io::Error::other)
    }
}
