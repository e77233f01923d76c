//! LineReader - newline framing with a hard cap on line length.
//!
//! Shared by both ends of the protocol: the host reads replies through it
//! (via [`PipeTransport`](super::PipeTransport)) and the agent loop reads
//! observations through it. Framing is `tokio_util`'s `LinesCodec`, driven by
//! hand so that one bad line does not end the stream.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// Longest line accepted by default, terminator excluded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 8 * 1024;

pub struct LineReader<R> {
    reader: R,
    codec: LinesCodec,
    buf: BytesMut,
    max_line_bytes: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_bytes(reader, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            codec: LinesCodec::new_with_max_length(max_line_bytes),
            buf: BytesMut::with_capacity(READ_CHUNK),
            max_line_bytes,
            eof: false,
        }
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Bytes read but not yet handed out. At most `max_line_bytes` while a
    /// read is pending, whatever the peer sends.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next line, terminator (`\n` or `\r\n`) stripped. `Ok(None)` at end of
    /// input; an unterminated tail is returned as a last line.
    ///
    /// A line over the cap, or one that is not UTF-8, is an `InvalidData`
    /// error. The stream stays usable: the rest of an over-long line is
    /// dropped as it arrives and the next call starts after it.
    ///
    /// Cancel safe. Bytes already read stay buffered for the next call.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let decoded = if self.eof {
                self.codec.decode_eof(&mut self.buf)
            } else {
                self.codec.decode(&mut self.buf)
            };
            match decoded {
                Ok(Some(line)) => return Ok(Some(line)),
                Ok(None) if self.eof => return Ok(None),
                Ok(None) => {}
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("line longer than {} bytes", self.max_line_bytes),
                    ));
                }
                Err(LinesCodecError::Io(err)) => return Err(err),
            }

            self.buf.reserve(READ_CHUNK);
            if self.reader.read_buf(&mut self.buf).await? == 0 {
                self.eof = true;
            }
        }
    }
}
