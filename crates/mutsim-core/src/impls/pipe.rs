//! PipeTransport - line transport over any tokio reader/writer pair.
//!
//! Works for child process stdio as well as `tokio::io::duplex` pipes in
//! tests.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::line_reader::{DEFAULT_MAX_LINE_BYTES, LineReader};
use crate::ports::Transport;

pub struct PipeTransport<R, W> {
    lines: LineReader<R>,
    writer: W,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite> PipeTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_line_bytes(reader, writer, DEFAULT_MAX_LINE_BYTES)
    }

    /// Cap reply lines at `max_line_bytes`. Longer replies come back as
    /// `InvalidData` and are never buffered whole.
    pub fn with_max_line_bytes(reader: R, writer: W, max_line_bytes: usize) -> Self {
        Self {
            lines: LineReader::with_max_line_bytes(reader, max_line_bytes),
            writer,
        }
    }

    /// Reply bytes received but not yet returned as a line.
    pub fn buffered(&self) -> usize {
        self.lines.buffered()
    }
}

#[async_trait]
impl<R, W> Transport for PipeTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }

    async fn recv_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}
