//! Transport port - the line channel between host and one agent.
//!
//! Spawning and sandboxing agent processes live outside this crate; whatever
//! does that hands the session something implementing [`Transport`].

use std::io;

use async_trait::async_trait;

/// One exclusive, bidirectional, newline-delimited channel to an agent.
///
/// # Contract
/// - `send_line` writes the whole line and flushes before returning.
/// - `recv_line` returns one line with its terminator stripped, and
///   `Ok(None)` once the agent closed its output.
/// - `recv_line` fails with `InvalidData` for a line it refused (too long,
///   not UTF-8). The channel stays usable and that line counts as read.
/// - `recv_line` must be cancel safe: the session races it against a
///   deadline, and a line that was half-read when the race was lost must be
///   completed by the next call, not dropped.
#[async_trait]
pub trait Transport: Send {
    async fn send_line(&mut self, line: &str) -> io::Result<()>;

    async fn recv_line(&mut self) -> io::Result<Option<String>>;
}
