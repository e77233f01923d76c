//! Line codec for the host/agent protocol.
//!
//! One message is one JSON object followed by a single `\n`. Encoders return
//! an owned line (terminator included); decoders accept a line with or
//! without its terminator.
//!
//! The codec does no I/O and keeps no state.

mod action;
mod observation;

pub use self::action::{decode_action, encode_action};
pub use self::observation::{decode_observation, encode_observation};

use crate::error::CodecError;

/// Drop the line terminator (`\n` or `\r\n`) if present.
fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn terminate(mut body: String) -> String {
    body.push('\n');
    body
}

fn malformed(err: serde_json::Error) -> CodecError {
    CodecError::MalformedMessage(err.to_string())
}
