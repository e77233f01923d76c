//! Error taxonomy for the host/agent protocol.
//!
//! Two layers:
//! - [`CodecError`]: what the pure line codec can report.
//! - [`ProtocolError`]: everything a session or the agent loop can report,
//!   classified by [`ErrorKind`] so callers can pick a fallback policy.

use thiserror::Error;

/// How a caller should react to a [`ProtocolError`].
///
/// - Recoverable: substitute the fallback action and keep the agent.
/// - Fatal: the agent is gone; evict it from the world.
/// - Usage: the host broke the contract (no I/O happened).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Recoverable,
    Fatal,
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The line is not a valid record of the expected message type.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Well-formed action record naming an action outside the supported set.
    #[error("unknown action variant: {0}")]
    UnknownActionVariant(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unknown action variant: {0}")]
    UnknownActionVariant(String),

    #[error("no response within {timeout_ms}ms")]
    TimeoutExceeded { timeout_ms: u64 },

    #[error("agent unavailable: {0}")]
    AgentUnavailable(String),

    /// A previous `step` never resolved (its future was dropped mid-wait).
    #[error("a step is already awaiting a response")]
    StepInFlight,

    #[error("invalid observation: {0}")]
    InvalidObservation(String),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::MalformedMessage(_)
            | ProtocolError::UnknownActionVariant(_)
            | ProtocolError::TimeoutExceeded { .. } => ErrorKind::Recoverable,
            ProtocolError::AgentUnavailable(_) => ErrorKind::Fatal,
            ProtocolError::StepInFlight | ProtocolError::InvalidObservation(_) => ErrorKind::Usage,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

impl From<CodecError> for ProtocolError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedMessage(msg) => ProtocolError::MalformedMessage(msg),
            CodecError::UnknownActionVariant(name) => ProtocolError::UnknownActionVariant(name),
            // An observation we cannot serialize never reaches the wire.
            CodecError::Encode(msg) => ProtocolError::InvalidObservation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::malformed(ProtocolError::MalformedMessage("x".into()), ErrorKind::Recoverable)]
    #[case::unknown(ProtocolError::UnknownActionVariant("flee".into()), ErrorKind::Recoverable)]
    #[case::timeout(ProtocolError::TimeoutExceeded { timeout_ms: 10 }, ErrorKind::Recoverable)]
    #[case::unavailable(ProtocolError::AgentUnavailable("eof".into()), ErrorKind::Fatal)]
    #[case::in_flight(ProtocolError::StepInFlight, ErrorKind::Usage)]
    #[case::invalid(ProtocolError::InvalidObservation("x".into()), ErrorKind::Usage)]
    fn errors_are_classified(#[case] err: ProtocolError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.is_fatal(), kind == ErrorKind::Fatal);
    }

    #[test]
    fn codec_errors_keep_their_category() {
        let err: ProtocolError = CodecError::UnknownActionVariant("flee".into()).into();
        assert_eq!(err, ProtocolError::UnknownActionVariant("flee".into()));

        let err: ProtocolError = CodecError::MalformedMessage("eof".into()).into();
        assert!(matches!(err, ProtocolError::MalformedMessage(_)));
    }

    #[test]
    fn timeout_message_names_the_deadline() {
        let err = ProtocolError::TimeoutExceeded { timeout_ms: 250 };
        assert_eq!(err.to_string(), "no response within 250ms");
    }
}
