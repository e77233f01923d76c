//! Agent identity.
//!
//! Agent ids come from the host and are opaque strings. The only rule the
//! protocol imposes is a fixed maximum length, so that agents written against
//! fixed-size buffers keep working.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest agent id accepted on the wire, in bytes.
pub const MAX_AGENT_ID_LEN: usize = 63;

/// Stable identity of one agent in the world.
///
/// Deserialization rejects ids longer than [`MAX_AGENT_ID_LEN`], so an
/// over-long id surfaces as a malformed message rather than a truncated one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Result<Self, AgentIdTooLong> {
        Self::try_from(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("agent id is {len} bytes, max is {MAX_AGENT_ID_LEN}")]
pub struct AgentIdTooLong {
    pub len: usize,
}

impl TryFrom<String> for AgentId {
    type Error = AgentIdTooLong;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() > MAX_AGENT_ID_LEN {
            return Err(AgentIdTooLong { len: value.len() });
        }
        Ok(Self(value))
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
