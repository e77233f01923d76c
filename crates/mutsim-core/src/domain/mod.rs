//! Domain model (ids, observations, actions, states).

pub mod action;
pub mod ids;
pub mod observation;
pub mod state;

pub use action::{Action, Direction};
pub use ids::{AgentId, AgentIdTooLong, MAX_AGENT_ID_LEN};
pub use observation::{
    DEFAULT_TIMEOUT_MS, MAX_NEIGHBORS, Neighbor, Observation, Position, WorldSize,
};
pub use state::{LoopState, SessionState};
