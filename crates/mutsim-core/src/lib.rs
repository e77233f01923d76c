//! mutsim-core
//!
//! Host/agent protocol for the mutation simulator: one JSON observation line
//! goes to an agent process each tick, one JSON action line comes back.
//!
//! # Modules
//! - **domain**: observation, action, ids, session/loop states
//! - **codec**: line encode/decode with required-field validation
//! - **ports**: `Transport` and `DecisionPolicy` seams
//! - **impls**: pipe transport, random and defensive policies
//! - **app**: agent session, agent-side loop, tick driver
//! - **error**: protocol error taxonomy
//! - **observability**: session and tick counters

pub mod app;
pub mod codec;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{AgentLoop, AgentSession, StepReport, TickDriver};
pub use domain::{Action, AgentId, Direction, Observation};
pub use error::{CodecError, ErrorKind, ProtocolError};
