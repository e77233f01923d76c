//! App - protocol logic built on the ports.
//!
//! # Components
//! - **AgentSession**: host side, one agent, one observation/action per tick
//! - **AgentLoop**: agent side, stdin/stdout style read-decide-write loop
//! - **TickDriver**: host side, all sessions of one tick in parallel

pub mod agent_loop;
pub mod session;
pub mod tick;

pub use self::agent_loop::{AgentLoop, LoopSummary};
pub use self::session::{
    AgentSession, EvictionHandle, SessionConfig, StepOutcome, StepReport,
};
pub use self::tick::{TickDriver, TickReport};
