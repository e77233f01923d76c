//! Impls - concrete transports and policies.
//!
//! - **LineReader**: capped newline framing, shared by host and agent
//! - **PipeTransport**: tokio reader/writer pair as a line transport
//! - **RandomPolicy**: the example agent's randomized strategy
//! - **DefensivePolicy**: threat-counting strategy with in-memory bookkeeping

pub mod defensive_policy;
pub mod line_reader;
pub mod pipe;
pub mod random_policy;

pub use self::defensive_policy::{DefensiveMemory, DefensivePolicy};
pub use self::line_reader::{DEFAULT_MAX_LINE_BYTES, LineReader};
pub use self::pipe::PipeTransport;
pub use self::random_policy::RandomPolicy;
