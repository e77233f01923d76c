//! Ports - the seams between the protocol core and its collaborators.
//!
//! - [`Transport`]: the byte channel to one agent process
//! - [`DecisionPolicy`]: the agent's pluggable decision function

pub mod policy;
pub mod transport;

pub use self::policy::DecisionPolicy;
pub use self::transport::Transport;
