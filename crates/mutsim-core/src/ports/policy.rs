//! Decision policy port.
//!
//! A policy maps one observation to one action. It runs inside the agent
//! process, never in the host. Policies may keep private memory across
//! ticks (`&mut self`), but the loop that drives them keeps none.

use crate::domain::{Action, Observation};

pub trait DecisionPolicy: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn choose(&mut self, observation: &Observation) -> Action;
}

impl<P: DecisionPolicy + ?Sized> DecisionPolicy for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn choose(&mut self, observation: &Observation) -> Action {
        (**self).choose(observation)
    }
}
