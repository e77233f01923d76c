//! RandomPolicy - the example agent's randomized strategy.
//!
//! One draw over `[0, 100)` per tick, first matching rule wins:
//! - draw < 30 and energy > 5: attack a uniformly chosen direction
//! - draw < 40 and energy > 8: replicate
//! - otherwise rest
//!
//! Both rules test the same draw, so `replicate` only fires for draws in
//! `[30, 40)`, about one draw in ten.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::domain::{Action, Direction, Observation};
use crate::ports::DecisionPolicy;

pub const ATTACK_BELOW: u32 = 30;
pub const REPLICATE_BELOW: u32 = 40;
/// Energy must be strictly above this to attack.
pub const ATTACK_MIN_ENERGY: i64 = 5;
/// Energy must be strictly above this to replicate.
pub const REPLICATE_MIN_ENERGY: i64 = 8;

/// Rule table, separated from the random source.
///
/// `target` is only consulted when the attack rule fires.
pub fn decide(energy: i64, draw: u32, target: impl FnOnce() -> Direction) -> Action {
    if draw < ATTACK_BELOW && energy > ATTACK_MIN_ENERGY {
        Action::Attack { target: target() }
    } else if draw < REPLICATE_BELOW && energy > REPLICATE_MIN_ENERGY {
        Action::Replicate
    } else {
        Action::Rest
    }
}

/// Seed from wall-clock time and process id.
///
/// Not reproducible and not meant to be: two agents started in the same
/// instant still diverge through their pids.
pub fn process_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    nanos ^ (u64::from(std::process::id()) << 32)
}

pub struct RandomPolicy<R = StdRng> {
    rng: R,
}

impl RandomPolicy<StdRng> {
    /// Seeded once from [`process_seed`].
    pub fn from_process_seed() -> Self {
        Self::seeded(process_seed())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> RandomPolicy<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore + Send> DecisionPolicy for RandomPolicy<R> {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose(&mut self, observation: &Observation) -> Action {
        let rng = &mut self.rng;
        let draw = rng.gen_range(0..100u32);
        decide(observation.energy, draw, || {
            Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
        })
    }
}
