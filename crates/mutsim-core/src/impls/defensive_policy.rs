//! DefensivePolicy - threat-counting strategy with in-memory bookkeeping.
//!
//! A threat is any neighbor at least as strong as we are.
//! 1. Two or more threats and energy <= 4: replicate if energy >= 3, else rest.
//! 2. Energy >= 10: replicate.
//! 3. Any threat: attack the weakest directed neighbor that has energy > 0
//!    and energy >= ours - 2 (rest if none qualifies).
//! 4. Otherwise rest.

use std::collections::VecDeque;

use serde::Serialize;

use crate::domain::{Action, Observation, Position};
use crate::ports::DecisionPolicy;

/// How many recent positions the memory keeps.
pub const POSITION_HISTORY: usize = 20;

/// Counters the policy keeps for the lifetime of the agent process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DefensiveMemory {
    pub turns_played: u64,
    pub replications_made: u64,
    pub emergency_replications: u64,
    pub defensive_attacks: u64,
    pub peaceful_rests: u64,
    pub positions_visited: VecDeque<Position>,
}

impl DefensiveMemory {
    fn visit(&mut self, position: Position) {
        self.turns_played += 1;
        self.positions_visited.push_back(position);
        while self.positions_visited.len() > POSITION_HISTORY {
            self.positions_visited.pop_front();
        }
    }
}

#[derive(Debug, Default)]
pub struct DefensivePolicy {
    memory: DefensiveMemory,
}

impl DefensivePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(&self) -> &DefensiveMemory {
        &self.memory
    }
}

impl DecisionPolicy for DefensivePolicy {
    fn name(&self) -> &'static str {
        "defensive"
    }

    fn choose(&mut self, observation: &Observation) -> Action {
        let energy = observation.energy;
        let memory = &mut self.memory;
        memory.visit(observation.position);

        let threats = observation
            .neighbors
            .iter()
            .filter(|n| n.energy >= energy)
            .count();

        if threats >= 2 && energy <= 4 {
            if energy >= 3 {
                memory.emergency_replications += 1;
                return Action::Replicate;
            }
            return Action::Rest;
        }

        if energy >= 10 {
            memory.replications_made += 1;
            return Action::Replicate;
        }

        if threats > 0 {
            // min_by_key keeps the first of equal minima
            let weakest = observation
                .neighbors
                .iter()
                .filter(|n| n.energy > 0 && n.energy >= energy - 2)
                .filter_map(|n| n.direction.map(|d| (n.energy, d)))
                .min_by_key(|(e, _)| *e);

            return match weakest {
                Some((_, target)) => {
                    memory.defensive_attacks += 1;
                    Action::Attack { target }
                }
                None => Action::Rest,
            };
        }

        memory.peaceful_rests += 1;
        Action::Rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, Direction, Neighbor};
    use rstest::rstest;

    fn neighbor(energy: i64, direction: Option<Direction>) -> Neighbor {
        Neighbor {
            energy,
            agent_id: AgentId::default(),
            direction,
        }
    }

    fn observe(energy: i64, neighbors: Vec<Neighbor>) -> Observation {
        let mut obs = Observation::new(0, energy);
        obs.neighbors = neighbors;
        obs
    }

    #[rstest]
    #[case::cornered_can_replicate(3, vec![neighbor(5, None), neighbor(9, None)], Action::Replicate)]
    #[case::cornered_too_weak(2, vec![neighbor(5, None), neighbor(9, None)], Action::Rest)]
    #[case::strong_replicates(12, vec![neighbor(20, Some(Direction::North))], Action::Replicate)]
    #[case::no_threats_rests(6, vec![neighbor(1, Some(Direction::East))], Action::Rest)]
    #[case::lonely_rests(6, vec![], Action::Rest)]
    #[case::threat_without_direction(6, vec![neighbor(7, None)], Action::Rest)]
    #[case::attacks_threat(
        6,
        vec![neighbor(9, Some(Direction::South))],
        Action::attack(Direction::South)
    )]
    fn decision_table(
        #[case] energy: i64,
        #[case] neighbors: Vec<Neighbor>,
        #[case] expected: Action,
    ) {
        let mut policy = DefensivePolicy::new();
        assert_eq!(policy.choose(&observe(energy, neighbors)), expected);
    }

    #[test]
    fn attacks_the_weakest_qualifying_neighbor() {
        let mut policy = DefensivePolicy::new();
        let obs = observe(
            6,
            vec![
                neighbor(9, Some(Direction::North)),
                neighbor(4, Some(Direction::East)),
                neighbor(3, Some(Direction::West)),
                neighbor(7, Some(Direction::South)),
            ],
        );
        // West (3) is below 6 - 2, so East (4) is the weakest that qualifies.
        assert_eq!(policy.choose(&obs), Action::attack(Direction::East));
        assert_eq!(policy.memory().defensive_attacks, 1);
    }

    #[test]
    fn memory_counts_turns_and_trims_positions() {
        let mut policy = DefensivePolicy::new();
        for tick in 0..25 {
            let mut obs = Observation::new(tick, 6);
            obs.position = Position::new(tick as i64, 0);
            policy.choose(&obs);
        }

        let memory = policy.memory();
        assert_eq!(memory.turns_played, 25);
        assert_eq!(memory.peaceful_rests, 25);
        assert_eq!(memory.positions_visited.len(), POSITION_HISTORY);
        assert_eq!(memory.positions_visited.front(), Some(&Position::new(5, 0)));
    }
}
