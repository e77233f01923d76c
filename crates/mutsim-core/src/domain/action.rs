//! Action model: the single decision an agent returns for one observation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cardinal direction on the grid.
///
/// Serialized in lowercase (`"north"`, ...), which is also the wire spelling
/// of attack targets and keyed neighbor slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All directions in wire order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown direction: {s}"))
    }
}

/// What an agent decided to do this tick.
///
/// New variants are a wire-compatibility concern: a host that does not know a
/// variant reports it as `UnknownActionVariant`, not as garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Rest,
    Attack { target: Direction },
    Replicate,
}

impl Action {
    /// The action substituted whenever an agent fails to answer properly.
    pub const FALLBACK: Action = Action::Rest;

    /// Wire name of the variant (the `action` field).
    pub fn name(&self) -> &'static str {
        match self {
            Action::Rest => "rest",
            Action::Attack { .. } => "attack",
            Action::Replicate => "replicate",
        }
    }

    pub fn attack(target: Direction) -> Self {
        Action::Attack { target }
    }
}

impl Default for Action {
    fn default() -> Self {
        Action::FALLBACK
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attack { target } => write!(f, "attack({target})"),
            other => f.write_str(other.name()),
        }
    }
}
