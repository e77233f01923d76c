//! Observation model: the per-tick world snapshot sent to one agent.
//!
//! Only `tick` and `energy` are required on the wire. Everything else has a
//! default so that minimal hosts (and old agents' test harnesses) still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::action::Direction;
use super::ids::AgentId;

/// Most neighbors one observation may report (the 8 adjacent cells).
pub const MAX_NEIGHBORS: usize = 8;

/// Deadline assumed when a host omits `timeout_ms`.
pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;

/// Grid coordinates, `[x, y]` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<[i64; 2]> for Position {
    fn from([x, y]: [i64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [i64; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

/// World bounds, `[width, height]` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct WorldSize {
    pub width: i64,
    pub height: i64,
}

impl WorldSize {
    pub fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }

    /// `[0, 0]`-style sizes mean the host did not report its bounds.
    pub fn is_unknown(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, p: Position) -> bool {
        (0..self.width).contains(&p.x) && (0..self.height).contains(&p.y)
    }
}

impl From<[i64; 2]> for WorldSize {
    fn from([width, height]: [i64; 2]) -> Self {
        Self { width, height }
    }
}

impl From<WorldSize> for [i64; 2] {
    fn from(s: WorldSize) -> Self {
        [s.width, s.height]
    }
}

/// Read-only snapshot of an adjacent agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub energy: i64,

    #[serde(default)]
    pub agent_id: AgentId,

    /// Which side the neighbor is on, when the host reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl Neighbor {
    pub fn new(agent_id: AgentId, energy: i64) -> Self {
        Self {
            energy,
            agent_id,
            direction: None,
        }
    }

    pub fn toward(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub tick: u64,

    #[serde(default)]
    pub agent_id: AgentId,

    #[serde(default)]
    pub position: Position,

    pub energy: i64,

    #[serde(default)]
    pub world_size: WorldSize,

    #[serde(default, deserialize_with = "deserialize_neighbors")]
    pub neighbors: Vec<Neighbor>,

    #[serde(default)]
    pub generation: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Observation {
    /// Minimal observation with every optional field at its default.
    ///
    /// The world size is left unknown, so `validate` skips the bounds check
    /// until the caller sets one.
    pub fn new(tick: u64, energy: i64) -> Self {
        Self {
            tick,
            agent_id: AgentId::default(),
            position: Position::default(),
            energy,
            world_size: WorldSize::default(),
            neighbors: Vec::new(),
            generation: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Check the invariants a host must uphold before sending.
    ///
    /// Agents never call this: they take whatever decodes.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be positive".to_string());
        }
        if self.neighbors.len() > MAX_NEIGHBORS {
            return Err(format!(
                "{} neighbors reported, max is {MAX_NEIGHBORS}",
                self.neighbors.len()
            ));
        }
        if !self.world_size.is_unknown() && !self.world_size.contains(self.position) {
            return Err(format!(
                "position [{}, {}] outside world [{}, {}]",
                self.position.x, self.position.y, self.world_size.width, self.world_size.height
            ));
        }
        Ok(())
    }
}

/// Keyed neighbor slot, as in `{"north": {"energy": 3, "agent_id": "b"}}`.
#[derive(Deserialize)]
struct KeyedNeighbor {
    energy: i64,
    #[serde(default)]
    agent_id: AgentId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NeighborsWire {
    List(Vec<Neighbor>),
    Keyed(BTreeMap<String, KeyedNeighbor>),
}

/// Accept both the list form and the direction-keyed form.
fn deserialize_neighbors<'de, D>(deserializer: D) -> Result<Vec<Neighbor>, D::Error>
where
    D: Deserializer<'de>,
{
    let neighbors = match NeighborsWire::deserialize(deserializer)? {
        NeighborsWire::List(list) => list,
        NeighborsWire::Keyed(map) => {
            let mut list: Vec<Neighbor> = map
                .into_iter()
                .map(|(key, slot)| Neighbor {
                    energy: slot.energy,
                    agent_id: slot.agent_id,
                    direction: key.parse().ok(),
                })
                .collect();
            // wire order for known directions, unknown keys last
            list.sort_by_key(|n| n.direction.map_or(Direction::ALL.len(), |d| d as usize));
            list
        }
    };

    if neighbors.len() > MAX_NEIGHBORS {
        return Err(serde::de::Error::custom(format!(
            "{} neighbors reported, max is {MAX_NEIGHBORS}",
            neighbors.len()
        )));
    }
    Ok(neighbors)
}
