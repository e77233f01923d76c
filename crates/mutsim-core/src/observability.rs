//! Counters for operators and host-side eviction policies.

use serde::{Deserialize, Serialize};

/// Per-session exchange counters.
///
/// `consecutive_timeouts` resets on any reply; hosts that evict slow agents
/// usually key off it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub steps: u64,
    pub delivered: u64,
    pub malformed: u64,
    pub unknown_variants: u64,
    pub timeouts: u64,
    pub consecutive_timeouts: u32,
    pub late_replies_discarded: u64,
}

/// Totals over one tick of a [`crate::app::TickDriver`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickCounts {
    pub stepped: usize,
    pub delivered: usize,
    pub fallbacks: usize,
    pub evicted: usize,
}
