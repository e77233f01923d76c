//! AgentSession - host side of one agent's lifetime.
//!
//! # One tick
//! 1. validate and encode the observation, write it to the transport
//! 2. wait for one reply line, cut off at `observation.timeout_ms`
//! 3. decode it into an `Action`; anything unusable becomes `rest`
//!
//! Every observation owes exactly one reply line. A reply that misses its
//! deadline is still owed, so it is skipped when it finally shows up instead
//! of being mistaken for the answer to a later tick.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, warn};

use crate::codec;
use crate::domain::{Action, AgentId, Observation, SessionState};
use crate::error::ProtocolError;
use crate::impls::DEFAULT_MAX_LINE_BYTES;
use crate::observability::SessionStats;
use crate::ports::Transport;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Replies longer than this are treated as malformed.
    ///
    /// `PipeTransport` enforces its own cap while framing, so an endless
    /// line is never buffered whole; this check covers transports that
    /// hand over whole lines.
    pub max_line_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// How a `step` resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Delivered,
    /// The fallback action was substituted because of `cause`.
    Fallback(ProtocolError),
}

/// Result of one `step`: the action to apply plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub action: Action,
    pub outcome: StepOutcome,
}

impl StepReport {
    fn delivered(action: Action) -> Self {
        Self {
            action,
            outcome: StepOutcome::Delivered,
        }
    }

    fn fallback(cause: ProtocolError) -> Self {
        Self {
            action: Action::FALLBACK,
            outcome: StepOutcome::Fallback(cause),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, StepOutcome::Delivered)
    }

    /// The condition behind a fallback, if any.
    pub fn warning(&self) -> Option<&ProtocolError> {
        match &self.outcome {
            StepOutcome::Delivered => None,
            StepOutcome::Fallback(cause) => Some(cause),
        }
    }

    /// The agent is gone and must be removed from the world.
    pub fn is_fatal(&self) -> bool {
        self.warning().is_some_and(ProtocolError::is_fatal)
    }
}

/// Lets the host remove an agent, including while a `step` is waiting on it.
///
/// Cloneable and `Send`, so it can live in whatever part of the simulator
/// decides that an agent died of other causes.
#[derive(Debug, Clone)]
pub struct EvictionHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl EvictionHandle {
    pub fn evict(&self) {
        // the session keeps a receiver alive, so this only fails once it is gone
        let _ = self.tx.send(true);
    }
}

/// Where the exchange was when the deadline hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Sending,
    Receiving,
}

enum Exchange {
    Line(String),
    /// The transport refused the line (too long, not UTF-8).
    Unreadable(String),
    Closed(String),
    TimedOut(Phase),
    Evicted,
}

pub struct AgentSession<T> {
    agent_id: AgentId,
    transport: T,
    config: SessionConfig,
    state: SessionState,
    last_resolution: Option<SessionState>,
    last_tick: Option<u64>,
    /// Replies still owed for observations whose deadline passed.
    owed_replies: u32,
    crash_reason: Option<String>,
    stats: SessionStats,
    eviction_tx: Arc<watch::Sender<bool>>,
    eviction_rx: watch::Receiver<bool>,
}

impl<T: Transport> AgentSession<T> {
    pub fn new(agent_id: AgentId, transport: T) -> Self {
        Self::with_config(agent_id, transport, SessionConfig::default())
    }

    pub fn with_config(agent_id: AgentId, transport: T, config: SessionConfig) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            agent_id,
            transport,
            config,
            state: SessionState::Idle,
            last_resolution: None,
            last_tick: None,
            owed_replies: 0,
            crash_reason: None,
            stats: SessionStats::default(),
            eviction_tx: Arc::new(tx),
            eviction_rx: rx,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// How the most recent `step` resolved (`Delivered`, `TimedOut`, ...).
    pub fn last_resolution(&self) -> Option<SessionState> {
        self.last_resolution
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_available(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn eviction_handle(&self) -> EvictionHandle {
        EvictionHandle {
            tx: Arc::clone(&self.eviction_tx),
        }
    }

    /// Remove the agent between steps. Also clears a step that was abandoned
    /// mid-wait (its future dropped).
    pub fn evict(&mut self) {
        if !self.state.is_terminal() {
            self.crash("evicted by host");
        }
    }

    /// Send one observation and obtain one action.
    ///
    /// Recoverable failures (malformed reply, unknown action, timeout) and a
    /// closed transport all yield `Ok` with the fallback action; inspect
    /// [`StepReport::warning`] / [`StepReport::is_fatal`]. `Err` means no
    /// action at all: the session was already unavailable, was evicted while
    /// waiting, or the call itself broke the contract.
    pub async fn step(&mut self, observation: &Observation) -> Result<StepReport, ProtocolError> {
        match self.state {
            SessionState::Crashed => return Err(self.unavailable()),
            SessionState::AwaitingResponse => return Err(ProtocolError::StepInFlight),
            _ => {}
        }
        if *self.eviction_rx.borrow() {
            self.crash("evicted by host");
            return Err(self.unavailable());
        }

        self.check(observation)?;
        let line = codec::encode_observation(observation)?;

        let tick = observation.tick;
        let timeout_ms = observation.timeout_ms;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        self.last_tick = Some(tick);
        self.stats.steps += 1;
        self.transition(SessionState::AwaitingResponse, tick);

        let mut phase = Phase::Sending;
        let mut eviction = self.eviction_rx.clone();
        let round_trip = exchange(
            &mut self.transport,
            &line,
            &mut phase,
            &mut self.owed_replies,
            &mut self.stats,
            &self.agent_id,
            tick,
        );
        let raced = tokio::select! {
            biased;
            _ = wait_evicted(&mut eviction) => None,
            res = timeout_at(deadline, round_trip) => Some(res),
        };

        let resolved = match raced {
            None => Exchange::Evicted,
            Some(Ok(exchanged)) => exchanged,
            Some(Err(_elapsed)) => Exchange::TimedOut(phase),
        };

        match resolved {
            Exchange::Line(reply) => {
                let decoded = self.decode_reply(&reply);
                Ok(self.resolve_reply(decoded, tick))
            }
            Exchange::Unreadable(reason) => Ok(self.resolve_reply(
                Err(ProtocolError::MalformedMessage(reason)),
                tick,
            )),
            Exchange::TimedOut(Phase::Receiving) => {
                self.owed_replies += 1;
                self.stats.timeouts += 1;
                self.stats.consecutive_timeouts += 1;
                warn!(
                    agent_id = %self.agent_id,
                    tick,
                    timeout_ms,
                    "no reply before deadline, substituting rest"
                );
                self.resolve(SessionState::TimedOut, tick);
                Ok(StepReport::fallback(ProtocolError::TimeoutExceeded { timeout_ms }))
            }
            Exchange::TimedOut(Phase::Sending) => {
                // a half-written observation leaves the stream unusable
                self.crash("agent stopped reading its input");
                Ok(StepReport::fallback(self.unavailable()))
            }
            Exchange::Closed(reason) => {
                self.crash(&reason);
                Ok(StepReport::fallback(self.unavailable()))
            }
            Exchange::Evicted => {
                self.crash("evicted by host");
                Err(self.unavailable())
            }
        }
    }

    fn check(&self, observation: &Observation) -> Result<(), ProtocolError> {
        observation
            .validate()
            .map_err(ProtocolError::InvalidObservation)?;

        if let Some(last) = self.last_tick
            && observation.tick < last
        {
            return Err(ProtocolError::InvalidObservation(format!(
                "tick {} after tick {last}",
                observation.tick
            )));
        }

        if !observation.agent_id.is_empty() && observation.agent_id != self.agent_id {
            return Err(ProtocolError::InvalidObservation(format!(
                "observation for {} sent to session of {}",
                observation.agent_id, self.agent_id
            )));
        }
        Ok(())
    }

    fn decode_reply(&self, reply: &str) -> Result<Action, ProtocolError> {
        if reply.len() > self.config.max_line_bytes {
            return Err(ProtocolError::MalformedMessage(format!(
                "reply of {} bytes exceeds {} byte limit",
                reply.len(),
                self.config.max_line_bytes
            )));
        }
        codec::decode_action(reply).map_err(ProtocolError::from)
    }

    fn resolve_reply(&mut self, decoded: Result<Action, ProtocolError>, tick: u64) -> StepReport {
        self.stats.consecutive_timeouts = 0;

        match decoded {
            Ok(action) => {
                self.stats.delivered += 1;
                debug!(agent_id = %self.agent_id, tick, %action, "action delivered");
                self.resolve(SessionState::Delivered, tick);
                StepReport::delivered(action)
            }
            Err(err) => {
                match &err {
                    ProtocolError::UnknownActionVariant(name) => {
                        self.stats.unknown_variants += 1;
                        warn!(
                            agent_id = %self.agent_id,
                            tick,
                            action = %name,
                            "agent chose an unsupported action, substituting rest"
                        );
                    }
                    other => {
                        self.stats.malformed += 1;
                        warn!(
                            agent_id = %self.agent_id,
                            tick,
                            error = %other,
                            "malformed reply, substituting rest"
                        );
                    }
                }
                self.resolve(SessionState::Malformed, tick);
                StepReport::fallback(err)
            }
        }
    }

    /// Pass through a resolution state back to `Idle`.
    fn resolve(&mut self, resolution: SessionState, tick: u64) {
        self.transition(resolution, tick);
        self.last_resolution = Some(resolution);
        self.transition(SessionState::Idle, tick);
    }

    fn crash(&mut self, reason: &str) {
        error!(agent_id = %self.agent_id, reason, "agent unavailable, must be evicted");
        self.crash_reason = Some(reason.to_string());
        self.last_resolution = Some(SessionState::Crashed);
        self.state = SessionState::Crashed;
    }

    fn unavailable(&self) -> ProtocolError {
        ProtocolError::AgentUnavailable(
            self.crash_reason
                .clone()
                .unwrap_or_else(|| "session closed".to_string()),
        )
    }

    fn transition(&mut self, to: SessionState, tick: u64) {
        debug!(agent_id = %self.agent_id, tick, from = ?self.state, to = ?to, "session transition");
        self.state = to;
    }
}

/// Write the observation, then read until a reply for this tick arrives.
///
/// Never yields `TimedOut` or `Evicted`; the caller races it for those.
async fn exchange<T: Transport>(
    transport: &mut T,
    line: &str,
    phase: &mut Phase,
    owed_replies: &mut u32,
    stats: &mut SessionStats,
    agent_id: &AgentId,
    tick: u64,
) -> Exchange {
    *phase = Phase::Sending;
    if let Err(e) = transport.send_line(line).await {
        return Exchange::Closed(format!("write failed: {e}"));
    }

    *phase = Phase::Receiving;
    loop {
        let reply = match transport.recv_line().await {
            Ok(Some(reply)) => Exchange::Line(reply),
            Ok(None) => return Exchange::Closed("agent closed its output".to_string()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Exchange::Unreadable(e.to_string()),
            Err(e) => return Exchange::Closed(format!("read failed: {e}")),
        };

        if *owed_replies == 0 {
            return reply;
        }
        *owed_replies -= 1;
        stats.late_replies_discarded += 1;
        warn!(%agent_id, tick, "discarding late reply to an earlier tick");
    }
}

/// Resolves once the eviction flag is set. Never resolves if every handle
/// and the session's own sender are gone.
async fn wait_evicted(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|evicted| *evicted).await.is_err() {
        std::future::pending::<()>().await;
    }
}
