//! TickDriver - steps every agent session for one simulation tick.
//!
//! Sessions share nothing, so each one is moved into its own task for the
//! duration of the tick and handed back when it resolves. Crashed sessions
//! are not handed back: they leave the world's membership here.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::domain::{Action, AgentId, Observation};
use crate::error::ProtocolError;
use crate::observability::TickCounts;
use crate::ports::Transport;

use super::session::AgentSession;

/// Everything the simulator needs to apply one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    /// One action per stepped agent, fallbacks included.
    pub actions: BTreeMap<AgentId, Action>,
    /// Non-fatal conditions, for operator logs.
    pub warnings: Vec<(AgentId, ProtocolError)>,
    /// Agents whose session ended this tick. Remove them from the world.
    pub evicted: Vec<AgentId>,
    pub counts: TickCounts,
}

pub struct TickDriver<T> {
    sessions: HashMap<AgentId, AgentSession<T>>,
}

impl<T> Default for TickDriver<T> {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl<T: Transport + 'static> TickDriver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session, replacing (and returning) any session for the same agent.
    pub fn insert(&mut self, session: AgentSession<T>) -> Option<AgentSession<T>> {
        self.sessions.insert(session.agent_id().clone(), session)
    }

    pub fn remove(&mut self, agent_id: &AgentId) -> Option<AgentSession<T>> {
        self.sessions.remove(agent_id)
    }

    pub fn session(&self, agent_id: &AgentId) -> Option<&AgentSession<T>> {
        self.sessions.get(agent_id)
    }

    pub fn contains(&self, agent_id: &AgentId) -> bool {
        self.sessions.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.sessions.keys()
    }

    /// Step every agent that has an observation for `tick`, in parallel.
    ///
    /// Observations are routed by their `agent_id`. Agents without an
    /// observation are left alone this tick. A session whose task panics is
    /// lost; its agent gets the fallback action and is reported as evicted.
    pub async fn step_all(&mut self, tick: u64, observations: Vec<Observation>) -> TickReport {
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        let mut tasks = JoinSet::new();
        let mut in_flight = BTreeSet::new();

        for observation in observations {
            let agent_id = observation.agent_id.clone();
            if observation.tick != tick {
                report.warnings.push((
                    agent_id,
                    ProtocolError::InvalidObservation(format!(
                        "observation for tick {} in tick {tick}",
                        observation.tick
                    )),
                ));
                continue;
            }
            let Some(mut session) = self.sessions.remove(&agent_id) else {
                report.warnings.push((
                    agent_id,
                    ProtocolError::InvalidObservation("no session for agent".to_string()),
                ));
                continue;
            };

            in_flight.insert(agent_id);
            tasks.spawn(async move {
                let result = session.step(&observation).await;
                (session, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (session, result) = match joined {
                Ok(done) => done,
                Err(err) => {
                    error!(tick, error = %err, "session task failed, session lost");
                    continue;
                }
            };
            let agent_id = session.agent_id().clone();
            in_flight.remove(&agent_id);
            report.counts.stepped += 1;

            match result {
                Ok(step) => {
                    report.actions.insert(agent_id.clone(), step.action);
                    match step.warning() {
                        None => report.counts.delivered += 1,
                        Some(cause) => {
                            report.counts.fallbacks += 1;
                            report.warnings.push((agent_id.clone(), cause.clone()));
                        }
                    }
                }
                Err(err) => {
                    warn!(tick, %agent_id, error = %err, "step failed");
                    report.warnings.push((agent_id.clone(), err));
                }
            }

            if session.is_available() {
                self.sessions.insert(agent_id, session);
            } else {
                info!(tick, %agent_id, "agent evicted");
                report.counts.evicted += 1;
                report.evicted.push(agent_id);
            }
        }

        // whatever is still in flight never came back from its task
        for agent_id in in_flight {
            error!(tick, %agent_id, "agent evicted, its session was lost");
            report.counts.stepped += 1;
            report.counts.fallbacks += 1;
            report.counts.evicted += 1;
            report.actions.insert(agent_id.clone(), Action::FALLBACK);
            report.warnings.push((
                agent_id.clone(),
                ProtocolError::AgentUnavailable("session task failed".to_string()),
            ));
            report.evicted.push(agent_id);
        }

        report.evicted.sort();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AgentLoop;
    use crate::domain::{Direction, WorldSize};
    use crate::impls::PipeTransport;
    use crate::ports::DecisionPolicy;
    use async_trait::async_trait;
    use std::io;
    use tokio::io::{
        AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf, duplex,
        split,
    };

    type HostTransport = PipeTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    struct Fixed(Action);

    impl DecisionPolicy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn choose(&mut self, _observation: &Observation) -> Action {
            self.0
        }
    }

    fn id(s: &str) -> AgentId {
        AgentId::new(s).unwrap()
    }

    fn observation(agent: &str, tick: u64) -> Observation {
        let mut obs = Observation::new(tick, 10);
        obs.agent_id = id(agent);
        obs.world_size = WorldSize::new(4, 4);
        obs.timeout_ms = 500;
        obs
    }

    fn pipe() -> (HostTransport, DuplexStream) {
        let (host, agent_end) = duplex(4096);
        let (r, w) = split(host);
        (PipeTransport::new(r, w), agent_end)
    }

    /// Session wired to a real agent loop running `policy`.
    fn spawn_agent<P: DecisionPolicy + 'static>(name: &str, policy: P) -> AgentSession<HostTransport> {
        let (transport, agent_end) = pipe();
        let (r, w) = split(agent_end);
        tokio::spawn(async move {
            let _ = AgentLoop::new(policy).run(r, w).await;
        });
        AgentSession::new(id(name), transport)
    }

    /// Session wired to an agent that answers every line with `reply`.
    fn spawn_scripted(name: &str, reply: &'static str) -> AgentSession<HostTransport> {
        let (transport, agent_end) = pipe();
        let (r, mut w) = split(agent_end);
        tokio::spawn(async move {
            let mut lines = BufReader::new(r).lines();
            while let Ok(Some(_)) = lines.next_line().await {
                if w.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
        AgentSession::new(id(name), transport)
    }

    #[tokio::test]
    async fn steps_all_agents_and_evicts_the_dead() {
        let mut driver = TickDriver::new();
        driver.insert(spawn_agent("a", Fixed(Action::Replicate)));
        driver.insert(spawn_agent("b", Fixed(Action::attack(Direction::West))));
        let (transport, agent_end) = pipe();
        drop(agent_end);
        driver.insert(AgentSession::new(id("dead"), transport));

        let report = driver
            .step_all(
                1,
                vec![observation("a", 1), observation("b", 1), observation("dead", 1)],
            )
            .await;

        assert_eq!(report.actions[&id("a")], Action::Replicate);
        assert_eq!(report.actions[&id("b")], Action::attack(Direction::West));
        assert_eq!(report.actions[&id("dead")], Action::Rest);
        assert_eq!(report.evicted, vec![id("dead")]);
        assert_eq!(
            report.counts,
            TickCounts {
                stepped: 3,
                delivered: 2,
                fallbacks: 1,
                evicted: 1,
            }
        );
        assert_eq!(driver.len(), 2);
        assert!(!driver.contains(&id("dead")));

        let report = driver
            .step_all(2, vec![observation("a", 2), observation("b", 2)])
            .await;
        assert_eq!(report.counts.delivered, 2);
        assert!(report.evicted.is_empty());
    }

    #[tokio::test]
    async fn unsupported_action_does_not_stop_the_tick() {
        let mut driver = TickDriver::new();
        driver.insert(spawn_scripted("fleer", "{\"action\":\"flee\"}\n"));
        driver.insert(spawn_agent("ok", Fixed(Action::Replicate)));

        let report = driver
            .step_all(1, vec![observation("fleer", 1), observation("ok", 1)])
            .await;

        assert_eq!(report.actions[&id("fleer")], Action::Rest);
        assert_eq!(report.actions[&id("ok")], Action::Replicate);
        assert_eq!(
            report.warnings,
            vec![(id("fleer"), ProtocolError::UnknownActionVariant("flee".to_string()))]
        );
        assert!(report.evicted.is_empty());
        assert!(driver.contains(&id("fleer")));
    }

    /// Answers `rest`, or panics mid-read when `panics` is set.
    struct Flaky {
        panics: bool,
    }

    #[async_trait]
    impl Transport for Flaky {
        async fn send_line(&mut self, _line: &str) -> io::Result<()> {
            Ok(())
        }

        async fn recv_line(&mut self) -> io::Result<Option<String>> {
            if self.panics {
                panic!("transport bug");
            }
            Ok(Some("{\"action\":\"rest\"}".to_string()))
        }
    }

    #[tokio::test]
    async fn panicked_session_is_reported_as_evicted() {
        let mut driver = TickDriver::new();
        driver.insert(AgentSession::new(id("steady"), Flaky { panics: false }));
        driver.insert(AgentSession::new(id("broken"), Flaky { panics: true }));

        let report = driver
            .step_all(1, vec![observation("steady", 1), observation("broken", 1)])
            .await;

        assert_eq!(report.evicted, vec![id("broken")]);
        assert_eq!(report.actions[&id("broken")], Action::Rest);
        assert_eq!(report.actions[&id("steady")], Action::Rest);
        assert!(matches!(
            report.warnings.as_slice(),
            [(agent, ProtocolError::AgentUnavailable(_))] if *agent == id("broken")
        ));
        assert_eq!(
            report.counts,
            TickCounts {
                stepped: 2,
                delivered: 1,
                fallbacks: 1,
                evicted: 1,
            }
        );
        assert!(!driver.contains(&id("broken")));
        assert!(driver.contains(&id("steady")));
    }

    #[tokio::test]
    async fn misrouted_observations_are_reported() {
        let mut driver: TickDriver<HostTransport> = TickDriver::new();
        driver.insert(spawn_agent("a", Fixed(Action::Rest)));

        let report = driver
            .step_all(3, vec![observation("ghost", 3), observation("a", 2)])
            .await;

        assert!(report.actions.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(
            report
                .warnings
                .iter()
                .all(|(_, e)| matches!(e, ProtocolError::InvalidObservation(_)))
        );
        assert_eq!(driver.len(), 1);
    }

    #[tokio::test]
    async fn blank_line_mid_stream_ends_the_agent() {
        let (mut transport, agent_end) = pipe();
        let (r, w) = split(agent_end);
        let agent = tokio::spawn(async move {
            AgentLoop::new(Fixed(Action::Replicate))
                .run(r, w)
                .await
        });

        // a host bug writes a blank line; the agent takes it as end of input
        transport.send_line("\n").await.unwrap();
        let summary = agent.await.unwrap().unwrap();
        assert_eq!(summary.lines_read, 1);

        let mut session = AgentSession::new(id("a"), transport);
        let step = session.step(&observation("a", 1)).await.unwrap();
        assert!(step.is_fatal());
        assert!(matches!(step.warning(), Some(ProtocolError::AgentUnavailable(_))));
    }
}
