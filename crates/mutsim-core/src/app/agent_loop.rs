//! AgentLoop - the agent process's side of the protocol.
//!
//! Read one observation line, ask the policy, write one action line, flush.
//! Repeat until the host closes our input.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::codec;
use crate::domain::{Action, LoopState};
use crate::error::CodecError;
use crate::impls::{DEFAULT_MAX_LINE_BYTES, LineReader};
use crate::ports::DecisionPolicy;

/// Written when even encoding the chosen action fails.
const FALLBACK_LINE: &str = "{\"action\":\"rest\"}\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub lines_read: u64,
    pub decided: u64,
    /// Lines that did not decode and were answered with `rest`.
    pub fallbacks: u64,
}

pub struct AgentLoop<P> {
    policy: P,
    state: LoopState,
    summary: LoopSummary,
    max_line_bytes: usize,
}

impl<P: DecisionPolicy> AgentLoop<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            state: LoopState::ReadingInput,
            summary: LoopSummary::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Observations longer than this are answered with `rest` unread.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Run until end of input.
    ///
    /// A blank line counts as end of input. Only I/O errors end the loop
    /// early; a line that does not decode, is too long or is not UTF-8 is
    /// answered with `rest`.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> io::Result<LoopSummary>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(policy = self.policy.name(), "agent loop started");
        let mut lines = LineReader::with_max_line_bytes(input, self.max_line_bytes);

        loop {
            self.state = LoopState::ReadingInput;
            let line = match lines.next_line().await {
                Ok(Some(line)) => Ok(line),
                Ok(None) => break,
                Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                    Err(CodecError::MalformedMessage(err.to_string()))
                }
                Err(err) => return Err(err),
            };
            self.summary.lines_read += 1;

            if line.as_ref().is_ok_and(|l| l.trim().is_empty()) {
                info!("blank input line, treating as end of input");
                break;
            }

            self.state = LoopState::Deciding;
            let action = match line.and_then(|l| codec::decode_observation(&l)) {
                Ok(observation) => {
                    self.summary.decided += 1;
                    let action = self.policy.choose(&observation);
                    debug!(tick = observation.tick, %action, "decided");
                    action
                }
                Err(err) => {
                    self.summary.fallbacks += 1;
                    warn!(error = %err, "undecodable observation, answering rest");
                    Action::FALLBACK
                }
            };

            self.state = LoopState::Writing;
            let reply = codec::encode_action(&action).unwrap_or_else(|err| {
                warn!(error = %err, "could not encode action, answering rest");
                FALLBACK_LINE.to_string()
            });
            output.write_all(reply.as_bytes()).await?;
            output.flush().await?;
        }

        self.state = LoopState::Finished;
        info!(
            lines_read = self.summary.lines_read,
            fallbacks = self.summary.fallbacks,
            "agent loop finished"
        );
        Ok(self.summary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Observation};
    use crate::impls::{DefensivePolicy, RandomPolicy};
    use rand::rngs::mock::StepRng;

    /// Policy that records what it saw and always replicates.
    #[derive(Default)]
    struct Recording {
        ticks: Vec<u64>,
    }

    impl DecisionPolicy for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn choose(&mut self, observation: &Observation) -> Action {
            self.ticks.push(observation.tick);
            Action::Replicate
        }
    }

    async fn run_lines<P: DecisionPolicy>(policy: P, input: &str) -> (AgentLoop<P>, String) {
        let mut agent = AgentLoop::new(policy);
        let mut output = Vec::new();
        agent.run(input.as_bytes(), &mut output).await.unwrap();
        (agent, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn attack_draw_emits_one_attack_line() {
        let policy = RandomPolicy::with_rng(StepRng::new(0, 0));
        let (_, output) = run_lines(policy, "{\"tick\":5,\"energy\":10}\n").await;

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        let action = codec::decode_action(lines[0]).unwrap();
        assert!(matches!(action, Action::Attack { target } if Direction::ALL.contains(&target)));
        assert_eq!(lines[0], r#"{"action":"attack","target":"north"}"#);
    }

    #[tokio::test]
    async fn low_energy_emits_rest() {
        let (_, output) = run_lines(RandomPolicy::seeded(9), "{\"tick\":1,\"energy\":2}\n").await;
        assert_eq!(output, "{\"action\":\"rest\"}\n");
    }

    #[tokio::test]
    async fn blank_line_ends_the_loop_silently() {
        let (agent, output) = run_lines(Recording::default(), "   \n{\"tick\":1,\"energy\":2}\n").await;
        assert_eq!(output, "");
        assert_eq!(agent.state(), LoopState::Finished);
        assert!(agent.policy().ticks.is_empty());
    }

    #[tokio::test]
    async fn empty_input_ends_cleanly() {
        let (agent, output) = run_lines(Recording::default(), "").await;
        assert_eq!(output, "");
        assert_eq!(agent.state(), LoopState::Finished);
    }

    #[tokio::test]
    async fn undecodable_lines_get_rest_and_the_loop_continues() {
        let input = "not json\n{\"energy\":3}\n{\"tick\":7,\"energy\":3}\n";
        let mut agent = AgentLoop::new(Recording::default());
        let mut output = Vec::new();
        let summary = agent.run(input.as_bytes(), &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            "{\"action\":\"rest\"}\n{\"action\":\"rest\"}\n{\"action\":\"replicate\"}\n"
        );
        assert_eq!(agent.policy().ticks, vec![7]);
        assert_eq!(
            summary,
            LoopSummary {
                lines_read: 3,
                decided: 1,
                fallbacks: 2,
            }
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_answered_not_fatal() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(b"{\"tick\":1,\"energy\":1}\n");
        let mut agent = AgentLoop::new(Recording::default());
        let mut output = Vec::new();
        agent.run(&input[..], &mut output).await.unwrap();

        assert_eq!(output.iter().filter(|b| **b == b'\n').count(), 2);
    }

    #[tokio::test]
    async fn over_long_observation_gets_rest_and_the_loop_continues() {
        let mut input = format!("{{\"tick\":1,\"energy\":1,\"pad\":\"{}\"}}\n", "x".repeat(200));
        input.push_str("{\"tick\":2,\"energy\":1}\n");
        let mut agent = AgentLoop::new(Recording::default()).with_max_line_bytes(64);
        let mut output = Vec::new();
        let summary = agent.run(input.as_bytes(), &mut output).await.unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "{\"action\":\"rest\"}\n{\"action\":\"replicate\"}\n"
        );
        assert_eq!(agent.policy().ticks, vec![2]);
        assert_eq!(summary.fallbacks, 1);
    }

    #[tokio::test]
    async fn last_line_without_newline_is_still_answered() {
        let (_, output) = run_lines(Recording::default(), "{\"tick\":1,\"energy\":1}").await;
        assert_eq!(output, "{\"action\":\"replicate\"}\n");
    }

    #[tokio::test]
    async fn policy_memory_persists_across_lines() {
        let input = "{\"tick\":1,\"energy\":6}\n{\"tick\":2,\"energy\":6}\n";
        let (agent, _) = run_lines(DefensivePolicy::new(), input).await;
        assert_eq!(agent.policy().memory().turns_played, 2);
    }
}
