//! mutsim-agent - example agent process for the mutation simulator.
//!
//! Reads one observation per line on stdin and answers one action per line
//! on stdout. Logs go to stderr; stdout carries nothing but the protocol.
//!
//! Usage:
//!   mutsim-agent [--policy random|defensive] [--seed N] [--max-line-bytes N]
//!                [--log-level LEVEL]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mutsim_core::AgentLoop;
use mutsim_core::impls::{DEFAULT_MAX_LINE_BYTES, DefensivePolicy, RandomPolicy, random_policy};
use mutsim_core::ports::DecisionPolicy;
use tokio::io::{stdin, stdout};
use tracing::Level;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyKind {
    /// 30% attack / 10% replicate / rest, gated by energy
    Random,
    /// Threat-counting strategy
    Defensive,
}

#[derive(Parser, Debug)]
#[command(name = "mutsim-agent")]
#[command(about = "Example agent for the mutation simulator (JSON lines over stdio)")]
struct Args {
    /// Decision policy to run.
    #[arg(long, value_enum, default_value = "random")]
    policy: PolicyKind,

    /// Fixed seed for the random policy. Defaults to time and pid.
    #[arg(long)]
    seed: Option<u64>,

    /// Longer observation lines are answered with `rest` without parsing.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    max_line_bytes: usize,

    /// Log level for stderr output.
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

fn build_policy(kind: PolicyKind, seed: Option<u64>) -> Box<dyn DecisionPolicy> {
    match kind {
        PolicyKind::Random => {
            let seed = seed.unwrap_or_else(random_policy::process_seed);
            tracing::debug!(seed, "seeding random policy");
            Box::new(RandomPolicy::seeded(seed))
        }
        PolicyKind::Defensive => Box::new(DefensivePolicy::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(args.log_level)
        .init();

    let policy = build_policy(args.policy, args.seed);
    let mut agent = AgentLoop::new(policy).with_max_line_bytes(args.max_line_bytes);

    agent
        .run(stdin(), stdout())
        .await
        .context("agent stdio failed")?;

    Ok(())
}
