//! Line-oriented JSON front end for a Gold Rush session.
//!
//! Reads one request object per line on stdin and answers with one response
//! object per line on stdout. Logs go to stderr.
//!
//! ```text
//! {"op":"register","name":"Ada","emoji":"🦊"}
//! {"op":"walk","entityKey":"…","direction":"N"}
//! {"op":"leaderboard","adminToken":"secret"}
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use goldrush_rules::GameConfig;
use goldrush_server::{telemetry, transport, GameSession, JsonLinesSink, Sweeper};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "goldrush", about = "Run a Gold Rush game session over stdin/stdout")]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed overriding the configured one.
    #[arg(long)]
    seed: Option<u64>,

    /// Default log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(&args.log_level)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialize tracing")?;

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GameConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if config.admin_token.is_none() {
        tracing::warn!("no admin_token configured, privileged requests will be refused");
    }

    let mut session = GameSession::new(config.clone()).context("failed to start session")?;
    if let Some(path) = &config.audit_log {
        let sink = JsonLinesSink::open(path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        session = session.with_audit_sink(Arc::new(sink));
    }
    let session = Arc::new(session);
    let _sweeper = Sweeper::spawn(session.clone(), config.timing.sweep_interval())
        .context("failed to start sweeper")?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = transport::handle_line(&session, &line);
        writeln!(stdout, "{}", response).context("writing stdout")?;
        stdout.flush().context("flushing stdout")?;
    }

    Ok(())
}
