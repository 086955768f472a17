//! Round watcher - polls the current round and latest result and logs every change.
//!
//! Usage:
//!   cargo run --release --bin round-watch -- --url <API_URL>
//!
//! Options:
//!   -u, --url          API base URL (or ARENA_API_URL with the rest of the client env)
//!   -p, --poll-ms      Poll interval in milliseconds (default: ARENA_POLL_MS, else 3000)
//!   -t, --token        Bearer token to send with each request
//!       --retries      Attempts per fetch for transient failures (default: 1)

use anyhow::{Context, Result};
use arena_client::{
    round::DEFAULT_POLL_INTERVAL, Client, ClientConfig, RetryPolicy, RoundStatus, RoundTracker,
    RoundTrackerConfig, Session, StaticToken,
};
use arena_types::game::now_ms;
use clap::Parser;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Watch the prediction round feed")]
struct Args {
    #[arg(short, long)]
    url: Option<String>,

    #[arg(short, long)]
    poll_ms: Option<u64>,

    #[arg(short, long)]
    token: Option<String>,

    #[arg(long, default_value = "1")]
    retries: usize,
}

/// Build the client and pick the poll interval. `--poll-ms` wins over the
/// environment's `ARENA_POLL_MS`.
fn build_client(args: &Args) -> Result<(Client, Duration)> {
    let (client, env_poll) = match &args.url {
        Some(url) => (Client::new(url).context("Invalid API URL")?, None),
        None => {
            let config = ClientConfig::from_env().context("Failed to read client environment")?;
            info!(auth = ?config.auth, production = config.production, "loaded client environment");
            let client = Client::from_config(&config).context("Invalid client configuration")?;
            (client, Some(config.poll_interval))
        }
    };
    let poll_interval = args
        .poll_ms
        .map(Duration::from_millis)
        .or(env_poll)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    let client = match &args.token {
        Some(token) => client.with_session(Arc::new(Session::new(StaticToken::signed_in(
            "round-watch",
            token.clone(),
        )))),
        None => client,
    };
    Ok((client, poll_interval))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let (client, poll_interval) = build_client(&args)?;
    info!(poll_ms = poll_interval.as_millis() as u64, "starting round tracker");
    let config = RoundTrackerConfig {
        poll_interval,
        retry_policy: RetryPolicy {
            max_attempts: args.retries.max(1),
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        },
    };

    let mut tracker = RoundTracker::spawn(client, config);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            view = tracker.changed() => {
                let Some(view) = view else {
                    warn!("round tracker stopped");
                    break;
                };
                let now = now_ms();
                match &view.status {
                    RoundStatus::Active => info!(
                        tick = view.tick,
                        period = view.current_round.as_ref().map(|r| r.period),
                        remaining_ms = view.current_round.as_ref().map(|r| r.remaining_ms(now)),
                        last_color = view.latest_result.as_ref().map(|r| r.color.as_str()),
                        "round active"
                    ),
                    RoundStatus::NoActiveRound => info!(tick = view.tick, "waiting for next round"),
                    status => warn!(tick = view.tick, ?status, "round feed degraded"),
                }
            }
        }
    }

    tracker.stop().await;
    Ok(())
}
