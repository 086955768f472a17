//! Round tracker: keeps a local view of the active prediction round and the
//! latest resolved result fresh by polling.
//!
//! Each tick fetches the current period and the latest result concurrently
//! and waits for both before the next tick may start. Outcomes are folded
//! into a [RoundView] by a [Reconciler], which drops any outcome older than
//! the last one applied. Views are published on a `watch` channel.

use crate::{
    client::{Auth, RetryPolicy},
    Client, Error, FailureKind, Result,
};
use arena_types::{Round, RoundResult};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// Default time between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Floor on the poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

const CURRENT_PERIOD_PATH: [&str; 4] = ["api", "game", "period", "current"];
const LATEST_RESULT_PATH: [&str; 4] = ["api", "game", "result", "latest"];

impl Client {
    /// Fetch the active round. `None` when no round is open.
    pub async fn current_round(&self) -> Result<Option<Round>> {
        self.current_round_with(&self.retry_policy).await
    }

    /// Fetch the most recently resolved result. `None` before the first one.
    pub async fn latest_result(&self) -> Result<Option<RoundResult>> {
        self.latest_result_with(&self.retry_policy).await
    }

    async fn current_round_with(&self, policy: &RetryPolicy) -> Result<Option<Round>> {
        self.get_json(self.endpoint(&CURRENT_PERIOD_PATH), Auth::Optional, policy)
            .await
    }

    async fn latest_result_with(&self, policy: &RetryPolicy) -> Result<Option<RoundResult>> {
        self.get_json(self.endpoint(&LATEST_RESULT_PATH), Auth::Optional, policy)
            .await
    }
}

/// Connectivity state of the tracker as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundStatus {
    /// A round is open.
    Active,
    /// The server answered but no round is open yet.
    NoActiveRound,
    /// The server could not be reached.
    Offline,
    /// The server did not answer in time.
    TimedOut,
    /// Any other failure, with its message.
    Error(String),
}

impl RoundStatus {
    fn from_error(err: &Error) -> Self {
        match err.failure_kind() {
            FailureKind::Offline => RoundStatus::Offline,
            FailureKind::TimedOut => RoundStatus::TimedOut,
            FailureKind::NotFound => RoundStatus::NoActiveRound,
            FailureKind::Fatal => RoundStatus::Error(err.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            RoundStatus::Offline | RoundStatus::TimedOut | RoundStatus::Error(_)
        )
    }
}

/// Consolidated view consumed by the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundView {
    pub current_round: Option<Round>,
    pub latest_result: Option<RoundResult>,
    /// True until the first tick has been applied.
    pub loading: bool,
    pub status: RoundStatus,
    /// Sequence number of the tick that produced this view (0 before any).
    pub tick: u64,
}

impl Default for RoundView {
    fn default() -> Self {
        Self {
            current_round: None,
            latest_result: None,
            loading: true,
            status: RoundStatus::NoActiveRound,
            tick: 0,
        }
    }
}

/// Both fetches of one tick.
#[derive(Debug)]
pub struct TickOutcome {
    pub tick: u64,
    pub period: Result<Option<Round>>,
    pub result: Result<Option<RoundResult>>,
}

/// What [Reconciler::apply] did with an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The outcome belongs to a superseded tick and was dropped.
    Stale,
    Unchanged,
    Updated,
}

/// Folds tick outcomes into a [RoundView].
///
/// A new period does not clear the previous result. A result is only taken
/// if it is not older (by period) than the one held, and a result for the
/// open period must not predate that round's start. Failed fetches keep the
/// last good data and only change the status; a 404 on the current period
/// clears the round.
#[derive(Debug, Default)]
pub struct Reconciler {
    view: RoundView,
    last_tick: Option<u64>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &RoundView {
        &self.view
    }

    pub fn apply(&mut self, outcome: TickOutcome) -> Applied {
        let TickOutcome {
            tick,
            period,
            result,
        } = outcome;
        if self.last_tick.is_some_and(|last| tick <= last) {
            debug!(tick, last_tick = ?self.last_tick, "dropping stale tick");
            return Applied::Stale;
        }
        self.last_tick = Some(tick);

        let mut next = self.view.clone();
        next.loading = false;
        next.tick = tick;

        // Only an open round lets a result failure degrade the status.
        let round_open = match period {
            Ok(Some(round)) => {
                let previous = next.current_round.as_ref().map(|r| r.period);
                if previous != Some(round.period) {
                    info!(
                        period = round.period,
                        previous = ?previous,
                        ends_at_ms = round.ends_at_ms,
                        "round opened"
                    );
                }
                next.current_round = Some(round);
                next.status = RoundStatus::Active;
                true
            }
            Ok(None) => {
                next.current_round = None;
                next.status = RoundStatus::NoActiveRound;
                false
            }
            Err(err) => {
                let status = RoundStatus::from_error(&err);
                if status == RoundStatus::NoActiveRound {
                    next.current_round = None;
                } else {
                    warn!(tick, error = %err, "failed to fetch current period");
                }
                next.status = status;
                false
            }
        };

        match result {
            Ok(Some(result)) => {
                if accepts(&next, &result) {
                    if next.latest_result.as_ref() != Some(&result) {
                        info!(
                            period = result.period,
                            color = result.color.as_str(),
                            multiplier = result.multiplier,
                            "round resolved"
                        );
                    }
                    next.latest_result = Some(result);
                } else {
                    debug!(period = result.period, "ignoring out-of-order result");
                }
            }
            Ok(None) => {}
            Err(err) => {
                let status = RoundStatus::from_error(&err);
                if status != RoundStatus::NoActiveRound {
                    warn!(tick, error = %err, "failed to fetch latest result");
                    if round_open {
                        next.status = status;
                    }
                }
            }
        }

        // Every applied tick moves `tick`, so compare without it.
        let changed = RoundView {
            tick: self.view.tick,
            ..next.clone()
        } != self.view;
        self.view = next;
        if changed {
            Applied::Updated
        } else {
            Applied::Unchanged
        }
    }
}

fn accepts(view: &RoundView, result: &RoundResult) -> bool {
    if let Some(held) = &view.latest_result {
        if result.period < held.period {
            return false;
        }
    }
    if let Some(round) = &view.current_round {
        if result.period == round.period && !result.resolves(round) {
            return false;
        }
    }
    true
}

/// Run one tick: fetch both endpoints concurrently.
pub async fn poll_once(client: &Client, policy: &RetryPolicy, tick: u64) -> TickOutcome {
    let (period, result) = tokio::join!(
        client.current_round_with(policy),
        client.latest_result_with(policy)
    );
    TickOutcome {
        tick,
        period,
        result,
    }
}

#[derive(Clone, Debug)]
pub struct RoundTrackerConfig {
    pub poll_interval: Duration,
    /// Retries inside one tick for transient failures.
    pub retry_policy: RetryPolicy,
}

impl Default for RoundTrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_policy: RetryPolicy::none(),
        }
    }
}

/// Handle to a running poll loop. Dropping it cancels the loop.
pub struct RoundTracker {
    receiver: watch::Receiver<RoundView>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RoundTracker {
    /// Start polling. The first tick fires immediately.
    pub fn spawn(client: Client, config: RoundTrackerConfig) -> Self {
        let (sender, receiver) = watch::channel(RoundView::default());
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run(client, config, sender, cancelled.clone()));
        Self {
            receiver,
            cancelled,
            handle: Some(handle),
        }
    }

    /// Snapshot of the latest published view.
    pub fn view(&self) -> RoundView {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RoundView> {
        self.receiver.clone()
    }

    /// Wait for the next published view. `None` once the tracker stopped.
    pub async fn changed(&mut self) -> Option<RoundView> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Cancel the poll loop. Once this returns the view never changes again.
    pub async fn stop(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

impl Drop for RoundTracker {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(
    client: Client,
    config: RoundTrackerConfig,
    sender: watch::Sender<RoundView>,
    cancelled: Arc<AtomicBool>,
) {
    let mut reconciler = Reconciler::new();
    let mut ticker = interval(config.poll_interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick: u64 = 0;

    info!(
        url = %client.base_url,
        poll_ms = config.poll_interval.as_millis() as u64,
        "round tracker online"
    );
    loop {
        ticker.tick().await;
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        tick += 1;
        let outcome = poll_once(&client, &config.retry_policy, tick).await;
        debug!(tick, "tick finished");
        if reconciler.apply(outcome) != Applied::Updated {
            continue;
        }

        let view = reconciler.view().clone();
        let published = sender.send_if_modified(|current| {
            if cancelled.load(Ordering::SeqCst) {
                return false;
            }
            *current = view;
            true
        });
        if !published {
            break;
        }
    }
    debug!(tick, "round tracker stopped");
}
