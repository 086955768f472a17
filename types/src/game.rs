use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch, the unit of every round
/// timestamp. Zero if the clock reads before the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Outcome color of a prediction round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Violet,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Violet => "violet",
        }
    }
}

/// One timed cycle of the prediction game. Rounds are created by the server;
/// clients only observe them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub period: u64,
    pub started_at_ms: u64,
    pub ends_at_ms: u64,
}

impl Round {
    /// Length of the betting window.
    pub fn duration_ms(&self) -> u64 {
        self.ends_at_ms.saturating_sub(self.started_at_ms)
    }

    /// Milliseconds left before the round closes, zero once it has.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.ends_at_ms.saturating_sub(now_ms)
    }

    pub fn contains(&self, ts_ms: u64) -> bool {
        self.started_at_ms <= ts_ms && ts_ms < self.ends_at_ms
    }
}

/// Resolved outcome of a completed round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub period: u64,
    pub color: Color,
    /// Payout multiplier in hundredths (`250` is 2.5x).
    pub multiplier: u32,
    pub number: u8,
    pub resolved_at_ms: u64,
}

impl RoundResult {
    /// A result resolves a round when it names the same period and was not
    /// produced before that round started.
    pub fn resolves(&self, round: &Round) -> bool {
        self.period == round.period && self.resolved_at_ms >= round.started_at_ms
    }
}
