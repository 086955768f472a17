//! Hosts, tournaments, results and payouts.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Upcoming,
    Live,
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: String,
    pub host_id: String,
    pub title: String,
    pub game: String,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub starts_at_ms: u64,
    pub status: TournamentStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateHost {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RateHost {
    pub fn new(rating: u8, comment: Option<String>) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }
        Ok(Self { rating, comment })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateHost {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub rank: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kills: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultUpload {
    pub placements: Vec<Placement>,
}

impl ResultUpload {
    /// Build an upload, rejecting empty standings and repeated ranks.
    pub fn new(placements: Vec<Placement>) -> Result<Self, ValidationError> {
        if placements.is_empty() {
            return Err(ValidationError::NoPlacements);
        }
        let mut seen = HashSet::new();
        for placement in &placements {
            if !seen.insert(placement.rank) {
                return Err(ValidationError::DuplicateRank(placement.rank));
            }
        }
        Ok(Self { placements })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentResult {
    pub tournament_id: String,
    pub placements: Vec<Placement>,
    pub uploaded_at_ms: u64,
}

impl TournamentResult {
    pub fn winner(&self) -> Option<&Placement> {
        self.placements.iter().min_by_key(|p| p.rank)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Sent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: String,
    pub tournament_id: String,
    pub user_id: String,
    pub amount: i64,
    pub status: PayoutStatus,
}
