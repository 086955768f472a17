//! Data model shared by every arena client.
//!
//! All types mirror the JSON documents served by the arena REST API, which
//! uses `camelCase` field names throughout.

pub mod api;
pub mod game;
pub mod social;
pub mod tournament;
pub mod wallet;

pub use api::LiveEvent;
pub use game::{Color, Round, RoundResult};

use thiserror::Error;

/// Maximum length (in characters) of a chat message or war-room post.
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// Errors raised when constructing a request body that the API would reject.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message body is empty")]
    EmptyBody,
    #[error("message body too long: {got} characters (max {max})")]
    BodyTooLong { max: usize, got: usize },
    #[error("rating out of range: {0} (expected 1..=5)")]
    RatingOutOfRange(u8),
    #[error("team name is empty")]
    EmptyTeamName,
    #[error("result upload has no placements")]
    NoPlacements,
    #[error("duplicate rank in result upload: {0}")]
    DuplicateRank(u32),
}

/// Trim a user supplied body and check it against [MAX_MESSAGE_LEN].
pub(crate) fn validate_body(body: &str) -> Result<String, ValidationError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    let got = trimmed.chars().count();
    if got > MAX_MESSAGE_LEN {
        return Err(ValidationError::BodyTooLong {
            max: MAX_MESSAGE_LEN,
            got,
        });
    }
    Ok(trimmed.to_string())
}
