//! Frames pushed over the live websocket.

use crate::{
    game::{Round, RoundResult},
    social::{ChatMessage, FeedPost},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum LiveEvent {
    ChatMessage(ChatMessage),
    FeedPost(FeedPost),
    RoundOpened(Round),
    RoundResolved(RoundResult),
}

impl LiveEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LiveEvent::ChatMessage(_) => "chatMessage",
            LiveEvent::FeedPost(_) => "feedPost",
            LiveEvent::RoundOpened(_) => "roundOpened",
            LiveEvent::RoundResolved(_) => "roundResolved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Color;

    #[test]
    fn test_live_event_tagging() {
        let raw = r#"{"type":"roundResolved","data":{"period":3,"color":"red","multiplier":200,"number":2,"resolvedAtMs":9}}"#;
        let event: LiveEvent = serde_json::from_str(raw).unwrap();
        let LiveEvent::RoundResolved(result) = &event else {
            panic!("expected round result, got {event:?}");
        };
        assert_eq!(result.color, Color::Red);
        assert_eq!(event.kind(), "roundResolved");
    }
}
