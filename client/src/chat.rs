use crate::Client;
use arena_types::social::{ChatMessage, ChatSummary, MarkRead, SendMessage};
use reqwest::Method;

impl Client {
    /// Conversation list of the signed-in user.
    pub async fn chats(&self) -> Vec<ChatSummary> {
        self.fetch_list("chats", self.endpoint(&["api", "chats"]))
            .await
    }

    /// Messages exchanged with one friend.
    pub async fn chat_messages(&self, friend_id: &str) -> Vec<ChatMessage> {
        self.fetch_list("chat_messages", self.endpoint(&["api", "chats", friend_id]))
            .await
    }

    /// Send a message. Returns the stored message, or `None` if the body was
    /// rejected locally or the call failed.
    pub async fn send_message(&self, receiver_id: &str, body: &str) -> Option<ChatMessage> {
        let request = SendMessage::new(receiver_id, body).map_err(Into::into);
        self.create(
            "send_message",
            Method::POST,
            self.endpoint(&["api", "chats", "send"]),
            request,
        )
        .await
    }

    pub async fn mark_read(&self, friend_id: &str) -> bool {
        let request = MarkRead {
            friend_id: friend_id.to_string(),
        };
        self.command(
            "mark_read",
            Method::POST,
            self.endpoint(&["api", "chats", "read"]),
            Ok(Some(request)),
        )
        .await
    }
}
