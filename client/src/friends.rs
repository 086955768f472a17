use crate::Client;
use arena_types::social::{Friend, FriendRequestBody};
use reqwest::Method;

impl Client {
    pub async fn friends(&self, user_id: &str) -> Vec<Friend> {
        self.fetch_list("friends", self.endpoint(&["api", "friends", "list", user_id]))
            .await
    }

    pub async fn send_friend_request(&self, from_user_id: &str, to_user_id: &str) -> bool {
        self.friend_action("send_friend_request", "request", from_user_id, to_user_id)
            .await
    }

    pub async fn accept_friend_request(&self, from_user_id: &str, to_user_id: &str) -> bool {
        self.friend_action("accept_friend_request", "accept", from_user_id, to_user_id)
            .await
    }

    pub async fn reject_friend_request(&self, from_user_id: &str, to_user_id: &str) -> bool {
        self.friend_action("reject_friend_request", "reject", from_user_id, to_user_id)
            .await
    }

    async fn friend_action(
        &self,
        operation: &'static str,
        action: &str,
        from_user_id: &str,
        to_user_id: &str,
    ) -> bool {
        let body = FriendRequestBody {
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
        };
        self.command(
            operation,
            Method::POST,
            self.endpoint(&["api", "friends", action]),
            Ok(Some(body)),
        )
        .await
    }
}
