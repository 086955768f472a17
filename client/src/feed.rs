//! War-room feed.

use crate::Client;
use arena_types::social::{FeedPost, NewPost};
use reqwest::Method;

impl Client {
    pub async fn war_room_feed(&self) -> Vec<FeedPost> {
        self.fetch_list("war_room_feed", self.endpoint(&["api", "warroom", "posts"]))
            .await
    }

    pub async fn publish_post(&self, body: &str) -> Option<FeedPost> {
        self.create(
            "publish_post",
            Method::POST,
            self.endpoint(&["api", "warroom", "posts"]),
            NewPost::new(body).map_err(Into::into),
        )
        .await
    }
}
