use crate::Client;
use arena_types::tournament::{ActivateHost, Host, RateHost, Tournament};
use reqwest::Method;

impl Client {
    pub async fn host(&self, host_id: &str) -> Option<Host> {
        self.fetch_one("host", self.endpoint(&["api", "host", host_id]))
            .await
    }

    pub async fn host_tournaments(&self, host_id: &str) -> Vec<Tournament> {
        self.fetch_list(
            "host_tournaments",
            self.endpoint(&["api", "host", host_id, "tournaments"]),
        )
        .await
    }

    /// Rate a host from 1 to 5. Out-of-range ratings are refused locally.
    pub async fn rate_host(&self, host_id: &str, rating: u8, comment: Option<String>) -> bool {
        let body = RateHost::new(rating, comment)
            .map(Some)
            .map_err(Into::into);
        self.command(
            "rate_host",
            Method::POST,
            self.endpoint(&["api", "host", host_id, "rate"]),
            body,
        )
        .await
    }

    /// Turn the user into a host. Returns the host profile.
    pub async fn activate_host(&self, request: ActivateHost) -> Option<Host> {
        self.create(
            "activate_host",
            Method::POST,
            self.endpoint(&["api", "host", "activate"]),
            Ok(request),
        )
        .await
    }
}
