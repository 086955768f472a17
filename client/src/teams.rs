use crate::Client;
use arena_types::social::{CreateTeam, Team, TeamInvite};
use reqwest::Method;

impl Client {
    /// Teams the user captains or belongs to.
    pub async fn teams(&self, user_id: &str) -> Vec<Team> {
        self.fetch_list("teams", self.endpoint(&["api", "teams", "user", user_id]))
            .await
    }

    pub async fn create_team(&self, name: &str) -> Option<Team> {
        self.create(
            "create_team",
            Method::POST,
            self.endpoint(&["api", "teams"]),
            CreateTeam::new(name).map_err(Into::into),
        )
        .await
    }

    pub async fn invite_to_team(&self, team_id: &str, user_id: &str) -> bool {
        let invite = TeamInvite {
            user_id: user_id.to_string(),
        };
        self.command(
            "invite_to_team",
            Method::POST,
            self.endpoint(&["api", "teams", team_id, "invite"]),
            Ok(Some(invite)),
        )
        .await
    }

    pub async fn leave_team(&self, team_id: &str) -> bool {
        self.command::<()>(
            "leave_team",
            Method::POST,
            self.endpoint(&["api", "teams", team_id, "leave"]),
            Ok(None),
        )
        .await
    }
}
