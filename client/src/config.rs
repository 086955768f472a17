use crate::{Error, Result};
use std::time::Duration;
use tracing::warn;

pub const API_URL_ENV: &str = "ARENA_API_URL";
pub const AUTH_API_KEY_ENV: &str = "ARENA_AUTH_API_KEY";
pub const AUTH_PROJECT_ID_ENV: &str = "ARENA_AUTH_PROJECT_ID";
pub const ENVIRONMENT_ENV: &str = "ARENA_ENV";
pub const HTTP_TIMEOUT_ENV: &str = "ARENA_HTTP_TIMEOUT_MS";
pub const POLL_ENV: &str = "ARENA_POLL_MS";

/// Credentials handed to the identity provider SDK when the embedding app
/// builds its [crate::IdentityProvider]. The client itself never sends them.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub api_key: String,
    pub project_id: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth: AuthConfig,
    /// Production builds swallow service failures without logging them.
    pub production: bool,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Missing required keys are an
    /// error; malformed optional keys fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = require(&lookup, API_URL_ENV)?;
        let auth = AuthConfig {
            api_key: require(&lookup, AUTH_API_KEY_ENV)?,
            project_id: require(&lookup, AUTH_PROJECT_ID_ENV)?,
        };
        let production = lookup(ENVIRONMENT_ENV)
            .map(|raw| raw.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            api_url,
            auth,
            production,
            http_timeout: read_ms(&lookup, HTTP_TIMEOUT_ENV, 10_000),
            poll_interval: read_ms(&lookup, POLL_ENV, 3_000),
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(Error::MissingEnv(key)),
    }
}

fn read_ms(lookup: &impl Fn(&str) -> Option<String>, key: &str, fallback: u64) -> Duration {
    let ms = match lookup(key) {
        None => fallback,
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!(key, raw = %raw, fallback, "ignoring malformed duration");
            fallback
        }),
    };
    Duration::from_millis(ms)
}
