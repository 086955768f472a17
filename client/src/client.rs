use crate::{auth::Session, config::ClientConfig, Error, Result};
use rand::Rng;
use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a request is retried on transient failure.
///
/// Only idempotent methods are retried unless `retry_non_idempotent` is set.
/// Backoff doubles per attempt up to `max_backoff`, with half of each delay
/// randomized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub retry_non_idempotent: bool,
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            retry_non_idempotent: false,
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let base = self
            .initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);
        let half = base / 2;
        let jitter_ms = half.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    fn allows(&self, method: &Method) -> bool {
        self.retry_non_idempotent || method.is_idempotent()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Whether a request needs a signed-in user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Auth {
    Required,
    /// Attach a token if one is available, otherwise go anonymous.
    Optional,
}

/// Client for the arena REST API.
#[derive(Clone)]
pub struct Client {
    pub base_url: Url,
    pub(crate) http_client: reqwest::Client,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) session: Option<Arc<Session>>,
    pub(crate) quiet: bool,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        let http_client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            base_url,
            http_client,
            retry_policy: RetryPolicy::default(),
            session: None,
            quiet: false,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(&config.api_url)?
            .with_timeout(config.http_timeout)?
            .with_quiet(config.production))
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Suppress failure logging in the service wrappers (production mode).
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Build a URL below the base from raw path segments. Segments are
    /// percent-encoded, so ids may contain any character.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Resolve the bearer token for a request, if any.
    pub(crate) async fn bearer(&self, auth: Auth) -> Result<Option<String>> {
        let Some(session) = &self.session else {
            return match auth {
                Auth::Required => Err(Error::Unauthenticated),
                Auth::Optional => Ok(None),
            };
        };
        match session.bearer().await {
            Ok(token) => Ok(Some(token)),
            Err(Error::Unauthenticated) if auth == Auth::Optional => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<Response> {
        let mut request = self.http_client.request(method.clone(), url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Send a request under `policy`, returning the final response whatever
    /// its status.
    pub(crate) async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        auth: Auth,
        policy: &RetryPolicy,
    ) -> Result<Response> {
        let token = self.bearer(auth).await?;
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = self.send_once(&method, &url, body, token.as_deref()).await;
            let retryable = match &result {
                Ok(response) => is_retryable_status(response.status()),
                Err(Error::Reqwest(err)) => err.is_connect() || err.is_timeout(),
                Err(_) => false,
            };
            if !retryable || attempt >= attempts || !policy.allows(&method) {
                return result;
            }

            let delay = policy.backoff(attempt);
            match &result {
                Ok(response) => warn!(
                    %method,
                    %url,
                    attempt,
                    status = %response.status(),
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                ),
                Err(err) => warn!(
                    %method,
                    %url,
                    attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET a JSON document. A 404 means the resource does not exist and maps
    /// to `Ok(None)`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        auth: Auth,
        policy: &RetryPolicy,
    ) -> Result<Option<T>> {
        let response = self
            .execute::<()>(Method::GET, url.clone(), None, auth, policy)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(&Method::GET, &url, response).await?;
        let bytes = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Send a JSON body and decode the JSON reply.
    pub(crate) async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(
                method.clone(),
                url.clone(),
                Some(body),
                Auth::Required,
                &self.retry_policy,
            )
            .await?;
        let response = check_status(&method, &url, response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose reply body is ignored.
    pub(crate) async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<()> {
        let response = self
            .execute(
                method.clone(),
                url.clone(),
                body,
                Auth::Required,
                &self.retry_policy,
            )
            .await?;
        check_status(&method, &url, response).await?;
        Ok(())
    }

    /// Downgrade a failed call to `fallback`, logging unless quiet.
    pub(crate) fn or_default<T>(&self, operation: &'static str, result: Result<T>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                if !self.quiet {
                    warn!(
                        operation,
                        kind = ?err.failure_kind(),
                        error = %err,
                        "request failed, using fallback"
                    );
                }
                fallback
            }
        }
    }

    /// GET a single document, `None` on absence or failure.
    pub(crate) async fn fetch_one<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Option<T> {
        let result = self.get_json(url, Auth::Required, &self.retry_policy).await;
        self.or_default(operation, result, None)
    }

    /// GET a list, empty on absence or failure.
    pub(crate) async fn fetch_list<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Vec<T> {
        let result = self
            .get_json::<Vec<T>>(url, Auth::Required, &self.retry_policy)
            .await
            .map(Option::unwrap_or_default);
        self.or_default(operation, result, Vec::new())
    }

    /// Send a body and decode the created entity, `None` on failure.
    pub(crate) async fn create<B, T>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Result<B>,
    ) -> Option<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let result = match body {
            Ok(body) => self.send_json(method, url, &body).await.map(Some),
            Err(err) => Err(err),
        };
        self.or_default(operation, result, None)
    }

    /// Send a command, `true` when the server accepted it.
    pub(crate) async fn command<B: Serialize>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Result<Option<B>>,
    ) -> bool {
        let result = match body {
            Ok(body) => self.send_unit(method, url, body.as_ref()).await.map(|()| true),
            Err(err) => Err(err),
        };
        let accepted = self.or_default(operation, result, false);
        debug!(operation, accepted, "command finished");
        accepted
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

async fn check_status(method: &Method, url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(Error::FailedWithBody {
        status,
        body: format!("{method} {url}: {text}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = Client::new("http://localhost:8080/").unwrap();
        let url = client.endpoint(&["api", "host", "a b/c"]);
        assert_eq!(url.as_str(), "http://localhost:8080/api/host/a%20b%2Fc");

        let client = Client::new("https://arena.test/v2").unwrap();
        let url = client.endpoint(&["api", "chats"]);
        assert_eq!(url.as_str(), "https://arena.test/v2/api/chats");
    }

    #[test]
    fn test_backoff_is_bounded() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            retry_non_idempotent: false,
        };
        for attempt in 1..=5 {
            let delay = policy.backoff(attempt);
            assert!(delay <= Duration::from_millis(300), "{delay:?}");
        }
        let first = policy.backoff(1);
        assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));
        assert_eq!(RetryPolicy::none().backoff(3), Duration::ZERO);
    }

    #[test]
    fn test_retry_only_idempotent_by_default() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(&Method::GET));
        assert!(!policy.allows(&Method::POST));
        assert!(!policy.allows(&Method::PATCH));
    }

    #[tokio::test]
    async fn test_required_auth_without_session() {
        let client = Client::new("http://localhost:1").unwrap();
        assert!(matches!(
            client.bearer(Auth::Required).await,
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(client.bearer(Auth::Optional).await, Ok(None)));
    }
}
