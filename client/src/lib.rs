pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod events;
pub mod feed;
pub mod friends;
pub mod host;
pub mod results;
pub mod round;
pub mod teams;
pub mod wallet;

pub use auth::{AuthGate, AuthUser, IdentityProvider, Session, StaticToken};
pub use client::Client;
pub use client::RetryPolicy;
pub use config::ClientConfig;
pub use events::Stream;
pub use round::{RoundStatus, RoundTracker, RoundTrackerConfig, RoundView};
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid data: {0}")]
    InvalidData(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    Validation(#[from] arena_types::ValidationError),
    #[error("not authenticated")]
    Unauthenticated,
    #[error("bearer token is not a valid header value")]
    InvalidToken,
    #[error("identity provider error: {0}")]
    Identity(String),
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("dial timeout")]
    DialTimeout,
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failed call, for callers that need to tell
/// connectivity problems apart from "nothing there yet".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The server could not be reached at all.
    Offline,
    TimedOut,
    /// The requested resource does not exist (yet).
    NotFound,
    Fatal,
}

impl Error {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Reqwest(err) => {
                if err.is_timeout() {
                    FailureKind::TimedOut
                } else if err.is_connect() {
                    FailureKind::Offline
                } else {
                    err.status()
                        .map(status_failure_kind)
                        .unwrap_or(FailureKind::Fatal)
                }
            }
            Error::Tungstenite(tokio_tungstenite::tungstenite::Error::Io(_)) => FailureKind::Offline,
            Error::DialTimeout => FailureKind::TimedOut,
            Error::FailedWithBody { status, .. } => status_failure_kind(*status),
            _ => FailureKind::Fatal,
        }
    }
}

fn status_failure_kind(status: reqwest::StatusCode) -> FailureKind {
    match status {
        reqwest::StatusCode::NOT_FOUND => FailureKind::NotFound,
        reqwest::StatusCode::REQUEST_TIMEOUT | reqwest::StatusCode::GATEWAY_TIMEOUT => {
            FailureKind::TimedOut
        }
        _ => FailureKind::Fatal,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_url, serve_router, signed_in_client, TEST_USER};
    use arena_types::{social::ChatMessage, Round};
    use axum::{
        extract::State as AxumState,
        http::StatusCode as AxumStatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio::time::Duration;

    fn failed(status: reqwest::StatusCode) -> Error {
        Error::FailedWithBody {
            status,
            body: String::new(),
        }
    }

    fn round() -> Round {
        Round {
            period: 21,
            started_at_ms: 0,
            ends_at_ms: 60_000,
        }
    }

    fn retrying(retry_non_idempotent: bool) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            retry_non_idempotent,
        }
    }

    /// Router whose handler at `path` answers 503 for the first `failures` hits.
    fn flaky(path: &str, failures: usize, counter: Arc<AtomicUsize>, is_post: bool) -> Router {
        let handler = move |AxumState(counter): AxumState<Arc<AtomicUsize>>| async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt < failures {
                return AxumStatusCode::SERVICE_UNAVAILABLE.into_response();
            }
            if is_post {
                Json(ChatMessage {
                    id: "m-1".to_string(),
                    sender_id: TEST_USER.to_string(),
                    receiver_id: "friend-1".to_string(),
                    body: "gg".to_string(),
                    sent_at_ms: 1,
                    read: false,
                })
                .into_response()
            } else {
                Json(round()).into_response()
            }
        };
        let method = if is_post { post(handler) } else { get(handler) };
        Router::new().route(path, method).with_state(counter)
    }

    #[test]
    fn test_client_rejects_non_http_schemes() {
        for base in ["ftp://example.com", "ws://arena.test", "file:///tmp/arena"] {
            let err = Client::new(base).err().expect("scheme should be rejected");
            assert!(matches!(err, Error::InvalidScheme(_)), "{base}: {err:?}");
        }
        let err = Client::new("ftp://example.com").err().unwrap();
        assert_eq!(
            err.to_string(),
            "invalid URL scheme: ftp (expected http or https)"
        );

        for base in ["http://localhost:8080", "https://api.arena.test/v1"] {
            assert!(Client::new(base).is_ok(), "{base}");
        }
        assert!(matches!(Client::new("not a url"), Err(Error::Url(_))));
    }

    #[test]
    fn test_status_failure_kinds() {
        assert_eq!(
            failed(reqwest::StatusCode::NOT_FOUND).failure_kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            failed(reqwest::StatusCode::GATEWAY_TIMEOUT).failure_kind(),
            FailureKind::TimedOut
        );
        assert_eq!(
            failed(reqwest::StatusCode::INTERNAL_SERVER_ERROR).failure_kind(),
            FailureKind::Fatal
        );
        assert_eq!(Error::DialTimeout.failure_kind(), FailureKind::TimedOut);
        assert_eq!(Error::Unauthenticated.failure_kind(), FailureKind::Fatal);
    }

    #[tokio::test]
    async fn test_connection_refused_is_offline() {
        let client = Client::new(&closed_url().await).unwrap();
        let err = client.current_round().await.unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Offline);
    }

    #[tokio::test]
    async fn test_slow_server_is_timed_out() {
        let router = Router::new().route(
            "/api/game/period/current",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(round())
            }),
        );
        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url)
            .unwrap()
            .with_timeout(Duration::from_millis(50))
            .unwrap();

        let err = client.current_round().await.unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::TimedOut);

        handle.abort();
    }

    #[tokio::test]
    async fn test_round_fetch_retries_retryable_statuses() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = flaky("/api/game/period/current", 2, counter.clone(), false);
        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url)
            .unwrap()
            .with_retry_policy(retrying(false));

        assert_eq!(client.current_round().await.unwrap(), Some(round()));
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.abort();
    }

    #[tokio::test]
    async fn test_failed_fetch_reports_method_and_url() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = flaky("/api/game/period/current", usize::MAX, counter.clone(), false);
        let (base_url, handle) = serve_router(router).await;
        let client = Client::new(&base_url).unwrap();

        let err = client.current_round().await.unwrap_err();
        let (status, body) = match err {
            Error::FailedWithBody { status, body } => (status, body),
            other => panic!("expected FailedWithBody, got {other:?}"),
        };
        assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("GET"));
        assert!(body.contains(client.endpoint(&["api", "game", "period", "current"]).as_str()));
        // The default policy makes a single attempt.
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_wallet_lookup_makes_single_attempt_by_default() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = flaky("/api/wallet/:user_id", usize::MAX, counter.clone(), false);
        let (base_url, handle) = serve_router(router).await;
        let client = signed_in_client(&base_url);

        assert_eq!(client.wallet(TEST_USER).await, None);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_send_message_not_retried_without_opt_in() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = flaky("/api/chats/send", 2, counter.clone(), true);
        let (base_url, handle) = serve_router(router).await;
        let client = signed_in_client(&base_url).with_retry_policy(retrying(false));

        assert_eq!(client.send_message("friend-1", "gg").await, None);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_send_message_retried_when_enabled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = flaky("/api/chats/send", 2, counter.clone(), true);
        let (base_url, handle) = serve_router(router).await;
        let client = signed_in_client(&base_url).with_retry_policy(retrying(true));

        let sent = client
            .send_message("friend-1", "gg")
            .await
            .expect("POST should succeed after retry");
        assert_eq!(sent.id, "m-1");
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.abort();
    }
}
