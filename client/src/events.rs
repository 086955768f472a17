use crate::{client::Auth, Client, Error, Result};
use arena_types::LiveEvent;
use futures_util::{Stream as FutStream, StreamExt};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    WebSocketStream,
};
use tracing::{debug, error, info, trace, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// How long to wait for the websocket handshake.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Stream of JSON events from the WebSocket connection
pub struct Stream<T: DeserializeOwned + Send + 'static> {
    receiver: mpsc::Receiver<Result<T>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: DeserializeOwned + Send + 'static> Drop for Stream<T> {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

impl<T: DeserializeOwned + Send + 'static> Stream<T> {
    fn capacity_or_default(capacity: usize) -> usize {
        if capacity == 0 {
            DEFAULT_CHANNEL_CAPACITY
        } else {
            capacity
        }
    }

    fn decode(data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }

    fn spawn_reader<S>(ws: WebSocketStream<S>, tx: mpsc::Sender<Result<T>>) -> tokio::task::JoinHandle<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ws = ws;
            let message_type = std::any::type_name::<T>();
            while let Some(msg) = ws.next().await {
                let decoded = match msg {
                    Ok(Message::Text(text)) => Self::decode(text.as_bytes()),
                    Ok(Message::Binary(data)) => Self::decode(&data),
                    Ok(Message::Close(_)) => {
                        debug!("WebSocket closed");
                        let _ = tx.send(Err(Error::ConnectionClosed)).await;
                        break;
                    }
                    Ok(_) => continue, // Ignore ping/pong frames
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                };
                match &decoded {
                    Ok(_) => trace!(message_type, "received websocket message"),
                    Err(e) => warn!(message_type, error = %e, "failed to decode websocket message"),
                }
                if tx.send(decoded).await.is_err() {
                    break; // Receiver dropped
                }
            }
        })
    }

    pub(crate) fn new_with_capacity<S>(ws: WebSocketStream<S>, capacity: usize) -> Self
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let capacity = Self::capacity_or_default(capacity);
        let (tx, rx) = mpsc::channel(capacity);

        let handle = Self::spawn_reader(ws, tx);

        Self {
            receiver: rx,
            _handle: handle,
        }
    }

    /// Receive the next event from the stream
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.receiver.recv().await
    }
}

impl<T: DeserializeOwned + Send + 'static> FutStream for Stream<T> {
    type Item = Result<T>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Client {
    /// WebSocket URL of the live feed, derived from the base URL.
    pub fn live_url(&self) -> Result<url::Url> {
        let mut url = self.endpoint(&["api", "live"]);
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidScheme(url.scheme().to_string()))?;
        Ok(url)
    }

    /// Subscribe to chat messages, war-room posts and round events.
    pub async fn connect_live(&self) -> Result<Stream<LiveEvent>> {
        self.connect_live_with_capacity(DEFAULT_CHANNEL_CAPACITY).await
    }

    pub async fn connect_live_with_capacity(&self, capacity: usize) -> Result<Stream<LiveEvent>> {
        let url = self.live_url()?;
        let mut request = url.as_str().into_client_request()?;
        if let Some(token) = self.bearer(Auth::Optional).await? {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::InvalidToken)?;
            request.headers_mut().insert("Authorization", value);
        }

        let (ws, _) = tokio::time::timeout(DIAL_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| Error::DialTimeout)??;
        info!(%url, "connected to live feed");
        Ok(Stream::new_with_capacity(ws, capacity))
    }
}
