//! Channel - the only code that speaks HTTP to the broker
//!
//! Outbound messages are single `POST`s; inbound messages arrive as
//! newline-framed server-push streams read until the broker closes them.

use std::future::Future;

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::config::RuntimeConfig;
use crate::core::{TransportError, TransportResult};
use crate::message::Address;

use super::subscription::{inbound_line, SubscriptionHandle, SubscriptionState, SubscriptionTracker};
use super::PUBLISH_PATH;

#[derive(Serialize)]
struct PublishRequest<'a, T: Serialize> {
    addr: &'a Address,
    msg: &'a T,
}

/// Client side of the broker's publish/subscribe endpoints
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Clone)]
pub struct Channel {
    server: String,
    auth: Option<String>,
    client: reqwest::Client,
}

impl Channel {
    /// Create a channel for `server` with an optional bearer token
    pub fn new(server: impl Into<String>, auth: Option<String>) -> Self {
        let server: String = server.into();
        Self {
            server: server.trim_end_matches('/').to_string(),
            auth: auth.filter(|token| !token.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Create a channel from a runtime configuration
    pub fn from_config(config: &RuntimeConfig) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;

        tracing::info!(server = %config.base_url(), auth = config.auth.is_some(), "[Channel] Created");

        Ok(Self {
            server: config.base_url().to_string(),
            auth: config.auth.clone(),
            client,
        })
    }

    /// Broker base URL
    pub fn server(&self) -> &str {
        &self.server
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.server, path)
        } else {
            format!("{}/{}", self.server, path)
        }
    }

    fn post(&self, path: &str, body: Vec<u8>) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.auth {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Publish `msg` to `addr`
    ///
    /// A single delivery attempt. Succeeds only on 200 or 204.
    pub async fn publish<T: Serialize>(&self, addr: &Address, msg: &T) -> TransportResult<()> {
        let body = serde_json::to_vec(&PublishRequest { addr, msg })?;

        let response = self.post(PUBLISH_PATH, body).send().await.map_err(|e| {
            tracing::error!(addr = %addr, error = %e, "[Channel.publish] Failed to post message");
            e
        })?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            tracing::warn!(addr = %addr, status = %status, "[Channel.publish] Broker rejected message");
            return Err(TransportError::Status(status));
        }

        tracing::debug!(addr = %addr, status = %status, "[Channel.publish] Published");
        Ok(())
    }

    /// Open a stream on `path` and feed every inbound line to `on_line`
    ///
    /// Runs until the broker closes the stream or a read error occurs. Failures
    /// are logged, never returned. Cancelling the subscription also abandons
    /// the `on_line` call in flight. Callers that must not block should use
    /// [`Channel::spawn_subscription`].
    pub async fn subscribe<B, F, Fut>(&self, path: &str, body: &B, on_line: F)
    where
        B: Serialize + ?Sized,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let (_handle, tracker) = SubscriptionHandle::new(path);
        let body = serde_json::to_vec(body).map_err(TransportError::from);
        self.run_subscription(path, body, on_line, tracker).await;
    }

    /// Run [`Channel::subscribe`] on its own task and return a handle to it
    pub fn spawn_subscription<B, F, Fut>(&self, path: &str, body: &B, on_line: F) -> SubscriptionHandle
    where
        B: Serialize + ?Sized,
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (handle, tracker) = SubscriptionHandle::new(path);
        let body = serde_json::to_vec(body).map_err(TransportError::from);
        let channel = self.clone();
        let path = path.to_string();

        tokio::spawn(async move {
            channel.run_subscription(&path, body, on_line, tracker).await;
        });

        handle
    }

    async fn run_subscription<F, Fut>(
        &self,
        path: &str,
        body: TransportResult<Vec<u8>>,
        mut on_line: F,
        tracker: SubscriptionTracker,
    ) where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "[Channel.subscribe] Failed to serialize body");
                return;
            }
        };
        tracing::info!(path = %path, body = %String::from_utf8_lossy(&body), "[Channel.subscribe] Opening stream");

        let request = self.post(path, body);
        let response = tokio::select! {
            _ = tracker.cancelled() => {
                tracing::debug!(path = %path, "[Channel.subscribe] Cancelled while connecting");
                return;
            }
            response = request.send() => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "[Channel.subscribe] Failed to send request");
                return;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!(path = %path, status = %status, "[Channel.subscribe] Unexpected status code");
            return;
        }

        tracker.set(SubscriptionState::Streaming);

        let byte_stream = response
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));
        let mut reader = tokio::io::BufReader::new(StreamReader::new(byte_stream));
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = tokio::select! {
                _ = tracker.cancelled() => {
                    tracing::debug!(path = %path, "[Channel.subscribe] Cancelled");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    tracing::info!(path = %path, "[Channel.subscribe] Stream closed by broker");
                    break;
                }
                Ok(_) => {
                    // Invalid UTF-8 is replaced and left for the decoder to reject
                    let raw = String::from_utf8_lossy(&buf);
                    let Some(line) = inbound_line(raw.trim_end_matches(['\n', '\r'])) else {
                        continue;
                    };
                    tracing::debug!(path = %path, line = %line, "[Channel.subscribe] Received line");

                    tokio::select! {
                        _ = tracker.cancelled() => {
                            tracing::debug!(path = %path, "[Channel.subscribe] Cancelled while handling line");
                            break;
                        }
                        _ = on_line(line.to_string()) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(path = %path, error = %e, "[Channel.subscribe] Error reading stream");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("server", &self.server)
            .field("auth", &self.auth.as_ref().map(|_| "***"))
            .finish()
    }
}
