//! Ping/pong demo agents used by the `cos-agent` binary

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::message::Envelope;

use super::agent::{Agent, AgentReply};

pub const PING: &str = "Ping";
pub const PONG: &str = "Pong";
pub const PARTIAL_PONG: &str = "PartialPong";

const WORDS: [&str; 7] = ["Hi ", "there, ", "this ", "is ", "the ", "Pong ", "server."];

/// Replies `Pong` to every message
#[derive(Debug, Default, Clone)]
pub struct PongServer;

#[async_trait]
impl Agent for PongServer {
    async fn handle(&self, _envelope: &Envelope) -> AgentReply {
        AgentReply::Message(json!({"header": {"type": PONG}}))
    }
}

/// Content of one `PartialPong` chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialPong {
    pub content: String,
}

/// Answers `Ping` with a word-by-word stream of `PartialPong` chunks
#[derive(Debug, Clone)]
pub struct StreamPongServer {
    delay: Duration,
}

impl StreamPongServer {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(600),
        }
    }

    /// Pause between chunks
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for StreamPongServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for StreamPongServer {
    async fn handle(&self, envelope: &Envelope) -> AgentReply {
        if envelope.kind() != PING {
            return AgentReply::NoReply;
        }

        let delay = self.delay;
        let chunks = async_stream::stream! {
            for word in WORDS {
                tokio::time::sleep(delay).await;
                let chunk = PartialPong { content: word.to_string() };
                match Envelope::new(PARTIAL_PONG).with_content(&chunk).and_then(|e| serde_json::to_value(&e)) {
                    Ok(value) => yield value,
                    Err(e) => {
                        tracing::error!(error = %e, "[StreamPongServer] Failed to encode chunk");
                        break;
                    }
                }
            }
        };
        AgentReply::Stream(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pong_server() {
        let reply = PongServer.handle(&Envelope::new(PING)).await;
        assert!(matches!(reply, AgentReply::Message(v) if v == json!({"header": {"type": "Pong"}})));
    }

    #[tokio::test]
    async fn test_stream_pong_words() {
        let agent = StreamPongServer::new().with_delay(Duration::ZERO);
        let AgentReply::Stream(stream) = agent.handle(&Envelope::new(PING)).await else {
            panic!("expected a stream reply");
        };

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks.len(), WORDS.len());

        let first: Envelope = serde_json::from_value(chunks[0].clone()).unwrap();
        assert_eq!(first.kind(), PARTIAL_PONG);
        let word: PartialPong = first.decode_content().unwrap();
        assert_eq!(word.content, "Hi ");

        let sentence: String = chunks
            .iter()
            .map(|c| {
                let e: Envelope = serde_json::from_value(c.clone()).unwrap();
                e.decode_content::<PartialPong>().unwrap().content
            })
            .collect();
        assert_eq!(sentence, "Hi there, this is the Pong server.");
    }

    #[tokio::test]
    async fn test_stream_pong_ignores_other_types() {
        let agent = StreamPongServer::new();
        let reply = agent.handle(&Envelope::new("Hello")).await;
        assert!(matches!(reply, AgentReply::NoReply));
    }
}
