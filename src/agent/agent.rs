//! Agent trait - the contract every pluggable unit satisfies
//!
//! An agent computes a reply for each inbound envelope in [`Agent::handle`].
//! The provided [`Agent::receive`] does the framing, decoding and reply
//! routing around it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use crate::channel::Channel;
use crate::core::RuntimeError;
use crate::message::{Address, Envelope, STOP_ITERATION};

/// What an agent wants published back to the caller
pub enum AgentReply {
    /// Publish a single payload
    Message(Value),

    /// Publish every item in order, then a `StopIteration` marker
    Stream(BoxStream<'static, Value>),

    /// Publish nothing
    NoReply,
}

impl AgentReply {
    /// Single reply from any serializable payload
    pub fn message<T: Serialize>(payload: &T) -> serde_json::Result<Self> {
        Ok(AgentReply::Message(serde_json::to_value(payload)?))
    }
}

impl std::fmt::Debug for AgentReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentReply::Message(value) => f.debug_tuple("Message").field(value).finish(),
            AgentReply::Stream(_) => f.write_str("Stream(..)"),
            AgentReply::NoReply => f.write_str("NoReply"),
        }
    }
}

/// Constructor producing one agent instance for the address it will serve
pub type AgentFactory = Arc<dyn Fn(&Address) -> Arc<dyn Agent> + Send + Sync>;

/// Wrap a constructor closure as an [`AgentFactory`]
pub fn factory<F, A>(constructor: F) -> AgentFactory
where
    F: Fn() -> A + Send + Sync + 'static,
    A: Agent + 'static,
{
    Arc::new(move |_: &Address| Arc::new(constructor()) as Arc<dyn Agent>)
}

/// Wrap a constructor that needs the instance's own address
///
/// Agents that address their peers by session (same `id`, different `name`)
/// are built this way.
pub fn addressed_factory<F, A>(constructor: F) -> AgentFactory
where
    F: Fn(&Address) -> A + Send + Sync + 'static,
    A: Agent + 'static,
{
    Arc::new(move |addr: &Address| Arc::new(constructor(addr)) as Arc<dyn Agent>)
}

/// Trait for agents driven by the runtime
#[async_trait]
pub trait Agent: Send + Sync {
    /// Compute the reply for one inbound envelope
    async fn handle(&self, envelope: &Envelope) -> AgentReply;

    /// Process one raw line from this agent's inbound stream
    ///
    /// Malformed lines are logged and dropped. The reply is published only when
    /// the envelope carries a non-empty reply address; publish failures are
    /// logged and not retried.
    async fn receive(&self, channel: &Channel, line: &str) {
        let envelope = match Envelope::decode_line(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = RuntimeError::Decode(e);
                tracing::error!(error = %err, line = %line, "[Agent.receive] Dropping message");
                return;
            }
        };
        tracing::debug!(kind = %envelope.kind(), "[Agent.receive] Received message");

        let reply = self.handle(&envelope).await;

        let Some(addr) = envelope.reply_address() else {
            tracing::debug!(kind = %envelope.kind(), "[Agent.receive] No reply address");
            return;
        };

        publish_reply(channel, &addr, reply).await;
    }
}

/// Publish `reply` to `addr`
///
/// A stream stops at its first failed publish and the `StopIteration` marker
/// is not sent.
pub async fn publish_reply(channel: &Channel, addr: &Address, reply: AgentReply) {
    match reply {
        AgentReply::Message(payload) => {
            if let Err(e) = channel.publish(addr, &payload).await {
                tracing::error!(addr = %addr, error = %e, "[Agent.receive] Error publishing reply");
            }
        }
        AgentReply::Stream(mut items) => {
            let mut count = 0usize;
            while let Some(item) = items.next().await {
                if let Err(e) = channel.publish(addr, &item).await {
                    tracing::error!(addr = %addr, error = %e, chunk = count, "[Agent.receive] Error publishing partial reply");
                    return;
                }
                count += 1;
            }

            let stop = Envelope::new(STOP_ITERATION);
            if let Err(e) = channel.publish(addr, &stop).await {
                tracing::error!(addr = %addr, error = %e, "[Agent.receive] Error publishing StopIteration");
                return;
            }
            tracing::debug!(addr = %addr, chunks = count, "[Agent.receive] Stream reply complete");
        }
        AgentReply::NoReply => {
            tracing::debug!(addr = %addr, "[Agent.receive] Handler produced no reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct EchoAgent {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Agent for EchoAgent {
        async fn handle(&self, envelope: &Envelope) -> AgentReply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AgentReply::Message(json!({"header": {"type": "Echo"}, "content": envelope.content}))
        }
    }

    struct CountingStream;

    #[async_trait]
    impl Agent for CountingStream {
        async fn handle(&self, _envelope: &Envelope) -> AgentReply {
            AgentReply::Stream(futures::stream::iter(vec![json!({"n": 1}), json!({"n": 2})]).boxed())
        }
    }

    fn echo() -> (EchoAgent, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (EchoAgent { calls: calls.clone() }, calls)
    }

    #[tokio::test]
    async fn test_receive_publishes_to_reply_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/runtime/channel/publish"))
            .and(body_json(json!({
                "addr": {"name": "caller", "id": "9"},
                "msg": {"header": {"type": "Echo"}, "content": "{}"}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(server.uri(), None);
        let (agent, calls) = echo();
        agent
            .receive(
                &channel,
                r#"data: {"header":{"type":"Ping"},"content":"{}","reply":{"address":{"name":"caller","id":"9"}}}"#,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_receive_without_reply_does_not_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let channel = Channel::new(server.uri(), None);
        let (agent, calls) = echo();
        agent
            .receive(&channel, r#"data: {"header":{"type":"Ping"},"content":"{}"}"#)
            .await;
        agent
            .receive(&channel, r#"data: {"header":{"type":"Ping"},"content":"{}","reply":{}}"#)
            .await;
        agent
            .receive(
                &channel,
                r#"data: {"header":{"type":"Ping"},"content":"{}","reply":{"address":{}}}"#,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_receive_malformed_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let channel = Channel::new(server.uri(), None);
        let (agent, calls) = echo();
        agent.receive(&channel, "data: {\"header\":").await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_receive_publish_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/runtime/channel/publish"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(server.uri(), None);
        let (agent, _calls) = echo();
        agent
            .receive(
                &channel,
                r#"{"header":{"type":"Ping"},"reply":{"address":{"name":"caller","id":"9"}}}"#,
            )
            .await;
    }

    #[tokio::test]
    async fn test_stream_reply_ends_with_stop_iteration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/runtime/channel/publish"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let channel = Channel::new(server.uri(), None);
        CountingStream
            .receive(
                &channel,
                r#"{"header":{"type":"Ping"},"reply":{"address":{"name":"caller","id":"1"}}}"#,
            )
            .await;

        let bodies: Vec<Value> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["msg"].clone())
            .collect();
        assert_eq!(
            bodies,
            vec![
                json!({"n": 1}),
                json!({"n": 2}),
                json!({"header": {"type": "StopIteration"}}),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_stops_on_publish_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/runtime/channel/publish"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(server.uri(), None);
        publish_reply(
            &channel,
            &Address::new("caller", "1"),
            AgentReply::Stream(futures::stream::iter(vec![json!(1), json!(2)]).boxed()),
        )
        .await;
    }

    #[tokio::test]
    async fn test_factory_builds_fresh_instances() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let make = factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            CountingStream
        });

        let addr = Address::new("counter", "1");
        let _a = make(&addr);
        let _b = make(&addr);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_addressed_factory_sees_address() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let make = addressed_factory(move |addr: &Address| {
            sink.lock().unwrap().push(addr.clone());
            CountingStream
        });

        let _agent = make(&Address::new("triage", "s1"));
        assert_eq!(seen.lock().unwrap().as_slice(), &[Address::new("triage", "s1")]);
    }

    #[test]
    fn test_reply_message_helper() {
        let reply = AgentReply::message(&Envelope::new("Pong")).unwrap();
        assert!(matches!(reply, AgentReply::Message(v) if v == json!({"header": {"type": "Pong"}})));
    }
}
