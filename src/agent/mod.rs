//! Agent contract and demo agents
//!
//! Implement [`Agent`] and register a factory with the runtime; the runtime
//! creates an instance per `AgentCreated` event and feeds it its own stream.

pub mod agent;
pub mod pong;

pub use agent::{addressed_factory, factory, publish_reply, Agent, AgentFactory, AgentReply};
pub use pong::{PartialPong, PongServer, StreamPongServer};
