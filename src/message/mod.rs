//! Envelope and addressing model
//!
//! - `Address` - `(name, id)` endpoint identifier
//! - `Envelope` - `{header, content, reply}` wrapper with two-stage decoding
//! - `LifecycleEvent` - closed set of registration-stream events

pub mod envelope;
pub mod lifecycle;

pub use envelope::{strip_framing, Address, Envelope, Header, Reply, DATA_PREFIX};
pub use lifecycle::{AgentLifecycle, LifecycleEvent, AGENT_CREATED, AGENT_DELETED, STOP_ITERATION};
