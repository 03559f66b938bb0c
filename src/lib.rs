pub mod config;
pub mod core;
pub mod message;

// Broker transport
pub mod channel;

// Agent contract and demo agents
pub mod agent;

// Registration and lifecycle
pub mod runtime;

pub mod logging;

pub use agent::{addressed_factory, factory, Agent, AgentFactory, AgentReply};
pub use channel::{Channel, SubscriptionHandle, SubscriptionState};
pub use config::RuntimeConfig;
pub use crate::core::{RuntimeError, RuntimeResult, TransportError, TransportResult};
pub use message::{Address, Envelope, LifecycleEvent, Reply};
pub use runtime::{AgentInstance, Runtime};
