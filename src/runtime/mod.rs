//! Agent runtime and lifecycle
//!
//! This module provides the infrastructure for running agents:
//! - `Runtime` - Registers agent types and reacts to lifecycle events
//! - `FactoryRegistry` - Agent factories keyed by type name
//! - `AgentInstance` - A created agent plus the stream feeding it
//!
//! Each registration and each agent instance has its own subscription task.
//! Messages are demultiplexed by the stream they arrive on.

pub mod handle;
pub mod registry;
pub mod runtime;

pub use handle::AgentInstance;
pub use registry::FactoryRegistry;
pub use runtime::Runtime;
