//! Broker transport
//!
//! - `Channel` - publish to an address, subscribe to a line stream
//! - `SubscriptionHandle` - watch or cancel a running subscription
//!
//! Subscriptions are long-lived and block until the broker closes them, so
//! the runtime always runs them on their own task.

pub mod client;
pub mod subscription;

pub use client::Channel;
pub use subscription::{inbound_line, SubscriptionHandle, SubscriptionState};

/// Endpoint for one-shot message delivery
pub const PUBLISH_PATH: &str = "/runtime/channel/publish";

/// Endpoint streaming lifecycle events for a registered agent type
pub const REGISTER_PATH: &str = "/runtime/register";

/// Endpoint streaming messages addressed to one agent instance
pub const SUBSCRIBE_PATH: &str = "/runtime/channel/subscribe";
