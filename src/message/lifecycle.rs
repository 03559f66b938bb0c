//! Lifecycle events emitted on the registration stream

use serde::{Deserialize, Serialize};

use super::envelope::{Address, Envelope};

pub const AGENT_CREATED: &str = "AgentCreated";
pub const AGENT_DELETED: &str = "AgentDeleted";
pub const STOP_ITERATION: &str = "StopIteration";

/// Payload of `AgentCreated` / `AgentDeleted`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLifecycle {
    pub addr: Address,
}

/// Known lifecycle events, decoded header first and content second
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Broker created an agent of one of our registered types
    AgentCreated(AgentLifecycle),

    /// Broker deleted an agent instance
    AgentDeleted(AgentLifecycle),

    /// Any other header type; ignored by the runtime
    Other(String),
}

impl LifecycleEvent {
    /// Classify an envelope by `header.type`, decoding `content` only for known types
    pub fn from_envelope(envelope: &Envelope) -> serde_json::Result<Self> {
        let event = match envelope.kind() {
            AGENT_CREATED => LifecycleEvent::AgentCreated(envelope.decode_content()?),
            AGENT_DELETED => LifecycleEvent::AgentDeleted(envelope.decode_content()?),
            other => LifecycleEvent::Other(other.to_string()),
        };
        Ok(event)
    }

    /// Build the envelope the broker would send for this event
    pub fn to_envelope(&self) -> serde_json::Result<Envelope> {
        match self {
            LifecycleEvent::AgentCreated(payload) => {
                Envelope::new(AGENT_CREATED).with_content(payload)
            }
            LifecycleEvent::AgentDeleted(payload) => {
                Envelope::new(AGENT_DELETED).with_content(payload)
            }
            LifecycleEvent::Other(kind) => Ok(Envelope::new(kind.clone())),
        }
    }
}
