//! AgentInstance - a live agent and the stream that feeds it
//!
//! Created by the runtime on `AgentCreated`. Holding the subscription handle
//! next to the agent is what makes teardown possible.

use std::sync::Arc;

use crate::agent::Agent;
use crate::channel::{SubscriptionHandle, SubscriptionState};
use crate::message::Address;

/// Handle for one running agent instance
///
/// Cheap to clone; clones share the same subscription.
#[derive(Clone)]
pub struct AgentInstance {
    /// Runtime-local sequence number, distinguishes re-created instances
    instance_id: u64,

    /// Address the broker created this instance for
    addr: Address,

    agent: Arc<dyn Agent>,

    /// Dedicated inbound stream
    subscription: SubscriptionHandle,
}

impl AgentInstance {
    pub(crate) fn new(
        instance_id: u64,
        addr: Address,
        agent: Arc<dyn Agent>,
        subscription: SubscriptionHandle,
    ) -> Self {
        Self {
            instance_id,
            addr,
            agent,
            subscription,
        }
    }

    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn addr(&self) -> &Address {
        &self.addr
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn subscription(&self) -> &SubscriptionHandle {
        &self.subscription
    }

    /// State of the instance's inbound stream
    pub fn state(&self) -> SubscriptionState {
        self.subscription.state()
    }

    /// True once the inbound stream has closed; no more messages will arrive
    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Cancel the inbound stream
    pub fn stop(&self) {
        self.subscription.cancel();
    }
}

impl std::fmt::Debug for AgentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentInstance")
            .field("instance_id", &self.instance_id)
            .field("addr", &self.addr)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PongServer;

    #[tokio::test]
    async fn test_stop_cancels_subscription() {
        let (subscription, tracker) = SubscriptionHandle::new("/runtime/channel/subscribe");
        let instance = AgentInstance::new(
            1,
            Address::new("server", "1"),
            Arc::new(PongServer),
            subscription,
        );
        assert_eq!(instance.state(), SubscriptionState::Connecting);
        assert_eq!(instance.addr(), &Address::new("server", "1"));

        let task = tokio::spawn(async move {
            tracker.cancelled().await;
        });

        instance.clone().stop();
        task.await.unwrap();
        instance.subscription().closed().await;
        assert!(instance.is_closed());
    }
}
