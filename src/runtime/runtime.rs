//! Runtime - agent registration and lifecycle
//!
//! The `Runtime` is responsible for:
//! - Registering agent factories by type name with the broker
//! - Dispatching lifecycle events from each registration stream
//! - Creating agent instances and wiring each to its own inbound stream
//! - Tearing instances down on `AgentDeleted` or shutdown

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::agent::{factory, Agent, AgentFactory};
use crate::channel::{Channel, SubscriptionHandle, REGISTER_PATH, SUBSCRIBE_PATH};
use crate::config::RuntimeConfig;
use crate::core::{RuntimeError, RuntimeResult};
use crate::message::{Address, AgentLifecycle, Envelope, LifecycleEvent};

use super::handle::AgentInstance;
use super::registry::FactoryRegistry;

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    addr: &'a Address,
}

/// Client-side agent runtime
///
/// Clones share the same channel, registry and instances, so a clone can be
/// moved into subscription tasks.
#[derive(Clone)]
pub struct Runtime {
    channel: Channel,
    factories: Arc<FactoryRegistry>,
    /// Registration stream per registered type name
    registrations: Arc<RwLock<HashMap<String, SubscriptionHandle>>>,
    /// Live instances keyed by address
    agents: Arc<RwLock<HashMap<Address, AgentInstance>>>,
    next_instance_id: Arc<AtomicU64>,
}

impl Runtime {
    /// Create a runtime talking to `server`
    pub fn new(server: impl Into<String>, auth: Option<String>) -> Self {
        Self::with_channel(Channel::new(server, auth))
    }

    /// Create a runtime from configuration
    pub fn from_config(config: &RuntimeConfig) -> RuntimeResult<Self> {
        Ok(Self::with_channel(Channel::from_config(config)?))
    }

    /// Create a runtime on top of an existing channel
    pub fn with_channel(channel: Channel) -> Self {
        Self {
            channel,
            factories: Arc::new(FactoryRegistry::new()),
            registrations: Arc::new(RwLock::new(HashMap::new())),
            agents: Arc::new(RwLock::new(HashMap::new())),
            next_instance_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Channel shared by the runtime and every agent it creates
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Register an agent type built by `constructor`
    ///
    /// # Example
    ///
    /// ```ignore
    /// let runtime = Runtime::new("http://127.0.0.1:8000", None);
    /// runtime.register("server", || PongServer, "The Pong Server.").await?;
    /// ```
    pub async fn register<F, A>(&self, name: &str, constructor: F, description: &str) -> RuntimeResult<()>
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Agent + 'static,
    {
        self.register_factory(name, factory(constructor), description)
            .await
    }

    /// Register `factory` under `name` and open its registration stream
    ///
    /// Fails with `DuplicateName`, without side effects, if `name` is taken.
    pub async fn register_factory(
        &self,
        name: &str,
        factory: AgentFactory,
        description: &str,
    ) -> RuntimeResult<()> {
        // Held across both inserts; deregister takes it before the factory lock
        let mut registrations = self.registrations.write().await;
        self.factories.insert(name, factory, description).await?;
        tracing::info!(name = %name, "[Runtime.register] Register agent success");

        let runtime = self.clone();
        let handle = self.channel.spawn_subscription(
            REGISTER_PATH,
            &RegisterRequest { name, description },
            move |line| {
                let runtime = runtime.clone();
                async move { runtime.handle(&line).await }
            },
        );

        if let Some(previous) = registrations.insert(name.to_string(), handle) {
            previous.cancel();
        }
        Ok(())
    }

    /// Forget `name` and close its registration stream
    ///
    /// Instances already created for this type keep running.
    pub async fn deregister(&self, name: &str) -> RuntimeResult<()> {
        let mut registrations = self.registrations.write().await;
        self.factories.remove(name).await?;

        if let Some(handle) = registrations.remove(name) {
            handle.cancel();
        }
        drop(registrations);

        tracing::info!(name = %name, "[Runtime.deregister] Agent deregistered");
        Ok(())
    }

    /// Dispatch one line from a registration stream
    ///
    /// Malformed lines and unknown event types are logged and dropped.
    pub async fn handle(&self, line: &str) {
        let envelope = match Envelope::decode_line(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = RuntimeError::Decode(e);
                tracing::error!(error = %err, line = %line, "[Runtime.handle] Error decoding message");
                return;
            }
        };

        let event = match LifecycleEvent::from_envelope(&envelope) {
            Ok(event) => event,
            Err(e) => {
                let err = RuntimeError::Decode(e);
                tracing::error!(
                    error = %err,
                    kind = %envelope.kind(),
                    content = %envelope.content,
                    "[Runtime.handle] Error decoding content"
                );
                return;
            }
        };
        tracing::info!(kind = %envelope.kind(), "[Runtime.handle] Received message");

        match event {
            LifecycleEvent::AgentCreated(payload) => {
                if let Err(e) = self.create_agent(payload).await {
                    tracing::error!(error = %e, "[Runtime.create_agent] Failed to create agent");
                }
            }
            LifecycleEvent::AgentDeleted(payload) => {
                self.delete_agent(payload).await;
            }
            LifecycleEvent::Other(kind) => {
                tracing::debug!(kind = %kind, "[Runtime.handle] Ignoring message");
            }
        }
    }

    /// Instantiate an agent for `payload.addr` and open its dedicated stream
    ///
    /// Fails with `MissingFactory` if the type is not registered. If a live
    /// instance already exists for the address it is returned unchanged.
    pub async fn create_agent(&self, payload: AgentLifecycle) -> RuntimeResult<AgentInstance> {
        let addr = payload.addr;
        let factory = self.factories.get(&addr.name).await?;

        let mut agents = self.agents.write().await;
        if let Some(existing) = agents.get(&addr) {
            if !existing.is_closed() {
                tracing::warn!(addr = %addr, "[Runtime.create_agent] Agent already running");
                return Ok(existing.clone());
            }
        }

        tracing::info!(addr = %addr, "[Runtime.create_agent] Creating agent");
        let agent = factory(&addr);
        let instance_id = self.next_instance_id.fetch_add(1, Ordering::Relaxed);

        let receiver = agent.clone();
        let channel = self.channel.clone();
        let subscription = self.channel.spawn_subscription(
            SUBSCRIBE_PATH,
            &SubscribeRequest { addr: &addr },
            move |line| {
                let agent = receiver.clone();
                let channel = channel.clone();
                async move { agent.receive(&channel, &line).await }
            },
        );

        let instance = AgentInstance::new(instance_id, addr.clone(), agent, subscription.clone());
        agents.insert(addr.clone(), instance.clone());
        drop(agents);

        // Drop the instance once its stream ends on its own
        let agents = self.agents.clone();
        tokio::spawn(async move {
            subscription.closed().await;
            let mut agents = agents.write().await;
            if agents
                .get(&addr)
                .is_some_and(|current| current.instance_id() == instance_id)
            {
                agents.remove(&addr);
                tracing::debug!(addr = %addr, "[Runtime.create_agent] Agent stream ended");
            }
        });

        Ok(instance)
    }

    /// Tear down the instance at `payload.addr`, cancelling its stream
    pub async fn delete_agent(&self, payload: AgentLifecycle) -> Option<AgentInstance> {
        let removed = self.agents.write().await.remove(&payload.addr);
        match &removed {
            Some(instance) => {
                instance.stop();
                tracing::info!(addr = %payload.addr, "[Runtime.delete_agent] Agent deleted");
            }
            None => {
                tracing::debug!(addr = %payload.addr, "[Runtime.delete_agent] No such agent");
            }
        }
        removed
    }

    /// Get a running instance
    pub async fn get(&self, addr: &Address) -> Option<AgentInstance> {
        self.agents.read().await.get(addr).cloned()
    }

    /// Check if an instance is running at `addr`
    pub async fn is_running(&self, addr: &Address) -> bool {
        self.agents.read().await.contains_key(addr)
    }

    /// Number of live instances
    pub async fn agent_count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Registered agent type names, sorted
    pub async fn registered_names(&self) -> Vec<String> {
        self.factories.names().await
    }

    /// Registration stream for `name`
    pub async fn registration(&self, name: &str) -> Option<SubscriptionHandle> {
        self.registrations.read().await.get(name).cloned()
    }

    /// Cancel every registration and instance stream
    pub async fn shutdown(&self) {
        let registrations: Vec<_> = self.registrations.write().await.drain().collect();
        for (name, handle) in registrations {
            tracing::debug!(name = %name, "[Runtime.shutdown] Closing registration");
            handle.cancel();
        }

        let agents: Vec<_> = self.agents.write().await.drain().collect();
        for (addr, instance) in agents {
            tracing::debug!(addr = %addr, "[Runtime.shutdown] Stopping agent");
            instance.stop();
        }

        tracing::info!("[Runtime.shutdown] Runtime stopped");
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("channel", &self.channel)
            .finish()
    }
}
