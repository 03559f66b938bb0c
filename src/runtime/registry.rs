//! FactoryRegistry - agent types known to this runtime
//!
//! Maps an agent type name to the factory that builds its instances. All
//! access goes through one async lock so check-and-insert is atomic.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::agent::AgentFactory;
use crate::core::{RuntimeError, RuntimeResult};

struct FactoryEntry {
    factory: AgentFactory,
    description: String,
}

/// Registry of agent factories keyed by type name
#[derive(Default)]
pub struct FactoryRegistry {
    entries: RwLock<HashMap<String, FactoryEntry>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert `factory` under `name`
    ///
    /// Fails with `DuplicateName` and leaves the registry untouched if the
    /// name is taken.
    pub async fn insert(
        &self,
        name: &str,
        factory: AgentFactory,
        description: &str,
    ) -> RuntimeResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(name) {
            return Err(RuntimeError::DuplicateName(name.to_string()));
        }
        entries.insert(
            name.to_string(),
            FactoryEntry {
                factory,
                description: description.to_string(),
            },
        );
        Ok(())
    }

    /// Factory for `name`
    pub async fn get(&self, name: &str) -> RuntimeResult<AgentFactory> {
        let entries = self.entries.read().await;
        entries
            .get(name)
            .map(|entry| entry.factory.clone())
            .ok_or_else(|| RuntimeError::MissingFactory(name.to_string()))
    }

    /// Remove `name`, failing with `MissingFactory` if it was never registered
    pub async fn remove(&self, name: &str) -> RuntimeResult<()> {
        let mut entries = self.entries.write().await;
        entries
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::MissingFactory(name.to_string()))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    pub async fn description(&self, name: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(name).map(|entry| entry.description.clone())
    }

    /// Registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry").finish()
    }
}
