//! Named client registry.
//!
//! An explicit, injectable object rather than a process-wide singleton,
//! so tests and multi-tenant hosts can keep isolated instances.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::client::PreviewClient;

#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<String, Arc<PreviewClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Register a client under `name`, returning a previously registered
    /// one it replaced.
    pub fn insert(&self, name: impl Into<String>, client: Arc<PreviewClient>) -> Option<Arc<PreviewClient>> {
        let name = name.into();
        info!(%name, "preview client registered");
        self.clients.insert(name, client)
    }

    pub fn get(&self, name: &str) -> Option<Arc<PreviewClient>> {
        self.clients.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    /// Unregister and disconnect.
    pub async fn remove(&self, name: &str) -> Option<Arc<PreviewClient>> {
        let (_, client) = self.clients.remove(name)?;
        client.disconnect().await;
        info!(%name, "preview client removed");
        Some(client)
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
