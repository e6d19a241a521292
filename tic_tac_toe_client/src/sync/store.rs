//! Shared property store seam.
//!
//! The store is a key/value map split into a `public` and a `protected`
//! scope. Reads are synchronous snapshot lookups; writes are upserts into the
//! public scope. Every write is announced to every subscriber, the writer
//! included.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::error::Result;

pub const CHANGE_CHANNEL_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub scope: Scope,
    pub property: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceState {
    #[serde(default)]
    pub public: HashMap<String, String>,
    #[serde(default)]
    pub protected: HashMap<String, String>,
}

impl SpaceState {
    /// Public value first, then protected. Empty strings count as unset.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let public = self.public.get(key).filter(|v| !v.is_empty());
        let protected = self.protected.get(key).filter(|v| !v.is_empty());
        public.or(protected).map(String::as_str)
    }

    pub fn scope_mut(&mut self, scope: Scope) -> &mut HashMap<String, String> {
        match scope {
            Scope::Public => &mut self.public,
            Scope::Protected => &mut self.protected,
        }
    }
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<PropertyChange>;
}

/// In-process store. Notifications are delivered through a broadcast channel
/// as soon as a value is written.
pub struct MemoryStore {
    state: RwLock<SpaceState>,
    tx: broadcast::Sender<PropertyChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        MemoryStore {
            state: RwLock::new(SpaceState::default()),
            tx,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scoped(&self, scope: Scope, key: &str, value: String) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .scope_mut(scope)
            .insert(key.to_string(), value);

        let _ = self.tx.send(PropertyChange {
            scope,
            property: key.to_string(),
        });
    }

    pub fn snapshot(&self) -> SpaceState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(key)
            .map(str::to_string)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.set_scoped(Scope::Public, key, value);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyChange> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_wins_over_protected() {
        let store = MemoryStore::new();
        store.set_scoped(Scope::Protected, "k", "protected".to_string());
        assert_eq!(store.get("k").as_deref(), Some("protected"));

        store.set_scoped(Scope::Public, "k", "public".to_string());
        assert_eq!(store.get("k").as_deref(), Some("public"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let store = MemoryStore::new();
        store.set_scoped(Scope::Public, "k", String::new());
        assert_eq!(store.get("k"), None);

        store.set_scoped(Scope::Protected, "k", "fallback".to_string());
        assert_eq!(store.get("k").as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn writer_receives_its_own_change() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.set("k", "v".to_string()).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            PropertyChange {
                scope: Scope::Public,
                property: "k".to_string()
            }
        );
        assert_eq!(store.snapshot().public.get("k").map(String::as_str), Some("v"));
    }
}
