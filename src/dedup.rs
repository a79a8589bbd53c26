//! Notification dedup stores.
//!
//! A sighting id is marked seen only after every SMS for it has been sent.
//! [`InMemoryDedupStore`] lives as long as the dispatcher, so a restart makes
//! every id unseen again. Use [`crate::storage::SqliteDedupStore`] when ids
//! must survive restarts.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

/// Records which sighting ids were already notified.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn has_seen(&self, id: &str) -> anyhow::Result<bool>;
    async fn mark_seen(&self, id: &str) -> anyhow::Result<()>;
}

/// Process-local dedup set. The set only grows.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDedupStore {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn has_seen(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.inner.read().contains(id))
    }

    async fn mark_seen(&self, id: &str) -> anyhow::Result<()> {
        self.inner.write().insert(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unseen_until_marked() {
        let store = InMemoryDedupStore::new();
        assert!(!store.has_seen("s-1").await.unwrap());

        store.mark_seen("s-1").await.unwrap();
        assert!(store.has_seen("s-1").await.unwrap());
        assert!(!store.has_seen("s-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_marking_twice_is_idempotent() {
        let store = InMemoryDedupStore::new();
        store.mark_seen("s-1").await.unwrap();
        store.mark_seen("s-1").await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryDedupStore::new();
        let other = store.clone();
        store.mark_seen("s-1").await.unwrap();
        assert!(other.has_seen("s-1").await.unwrap());
    }
}
