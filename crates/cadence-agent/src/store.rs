//! Namespaced key/value store for auxiliary long-term memory
//!
//! The engine only defines the contract and an in-memory form; consumers are
//! external collaborators.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

/// Generic namespaced key/value storage
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<serde_json::Value>>;
    async fn put(&self, namespace: &[&str], key: &str, value: serde_json::Value) -> Result<()>;
    async fn delete(&self, namespace: &[&str], key: &str) -> Result<()>;
    /// All entries under a namespace, as (key, value) pairs in key order
    async fn search_by_prefix(&self, namespace: &[&str]) -> Result<Vec<(String, serde_json::Value)>>;
}

fn composite_key(namespace: &[&str], key: &str) -> String {
    if namespace.is_empty() {
        key.to_string()
    } else {
        format!("{}:{key}", namespace.join(":"))
    }
}

fn namespace_prefix(namespace: &[&str]) -> String {
    if namespace.is_empty() {
        String::new()
    } else {
        format!("{}:", namespace.join(":"))
    }
}

/// In-memory store backed by an ordered map
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, namespace: &[&str], key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.lock().get(&composite_key(namespace, key)).cloned())
    }

    async fn put(&self, namespace: &[&str], key: &str, value: serde_json::Value) -> Result<()> {
        self.entries
            .lock()
            .insert(composite_key(namespace, key), value);
        Ok(())
    }

    async fn delete(&self, namespace: &[&str], key: &str) -> Result<()> {
        self.entries.lock().remove(&composite_key(namespace, key));
        Ok(())
    }

    async fn search_by_prefix(
        &self,
        namespace: &[&str],
    ) -> Result<Vec<(String, serde_json::Value)>> {
        let prefix = namespace_prefix(namespace);
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k[prefix.len()..].to_string(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemoryStore::new();
        let ns = ["users", "u1", "memories"];

        store.put(&ns, "food", json!({"preference": "pizza"})).await.unwrap();
        let loaded = store.get(&ns, "food").await.unwrap().unwrap();
        assert_eq!(loaded["preference"], "pizza");

        store.delete(&ns, "food").await.unwrap();
        assert!(store.get(&ns, "food").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let store = InMemoryStore::new();
        store.put(&["a"], "k", json!(1)).await.unwrap();
        store.put(&["b"], "k", json!(2)).await.unwrap();

        assert_eq!(store.get(&["a"], "k").await.unwrap().unwrap(), json!(1));
        assert_eq!(store.get(&["b"], "k").await.unwrap().unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_search_by_prefix_strips_namespace() {
        let store = InMemoryStore::new();
        store.put(&["users", "u1"], "alpha", json!(1)).await.unwrap();
        store.put(&["users", "u1"], "beta", json!(2)).await.unwrap();
        store.put(&["users", "u2"], "gamma", json!(3)).await.unwrap();

        let entries = store.search_by_prefix(&["users", "u1"]).await.unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "beta"]);
    }
}
