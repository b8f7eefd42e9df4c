use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AppResult;

use super::token_store::TokenStore;

/// Owns the in-memory bearer token shared by all outstanding and future
/// calls, with an optional durable store behind it.
///
/// `get` never touches the store: once the in-memory token is cleared, no
/// later call can resurrect a stale credential from disk. Loading from the
/// store happens only through an explicit `load` at startup.
pub struct TokenManager {
    token: RwLock<Option<String>>,
    store: Option<Arc<dyn TokenStore>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

impl TokenManager {
    pub fn new(store: Option<Arc<dyn TokenStore>>) -> Self {
        Self {
            token: RwLock::new(None),
            store,
        }
    }

    /// Manager with no durable backend; tokens live for the process only.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Snapshot of the current token.
    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replace the in-memory token without touching the store. Used for
    /// login candidates that must not be persisted until validated.
    pub async fn set_in_memory(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Replace the token in memory and in the durable store.
    pub async fn set(&self, token: Option<String>) -> AppResult<()> {
        *self.token.write().await = token.clone();
        if let Some(store) = &self.store {
            match token {
                Some(token) => store.save(&token).await?,
                None => store.clear().await?,
            }
        }
        Ok(())
    }

    /// Populate the in-memory token from the durable store, if any.
    pub async fn load(&self) -> AppResult<Option<String>> {
        if let Some(store) = &self.store {
            if let Some(stored) = store.load().await? {
                *self.token.write().await = Some(stored.clone());
                return Ok(Some(stored));
            }
        }
        Ok(self.get().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_store::MemoryStore;

    #[tokio::test]
    async fn test_set_persists_to_store() {
        let store = Arc::new(MemoryStore::default());
        let manager = TokenManager::new(Some(Arc::clone(&store) as Arc<dyn TokenStore>));

        manager.set(Some("tok".to_string())).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("tok".to_string()));

        manager.set(None).await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_in_memory_does_not_persist() {
        let store = Arc::new(MemoryStore::default());
        let manager = TokenManager::new(Some(Arc::clone(&store) as Arc<dyn TokenStore>));

        manager.set_in_memory(Some("candidate".to_string())).await;
        assert_eq!(manager.get().await, Some("candidate".to_string()));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cleared_token_is_not_resurrected_from_store() {
        let store = Arc::new(MemoryStore::default());
        store.save("persisted").await.unwrap();
        let manager = TokenManager::new(Some(Arc::clone(&store) as Arc<dyn TokenStore>));

        manager.load().await.unwrap();
        assert_eq!(manager.get().await, Some("persisted".to_string()));

        manager.set_in_memory(None).await;
        assert_eq!(manager.get().await, None, "get must not reload the store");
    }

    #[tokio::test]
    async fn test_fresh_manager_loads_from_store() {
        let store = Arc::new(MemoryStore::default());
        store.save("persisted").await.unwrap();

        let manager = TokenManager::new(Some(Arc::clone(&store) as Arc<dyn TokenStore>));
        assert_eq!(manager.get().await, None);
        assert_eq!(
            manager.load().await.unwrap(),
            Some("persisted".to_string())
        );
        assert_eq!(manager.get().await, Some("persisted".to_string()));
    }
}
