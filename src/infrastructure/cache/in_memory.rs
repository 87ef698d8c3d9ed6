use crate::core::errors::DenError;
use crate::core::models::Member;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::cache::cache_keys::den_members_key;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryCache {
    cache: Arc<RwLock<HashMap<String, (Vec<Member>, DateTime<Utc>)>>>, // key -> (members, expires_at)
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_members(&self, den_id: &str) -> Result<Option<Vec<Member>>, DenError> {
        let key = den_members_key(den_id);
        let expired = {
            let cache = self.cache.read().await;
            match cache.get(&key) {
                Some((members, expires_at)) if *expires_at > Utc::now() => return Ok(Some(members.clone())),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.cache.write().await.remove(&key);
        }
        Ok(None)
    }

    async fn save_members(&self, den_id: &str, members: &[Member], ttl: std::time::Duration) -> Result<(), DenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| DenError::CacheError(format!("Failed to convert TTL: {}", e)))?;
        let mut cache = self.cache.write().await;
        cache.insert(den_members_key(den_id), (members.to_vec(), Utc::now() + ttl));
        Ok(())
    }

    async fn invalidate_members(&self, den_id: &str) -> Result<(), DenError> {
        let mut cache = self.cache.write().await;
        cache.remove(&den_members_key(den_id));
        Ok(())
    }
}
