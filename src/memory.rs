use std::collections::{HashMap, hash_map::Entry};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    models::{OwnerCredential, UrlRecord},
    store::{StoreError, UrlStore},
};

/// Keeps records in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    urls: RwLock<HashMap<String, UrlRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UrlStore for MemoryStore {
    async fn insert(&self, record: &UrlRecord) -> Result<(), StoreError> {
        match self.urls.write().await.entry(record.short_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find(&self, short_id: &str) -> Result<Option<UrlRecord>, StoreError> {
        Ok(self.urls.read().await.get(short_id).cloned())
    }

    async fn increment_clicks(&self, short_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .urls
            .write()
            .await
            .get_mut(short_id)
            .map(|record| record.clicks += 1)
            .is_some())
    }

    async fn list_by_owner(&self, owner: &OwnerCredential) -> Result<Vec<UrlRecord>, StoreError> {
        let mut records: Vec<_> = self
            .urls
            .read()
            .await
            .values()
            .filter(|record| owner.owns(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn delete(&self, short_id: &str, owner: &OwnerCredential) -> Result<bool, StoreError> {
        let mut urls = self.urls.write().await;
        if urls.get(short_id).is_some_and(|record| owner.owns(record)) {
            urls.remove(short_id);
            return Ok(true);
        }
        Ok(false)
    }
}
