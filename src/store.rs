use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{OwnerCredential, UrlRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a record with this short id already exists")]
    Conflict,
    #[error("store call did not complete within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

/// Persistence for URL records.
///
/// Uniqueness of `short_id` is enforced by the store itself: `insert` must fail with
/// [`StoreError::Conflict`] instead of the caller checking for an existing record first.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Inserts `record` unless its short id is already in use.
    async fn insert(&self, record: &UrlRecord) -> Result<(), StoreError>;

    async fn find(&self, short_id: &str) -> Result<Option<UrlRecord>, StoreError>;

    /// Atomically adds one to the record's click counter.
    /// Returns `false` when no record has this short id.
    async fn increment_clicks(&self, short_id: &str) -> Result<bool, StoreError>;

    /// All records owned by `owner`, oldest first.
    async fn list_by_owner(&self, owner: &OwnerCredential) -> Result<Vec<UrlRecord>, StoreError>;

    /// Removes the record only if it belongs to `owner`.
    /// Returns `true` if a record was removed.
    async fn delete(&self, short_id: &str, owner: &OwnerCredential) -> Result<bool, StoreError>;
}
