use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    error::ShortenerError,
    models::{NewLink, OwnerCredential, UrlRecord},
    short_id::ShortId,
    store::{StoreError, UrlStore},
};

/// How many random ids are tried before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

/// The four shortener operations on top of a [`UrlStore`].
///
/// Every store call is bounded by `store_timeout`; an expired call is reported as
/// [`StoreError::Timeout`] and handled like any other store failure.
#[derive(Clone)]
pub struct Shortener {
    store: Arc<dyn UrlStore>,
    store_timeout: Duration,
}

impl Shortener {
    #[must_use]
    pub fn new(store: Arc<dyn UrlStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }

    /// Stores a new link under the requested id, or under a freshly generated one.
    ///
    /// A requested id is never altered or retried. Generated ids are retried with a new
    /// random value on conflict, up to [`MAX_GENERATION_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// [`ShortenerError::IdentifierTaken`] if the requested id exists,
    /// [`ShortenerError::AllocationExhausted`] if every generated id collided,
    /// [`ShortenerError::Store`] on any store failure.
    pub async fn create(&self, link: NewLink) -> Result<UrlRecord, ShortenerError> {
        let NewLink {
            original_url,
            owner,
            short_id,
        } = link;

        if let Some(short_id) = short_id {
            let record = UrlRecord::new(&short_id, original_url, &owner);
            return match self.bounded(self.store.insert(&record)).await {
                Ok(()) => {
                    tracing::info!(short_id = %short_id, "created short url");
                    Ok(record)
                }
                Err(StoreError::Conflict) => Err(ShortenerError::IdentifierTaken),
                Err(err) => Err(err.into()),
            };
        }

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let short_id = ShortId::generate();
            let record = UrlRecord::new(&short_id, original_url.clone(), &owner);
            match self.bounded(self.store.insert(&record)).await {
                Ok(()) => {
                    tracing::info!(short_id = %short_id, attempt, "created short url");
                    return Ok(record);
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(short_id = %short_id, attempt, "generated short id collided");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::AllocationExhausted)
    }

    /// Looks up where `short_id` points and counts the visit.
    ///
    /// A failed click increment is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// [`ShortenerError::Store`] if the lookup itself fails.
    pub async fn resolve(&self, short_id: &str) -> Result<Option<String>, ShortenerError> {
        let Some(record) = self.bounded(self.store.find(short_id)).await? else {
            return Ok(None);
        };

        match self.bounded(self.store.increment_clicks(short_id)).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(short_id, "record vanished before its click was counted"),
            Err(err) => tracing::warn!(short_id, err = ?err, "failed to count click"),
        }

        Ok(Some(record.destination().into_owned()))
    }

    /// # Errors
    ///
    /// [`ShortenerError::Store`] if the scan fails.
    pub async fn list(&self, owner: &OwnerCredential) -> Result<Vec<UrlRecord>, ShortenerError> {
        Ok(self.bounded(self.store.list_by_owner(owner)).await?)
    }

    /// Removes `short_id` if `owner` owns it. Reports whether anything was removed.
    ///
    /// # Errors
    ///
    /// [`ShortenerError::Store`] if the delete fails.
    pub async fn delete(
        &self,
        short_id: &str,
        owner: &OwnerCredential,
    ) -> Result<bool, ShortenerError> {
        let removed = self.bounded(self.store.delete(short_id, owner)).await?;
        tracing::info!(short_id, removed, "delete requested");

        Ok(removed)
    }
}
