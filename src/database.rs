use async_trait::async_trait;
use bson::{Document, doc};
use futures_util::TryStreamExt;
use mongodb::{
    Client, Collection, IndexModel,
    error::{Error, ErrorKind, WriteError, WriteFailure},
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
};

use crate::{
    models::{OwnerCredential, UrlRecord},
    store::{StoreError, UrlStore},
};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store over the `urls` collection.
#[derive(Clone)]
pub struct Database {
    urls: Collection<UrlRecord>,
}

impl Database {
    /// Connects and makes sure the indexes the store relies on exist.
    ///
    /// # Errors
    ///
    /// Fails if the connection string is invalid or the indexes cannot be created.
    pub async fn new(connection_string: &str, database_name: &str) -> Result<Self, Error> {
        let mut client_options = ClientOptions::parse(connection_string).await?;
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);

        let client = Client::with_options(client_options)?;
        let database = Self {
            urls: client.database(database_name).collection::<UrlRecord>("urls"),
        };
        database.ensure_indexes().await?;

        Ok(database)
    }

    async fn ensure_indexes(&self) -> Result<(), Error> {
        let unique_short_id = IndexModel::builder()
            .keys(doc! { "short_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_owner = IndexModel::builder()
            .keys(doc! { "username": 1, "password": 1 })
            .build();
        self.urls.create_indexes([unique_short_id, by_owner]).await?;
        tracing::debug!("urls indexes ready");

        Ok(())
    }
}

fn owner_filter(owner: &OwnerCredential) -> Document {
    doc! { "username": owner.username(), "password": owner.password() }
}

fn is_duplicate_key(err: &Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: DUPLICATE_KEY, .. }))
    )
}

#[async_trait]
impl UrlStore for Database {
    async fn insert(&self, record: &UrlRecord) -> Result<(), StoreError> {
        match self.urls.insert_one(record).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, short_id: &str) -> Result<Option<UrlRecord>, StoreError> {
        let url = self.urls.find_one(doc! { "short_id": short_id }).await?;

        Ok(url)
    }

    async fn increment_clicks(&self, short_id: &str) -> Result<bool, StoreError> {
        let result = self
            .urls
            .update_one(doc! { "short_id": short_id }, doc! { "$inc": { "clicks": 1_i64 } })
            .await?;

        Ok(result.matched_count > 0)
    }

    async fn list_by_owner(&self, owner: &OwnerCredential) -> Result<Vec<UrlRecord>, StoreError> {
        let cursor = self
            .urls
            .find(owner_filter(owner))
            .sort(doc! { "created_at": 1 })
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn delete(&self, short_id: &str, owner: &OwnerCredential) -> Result<bool, StoreError> {
        let mut filter = owner_filter(owner);
        filter.insert("short_id", short_id);
        let result = self.urls.delete_one(filter).await?;

        Ok(result.deleted_count > 0)
    }
}
