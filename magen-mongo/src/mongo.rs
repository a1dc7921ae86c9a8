//! MongoDB driver adapter
//!
//! [`MongoCollection`] implements the driver boundary on top of the official
//! `mongodb` crate. [`MongoCore`] owns the client and hands out collections
//! and DAOs; it is created once by the service and passed to whoever needs it.

use crate::dao::Dao;
use crate::driver::{
    BAD_VALUE_CODE, BulkOp, BulkWriteAck, DeleteAck, DocumentCollection, EMPTY_BULK_MESSAGE,
    InsertManyAck, InsertOneAck, StoreResult, UpdateAck,
};
use crate::error::{BulkWriteFailure, StoreError, handle_store_error};
use crate::outcome::MongoReturn;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use shared::MagenConfig;
use std::sync::Arc;

/// Collection backed by a MongoDB server
#[derive(Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {
    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }

    async fn apply(&self, operation: BulkOp, ack: &mut BulkWriteAck) -> StoreResult<()> {
        match operation {
            BulkOp::Insert(document) => {
                self.inner.insert_one(document).await?;
                ack.inserted_count += 1;
            }
            BulkOp::RemoveOne(filter) => {
                let result = self.inner.delete_one(filter).await?;
                ack.removed_count += result.deleted_count;
            }
            BulkOp::UpdateOne { filter, update } => {
                let result = self.inner.update_one(filter, update).await?;
                ack.matched_count += result.matched_count;
                ack.modified_count += result.modified_count;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_one(&self, document: Document) -> StoreResult<InsertOneAck> {
        let result = self.inner.insert_one(document).await?;
        Ok(InsertOneAck {
            acknowledged: true,
            inserted_id: Some(result.inserted_id),
        })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<InsertManyAck> {
        let result = self.inner.insert_many(documents).await?;
        Ok(InsertManyAck {
            acknowledged: true,
            inserted_count: result.inserted_ids.len() as u64,
        })
    }

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateAck> {
        let result = self.inner.update_one(filter, update).await?;
        Ok(UpdateAck {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateAck> {
        let result = self.inner.update_many(filter, update).await?;
        Ok(UpdateAck {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(&self, filter: Document) -> StoreResult<DeleteAck> {
        let result = self.inner.delete_one(filter).await?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn delete_many(&self, filter: Document) -> StoreResult<DeleteAck> {
        let result = self.inner.delete_many(filter).await?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn find(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Vec<Document>> {
        let mut action = self.inner.find(filter);
        if let Some(projection) = projection {
            action = action.projection(projection);
        }
        let cursor = action.await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn find_one(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Option<Document>> {
        let mut action = self.inner.find_one(filter);
        if let Some(projection) = projection {
            action = action.projection(projection);
        }
        Ok(action.await?)
    }

    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .inner
            .find_one_and_replace(filter, replacement)
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn count_documents(&self, filter: Document) -> StoreResult<u64> {
        Ok(self.inner.count_documents(filter).await?)
    }

    async fn bulk_write(&self, operations: Vec<BulkOp>) -> StoreResult<BulkWriteAck> {
        if operations.is_empty() {
            return Err(StoreError::InvalidOperation(EMPTY_BULK_MESSAGE.into()));
        }

        // Ordered: submitted one by one, stopping at the first failure
        let mut ack = BulkWriteAck::default();
        for (index, operation) in operations.into_iter().enumerate() {
            if let Err(err) = self.apply(operation, &mut ack).await {
                return Err(StoreError::BulkWrite {
                    write_errors: vec![BulkWriteFailure {
                        index,
                        code: err.code().unwrap_or(BAD_VALUE_CODE),
                        message: err.outcome_message(),
                    }],
                    completed: ack,
                });
            }
        }
        Ok(ack)
    }
}

// ========== Core context ==========

/// Connected database handle
#[derive(Clone)]
pub struct MongoCore {
    client: Client,
    database: Database,
}

impl MongoCore {
    /// Connect using the Mongo settings of `config`
    ///
    /// The driver connects lazily; use [`MongoCore::check_db`] to find out
    /// whether the server is reachable.
    pub async fn connect(config: &MagenConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.mongo_uri).await?;
        options.server_selection_timeout = Some(config.mongo_select_timeout());
        options.app_name.get_or_insert_with(|| "magen".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.mongo_db);
        tracing::info!(database = %config.mongo_db, "Mongo client created");
        Ok(Self { client, database })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Driver-boundary handle for a collection
    pub fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MongoCollection::new(self.database.collection(name)))
    }

    /// DAO over a collection
    pub fn dao(&self, name: &str) -> Dao {
        Dao::new(self.collection(name))
    }

    /// Ping the server
    pub async fn check_db(&self) -> MongoReturn {
        match self.database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                tracing::debug!(database = %self.database.name(), "Mongo server reachable");
                MongoReturn::new()
                    .with_success(true)
                    .with_message("Mongo server reachable")
            }
            Err(err) => handle_store_error(err.into()),
        }
    }
}
