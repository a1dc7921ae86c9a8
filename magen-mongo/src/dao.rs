//! Data access operations
//!
//! [`Dao`] wraps one collection. Every operation performs exactly one driver
//! call, inspects the acknowledgement and counts, and returns a
//! [`MongoReturn`]. Driver errors are never propagated; they go through
//! [`handle_store_error`] unmodified.

use crate::bulk::BulkOperation;
use crate::driver::{DocumentCollection, StoreResult, UpdateAck};
use crate::error::{StoreError, handle_store_error};
use crate::outcome::MongoReturn;
use mongodb::bson::{Bson, Document, doc};
use std::sync::Arc;

/// Default identity key of stored documents
pub const DEFAULT_UUID_FIELD: &str = "uuid";

/// Field rendered as an RFC 3339 string on multi-document reads
const CREATION_TIMESTAMP: &str = "creation_timestamp";

/// Run the operation template: translate errors, build the outcome otherwise
fn outcome<T>(result: StoreResult<T>, build: impl FnOnce(T) -> MongoReturn) -> MongoReturn {
    match result {
        Ok(value) => build(value),
        Err(err) => handle_store_error(err),
    }
}

/// Projection that always hides `_id`
fn hide_id(projection: Option<Document>) -> Document {
    let mut projection = projection.unwrap_or_default();
    projection.insert("_id", false);
    projection
}

fn render_timestamps(mut documents: Vec<Document>) -> Vec<Document> {
    for document in &mut documents {
        if let Some(Bson::DateTime(created)) = document.get(CREATION_TIMESTAMP)
            && let Ok(text) = created.try_to_rfc3339_string()
        {
            document.insert(CREATION_TIMESTAMP, text);
        }
    }
    documents
}

/// Data access object for one collection
#[derive(Clone)]
pub struct Dao {
    collection: Arc<dyn DocumentCollection>,
    uuid_field: String,
}

impl Dao {
    pub fn new(collection: Arc<dyn DocumentCollection>) -> Self {
        Self {
            collection,
            uuid_field: DEFAULT_UUID_FIELD.to_string(),
        }
    }

    /// Use another field as the identity key
    pub fn with_uuid_field(mut self, field: impl Into<String>) -> Self {
        self.uuid_field = field.into();
        self
    }

    pub fn collection(&self) -> &Arc<dyn DocumentCollection> {
        &self.collection
    }

    pub fn uuid_field(&self) -> &str {
        &self.uuid_field
    }

    // ========== Create ==========

    /// Insert one document
    pub async fn insert(&self, data: Document) -> MongoReturn {
        let result = self.collection.insert_one(data).await;
        outcome(result, |ack| {
            if ack.acknowledged && ack.inserted_id.is_some() {
                tracing::debug!(collection = %self.collection.name(), "Document inserted");
                MongoReturn::new()
                    .with_success(true)
                    .with_message("Document inserted successfully")
                    .with_count(1)
            } else {
                tracing::error!(collection = %self.collection.name(), "Failed to insert document");
                MongoReturn::new().with_message("Failed to insert document")
            }
        })
    }

    /// Insert a list of documents in one call
    pub async fn insert_many(&self, data: Vec<Document>) -> MongoReturn {
        let expected = data.len() as u64;
        let result = self.collection.insert_many(data).await;
        outcome(result, |ack| {
            let outcome = MongoReturn::new().with_count(ack.inserted_count);
            if ack.acknowledged && ack.inserted_count == expected {
                tracing::debug!(
                    collection = %self.collection.name(),
                    count = ack.inserted_count,
                    "Documents inserted"
                );
                outcome.with_success(true).with_message("Documents inserted")
            } else {
                tracing::warn!(
                    collection = %self.collection.name(),
                    expected,
                    inserted = ack.inserted_count,
                    "Failed to insert some records"
                );
                outcome.with_message("Failed to insert some records")
            }
        })
    }

    // ========== Update ==========

    /// Update the first matching document
    ///
    /// `action` must use update operators (`$set`, `$inc`, ...).
    pub async fn update(&self, filter: Document, action: Document) -> MongoReturn {
        let result = self.collection.update_one(filter, action).await;
        outcome(result, |ack| self.update_outcome(ack))
    }

    /// Update every matching document
    pub async fn update_many(&self, filter: Document, action: Document) -> MongoReturn {
        let result = self.collection.update_many(filter, action).await;
        outcome(result, |ack| self.update_outcome(ack))
    }

    /// Add an element to an array of the first matching document
    ///
    /// `action` maps the array field to the element, e.g.
    /// `{"members": "u-42"}`.
    pub async fn add_to_set(&self, filter: Document, action: Document) -> MongoReturn {
        self.update(filter, doc! { "$addToSet": action }).await
    }

    fn update_outcome(&self, ack: UpdateAck) -> MongoReturn {
        if !ack.acknowledged {
            tracing::warn!(collection = %self.collection.name(), "Update not acknowledged");
        }
        let message = if ack.acknowledged && ack.modified_count > 0 {
            "Update successful"
        } else {
            "Update failed"
        };
        MongoReturn::new()
            .with_success(ack.acknowledged)
            .with_count(ack.modified_count)
            .with_matched_count(ack.matched_count)
            .with_message(message)
    }

    // ========== Delete ==========

    /// Delete the first matching document
    ///
    /// Deleting a document that does not exist still succeeds, with a
    /// count of zero.
    pub async fn delete(&self, filter: Document) -> MongoReturn {
        let result = self.collection.delete_one(filter).await;
        outcome(result, |ack| {
            if ack.acknowledged {
                tracing::debug!(
                    collection = %self.collection.name(),
                    deleted = ack.deleted_count,
                    "Document deleted"
                );
                MongoReturn::new()
                    .with_success(true)
                    .with_message("Document deleted")
                    .with_count(ack.deleted_count)
            } else {
                tracing::warn!(collection = %self.collection.name(), "Delete not acknowledged");
                MongoReturn::new().with_message("Failed to delete document")
            }
        })
    }

    /// Delete every document of the collection
    pub async fn delete_all(&self) -> MongoReturn {
        let result = self.collection.delete_many(Document::new()).await;
        outcome(result, |ack| {
            let outcome = MongoReturn::new()
                .with_success(ack.acknowledged)
                .with_count(ack.deleted_count);
            if ack.acknowledged {
                outcome.with_message("Documents deleted")
            } else {
                tracing::warn!(collection = %self.collection.name(), "Delete not acknowledged");
                outcome.with_message("Failed to delete documents")
            }
        })
    }

    // ========== Read ==========

    /// Find a single document; `_id` is never returned
    pub async fn find_one_filter(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> MongoReturn {
        let result = self
            .collection
            .find_one(filter, Some(hide_id(projection)))
            .await;
        outcome(result, |found| match found {
            Some(document) => MongoReturn::new()
                .with_success(true)
                .with_count(1)
                .with_documents(vec![document]),
            None => MongoReturn::new().with_message("Document not found"),
        })
    }

    /// Every document of the collection
    pub async fn select_all(&self, projection: Option<Document>) -> MongoReturn {
        self.select(Document::new(), projection).await
    }

    /// Every document matching `filter`
    pub async fn select_by_condition(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> MongoReturn {
        self.select(filter, projection).await
    }

    async fn select(&self, filter: Document, projection: Option<Document>) -> MongoReturn {
        let result = self.collection.find(filter, Some(hide_id(projection))).await;
        outcome(result, |documents| {
            let documents = render_timestamps(documents);
            MongoReturn::new()
                .with_success(true)
                .with_message("Query successful")
                .with_count(documents.len() as u64)
                .with_documents(documents)
        })
    }

    /// Count documents matching `filter`, or all when `None`
    pub async fn count_documents(&self, filter: Option<Document>) -> MongoReturn {
        let result = self
            .collection
            .count_documents(filter.unwrap_or_default())
            .await;
        outcome(result, |count| {
            let outcome = MongoReturn::new().with_count(count);
            if count > 0 {
                outcome.with_success(true).with_message("Document found")
            } else {
                outcome.with_message("No Documents found")
            }
        })
    }

    // ========== Replace ==========

    /// Replace the document matching `filter`, inserting it when absent
    ///
    /// Idempotent, meant for PUT-style writes. Succeeds when the document
    /// returned after the write carries the replacement's identity key.
    pub async fn replace(&self, filter: Document, replacement: Document) -> MongoReturn {
        let Some(expected) = replacement.get(&self.uuid_field).cloned() else {
            return handle_store_error(StoreError::MalformedRequest(format!(
                "replacement document has no '{}' field",
                self.uuid_field
            )));
        };

        let result = self
            .collection
            .find_one_and_replace(filter, replacement, true)
            .await;
        outcome(result, |after| match after {
            Some(document) if document.get(&self.uuid_field) == Some(&expected) => {
                tracing::debug!(collection = %self.collection.name(), "Document replaced");
                MongoReturn::new()
                    .with_success(true)
                    .with_message("Document replaced")
                    .with_documents(vec![document])
            }
            _ => MongoReturn::new().with_message("Failed to replace document"),
        })
    }

    // ========== Bulk ==========

    /// Start an empty ordered batch
    pub fn initialize_bulk_operation(&self) -> BulkOperation {
        BulkOperation::new()
    }

    /// Queue an insert
    pub fn bulk_insert(&self, bulk: &mut BulkOperation, data: Document) {
        bulk.insert(data);
    }

    /// Queue the removal of the document with the given identity key
    pub fn bulk_remove_one(&self, bulk: &mut BulkOperation, uuid: &str) {
        let mut filter = Document::new();
        filter.insert(self.uuid_field.clone(), uuid);
        bulk.remove_one(filter);
    }

    /// Queue an `$addToSet` on the first document matching `filter`
    pub fn bulk_add_to_set(&self, bulk: &mut BulkOperation, filter: Document, action: Document) {
        bulk.update_one(filter, doc! { "$addToSet": action });
    }

    /// Submit a batch
    ///
    /// An empty batch is not an error. A partial failure goes through the
    /// translator and keeps the counts of the operations applied before it.
    pub async fn execute_bulk_operation(&self, bulk: BulkOperation) -> MongoReturn {
        match self.collection.bulk_write(bulk.into_operations()).await {
            Ok(ack) => MongoReturn::new()
                .with_success(true)
                .with_message("Bulk operation executed")
                .with_count(ack.affected())
                .with_matched_count(ack.matched_count),
            Err(StoreError::InvalidOperation(message)) => {
                tracing::debug!(collection = %self.collection.name(), "Empty bulk operation");
                MongoReturn::new().with_success(true).with_message(message)
            }
            Err(err) => handle_store_error(err),
        }
    }
}
