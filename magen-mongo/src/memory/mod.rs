//! In-memory document collection
//!
//! A [`DocumentCollection`] kept in a `Vec<Document>` behind a read/write
//! lock. Used by tests and by services that run without a database server.
//! Writes follow the server's observable behavior closely enough for the DAO:
//! generated `_id` values, duplicate key errors (code 11000), ordered bulk
//! writes that stop at the first failure.

mod filter;
mod projection;
mod update;

use crate::driver::{
    BAD_VALUE_CODE, BulkOp, BulkWriteAck, DeleteAck, DocumentCollection, EMPTY_BULK_MESSAGE,
    InsertManyAck, InsertOneAck, StoreResult, UpdateAck,
};
use crate::error::{BulkWriteFailure, DUPLICATE_KEY_CODE, StoreError};
use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use parking_lot::RwLock;

use filter::{bson_eq, matches};
use projection::project;
use update::{apply_update, parse_update};

const FAILED_TO_PARSE_CODE: i32 = 9;

pub struct InMemoryCollection {
    name: String,
    documents: RwLock<Vec<Document>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Copy of every stored document, `_id` included
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    // ========== Write helpers (lock held by caller) ==========

    fn insert_into(&self, documents: &mut Vec<Document>, document: Document) -> StoreResult<Bson> {
        let (id, stored) = match document.get("_id") {
            Some(id) => (id.clone(), document),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut stored = doc! { "_id": id.clone() };
                for (key, value) in document {
                    stored.insert(key, value);
                }
                (id, stored)
            }
        };

        if documents
            .iter()
            .any(|d| d.get("_id").is_some_and(|existing| bson_eq(existing, &id)))
        {
            return Err(StoreError::OperationFailure {
                code: DUPLICATE_KEY_CODE,
                message: format!(
                    "E11000 duplicate key error collection: {} index: _id_ dup key: {{ _id: {} }}",
                    self.name, id
                ),
            });
        }

        documents.push(stored);
        Ok(id)
    }

    fn update_in(
        documents: &mut [Document],
        filter: &Document,
        update: &Document,
        multi: bool,
    ) -> StoreResult<(u64, u64)> {
        let updates = parse_update(update)?;
        let mut matched = 0;
        let mut modified = 0;
        for document in documents.iter_mut() {
            if !matches(document, filter)? {
                continue;
            }
            matched += 1;
            let mut updated = document.clone();
            apply_update(&mut updated, &updates)?;
            if updated != *document {
                *document = updated;
                modified += 1;
            }
            if !multi {
                break;
            }
        }
        Ok((matched, modified))
    }

    fn delete_in(documents: &mut Vec<Document>, filter: &Document, multi: bool) -> StoreResult<u64> {
        let mut deleted = 0;
        let mut index = 0;
        while index < documents.len() {
            if matches(&documents[index], filter)? {
                documents.remove(index);
                deleted += 1;
                if !multi {
                    break;
                }
            } else {
                index += 1;
            }
        }
        Ok(deleted)
    }

    fn select(&self, filter: &Document, projection: Option<&Document>) -> StoreResult<Vec<Document>> {
        let documents = self.documents.read();
        let mut out = Vec::new();
        for document in documents.iter() {
            if matches(document, filter)? {
                out.push(match projection {
                    Some(p) => project(document, p)?,
                    None => document.clone(),
                });
            }
        }
        Ok(out)
    }
}

fn write_error_code(err: &StoreError) -> i32 {
    match err {
        StoreError::MalformedRequest(_) => FAILED_TO_PARSE_CODE,
        other => other.code().unwrap_or(BAD_VALUE_CODE),
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, document: Document) -> StoreResult<InsertOneAck> {
        let mut documents = self.documents.write();
        let id = self.insert_into(&mut documents, document)?;
        Ok(InsertOneAck {
            acknowledged: true,
            inserted_id: Some(id),
        })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<InsertManyAck> {
        if documents.is_empty() {
            return Err(StoreError::MalformedRequest(
                "No documents provided to insert_many".into(),
            ));
        }
        let mut stored = self.documents.write();
        let mut inserted = 0;
        for (index, document) in documents.into_iter().enumerate() {
            if let Err(err) = self.insert_into(&mut stored, document) {
                return Err(StoreError::BulkWrite {
                    write_errors: vec![BulkWriteFailure {
                        index,
                        code: write_error_code(&err),
                        message: err.outcome_message(),
                    }],
                    completed: BulkWriteAck {
                        inserted_count: inserted,
                        ..Default::default()
                    },
                });
            }
            inserted += 1;
        }
        Ok(InsertManyAck {
            acknowledged: true,
            inserted_count: inserted,
        })
    }

    async fn update_one(&self, filter: Document, update: Document) -> StoreResult<UpdateAck> {
        let mut documents = self.documents.write();
        let (matched_count, modified_count) = Self::update_in(&mut documents, &filter, &update, false)?;
        Ok(UpdateAck {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
        })
    }

    async fn update_many(&self, filter: Document, update: Document) -> StoreResult<UpdateAck> {
        let mut documents = self.documents.write();
        let (matched_count, modified_count) = Self::update_in(&mut documents, &filter, &update, true)?;
        Ok(UpdateAck {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
        })
    }

    async fn delete_one(&self, filter: Document) -> StoreResult<DeleteAck> {
        let mut documents = self.documents.write();
        let deleted_count = Self::delete_in(&mut documents, &filter, false)?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn delete_many(&self, filter: Document) -> StoreResult<DeleteAck> {
        let mut documents = self.documents.write();
        let deleted_count = Self::delete_in(&mut documents, &filter, true)?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn find(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Vec<Document>> {
        self.select(&filter, projection.as_ref())
    }

    async fn find_one(
        &self,
        filter: Document,
        projection: Option<Document>,
    ) -> StoreResult<Option<Document>> {
        let documents = self.documents.read();
        for document in documents.iter() {
            if matches(document, &filter)? {
                return match projection {
                    Some(p) => project(document, &p).map(Some),
                    None => Ok(Some(document.clone())),
                };
            }
        }
        Ok(None)
    }

    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> StoreResult<Option<Document>> {
        if replacement.keys().any(|k| k.starts_with('$')) {
            return Err(StoreError::MalformedRequest(
                "replacement document must not contain update operators".into(),
            ));
        }

        let mut documents = self.documents.write();
        let mut position = None;
        for (index, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                position = Some(index);
                break;
            }
        }

        match position {
            Some(index) => {
                let existing_id = documents[index].get("_id").cloned().unwrap_or(Bson::Null);
                if let Some(id) = replacement.get("_id")
                    && !bson_eq(id, &existing_id)
                {
                    return Err(StoreError::OperationFailure {
                        code: 66,
                        message: "After applying the update, the (immutable) field '_id' was found to have been altered".into(),
                    });
                }
                let mut stored = doc! { "_id": existing_id };
                for (key, value) in replacement {
                    if key != "_id" {
                        stored.insert(key, value);
                    }
                }
                documents[index] = stored.clone();
                Ok(Some(stored))
            }
            None if upsert => {
                let id = self.insert_into(&mut documents, replacement)?;
                Ok(documents
                    .iter()
                    .rev()
                    .find(|d| d.get("_id").is_some_and(|existing| bson_eq(existing, &id)))
                    .cloned())
            }
            None => Ok(None),
        }
    }

    async fn count_documents(&self, filter: Document) -> StoreResult<u64> {
        let documents = self.documents.read();
        let mut count = 0;
        for document in documents.iter() {
            if matches(document, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn bulk_write(&self, operations: Vec<BulkOp>) -> StoreResult<BulkWriteAck> {
        if operations.is_empty() {
            return Err(StoreError::InvalidOperation(EMPTY_BULK_MESSAGE.into()));
        }

        let mut documents = self.documents.write();
        let mut ack = BulkWriteAck::default();
        for (index, operation) in operations.into_iter().enumerate() {
            let result = match operation {
                BulkOp::Insert(document) => self
                    .insert_into(&mut documents, document)
                    .map(|_| ack.inserted_count += 1),
                BulkOp::RemoveOne(filter) => Self::delete_in(&mut documents, &filter, false)
                    .map(|n| ack.removed_count += n),
                BulkOp::UpdateOne { filter, update } => {
                    Self::update_in(&mut documents, &filter, &update, false).map(
                        |(matched, modified)| {
                            ack.matched_count += matched;
                            ack.modified_count += modified;
                        },
                    )
                }
            };
            if let Err(err) = result {
                return Err(StoreError::BulkWrite {
                    write_errors: vec![BulkWriteFailure {
                        index,
                        code: write_error_code(&err),
                        message: err.outcome_message(),
                    }],
                    completed: ack,
                });
            }
        }
        Ok(ack)
    }
}
