use magen_mongo::bson::{DateTime, Document, doc};
use magen_mongo::{Dao, InMemoryCollection, StoreError};
use shared::FailureCategory;
use std::sync::Arc;

fn dao() -> (Dao, Arc<InMemoryCollection>) {
    let collection = Arc::new(InMemoryCollection::new("magen_test"));
    (Dao::new(collection.clone()), collection)
}

fn record(uuid: &str, location: &str) -> Document {
    doc! { "uuid": uuid, "name": "InsertOne", "location": location }
}

// ========== Insert ==========

#[tokio::test]
async fn test_insert_then_read_back() {
    let (dao, _) = dao();
    let inserted = dao.insert(record("u-1", "San Jose")).await;
    assert!(inserted.success());
    assert_eq!(inserted.count(), 1);
    assert_eq!(inserted.message(), Some("Document inserted successfully"));

    let found = dao.find_one_filter(doc! { "uuid": "u-1" }, None).await;
    assert!(found.success());
    assert_eq!(found.count(), 1);
    assert_eq!(found.document(), Some(&record("u-1", "San Jose")));
}

#[tokio::test]
async fn test_insert_duplicate_id_goes_through_translator() {
    let (dao, _) = dao();
    assert!(dao.insert(doc! { "_id": 4, "uuid": "a" }).await.success());

    let outcome = dao.insert(doc! { "_id": 4, "uuid": "b" }).await;
    assert!(!outcome.success());
    assert_eq!(outcome.code(), Some(11000));
    assert_eq!(outcome.category(), Some(FailureCategory::ServerReported));
    assert!(outcome.message().unwrap().contains("E11000"));
}

#[tokio::test]
async fn test_insert_many() {
    let (dao, collection) = dao();
    let outcome = dao
        .insert_many(vec![record("a", "San Jose"), record("b", "Tokyo")])
        .await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 2);
    assert_eq!(outcome.message(), Some("Documents inserted"));
    assert_eq!(collection.len(), 2);
}

#[tokio::test]
async fn test_insert_many_partial_failure() {
    let (dao, collection) = dao();
    let outcome = dao
        .insert_many(vec![
            doc! { "_id": 1, "uuid": "a" },
            doc! { "_id": 1, "uuid": "b" },
        ])
        .await;
    assert!(!outcome.success());
    assert_eq!(outcome.category(), Some(FailureCategory::PartialFailure));
    assert!(outcome.message().unwrap().starts_with("BulkWriteError"));
    assert_eq!(collection.len(), 1);
}

// ========== Update ==========

#[tokio::test]
async fn test_update_and_update_many() {
    let (dao, _) = dao();
    dao.insert_many(vec![record("a", "Paris"), record("b", "Paris")])
        .await;

    let outcome = dao
        .update(doc! { "uuid": "a" }, doc! { "$set": { "location": "Rome" } })
        .await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 1);
    assert_eq!(outcome.matched_count(), 1);
    assert_eq!(outcome.message(), Some("Update successful"));

    let outcome = dao
        .update_many(
            doc! { "name": "InsertOne" },
            doc! { "$set": { "location": "Rome" } },
        )
        .await;
    assert!(outcome.success());
    assert_eq!(outcome.matched_count(), 2);
    assert_eq!(outcome.count(), 1);
}

#[tokio::test]
async fn test_update_without_match_is_acknowledged() {
    let (dao, _) = dao();
    let outcome = dao
        .update(doc! { "uuid": "ghost" }, doc! { "$set": { "v": 1 } })
        .await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 0);
    assert_eq!(outcome.message(), Some("Update failed"));
}

#[tokio::test]
async fn test_update_without_operators_is_bad_request() {
    let (dao, _) = dao();
    dao.insert(record("a", "Paris")).await;
    let outcome = dao
        .update(doc! { "uuid": "a" }, doc! { "location": "Rome" })
        .await;
    assert!(!outcome.success());
    assert_eq!(outcome.category(), Some(FailureCategory::BadRequest));
}

#[tokio::test]
async fn test_add_to_set() {
    let (dao, _) = dao();
    dao.insert(doc! { "uuid": "g", "members": ["x"] }).await;

    let outcome = dao
        .add_to_set(doc! { "uuid": "g" }, doc! { "members": "y" })
        .await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 1);

    let again = dao
        .add_to_set(doc! { "uuid": "g" }, doc! { "members": "y" })
        .await;
    assert!(again.success());
    assert_eq!(again.count(), 0);

    let found = dao.find_one_filter(doc! { "uuid": "g" }, None).await;
    assert_eq!(
        found.document().unwrap().get_array("members").unwrap().len(),
        2
    );
}

// ========== Delete ==========

#[tokio::test]
async fn test_delete_missing_document_succeeds() {
    let (dao, _) = dao();
    let outcome = dao.delete(doc! { "uuid": "nobody" }).await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 0);
    assert_eq!(outcome.message(), Some("Document deleted"));
}

#[tokio::test]
async fn test_delete_and_delete_all() {
    let (dao, collection) = dao();
    dao.insert_many(vec![record("a", "x"), record("b", "y"), record("c", "z")])
        .await;

    let outcome = dao.delete(doc! { "uuid": "a" }).await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 1);

    let outcome = dao.delete_all().await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 2);
    assert_eq!(outcome.message(), Some("Documents deleted"));
    assert!(collection.is_empty());
}

// ========== Read ==========

#[tokio::test]
async fn test_find_one_missing() {
    let (dao, _) = dao();
    let outcome = dao.find_one_filter(doc! { "uuid": "nobody" }, None).await;
    assert!(!outcome.success());
    assert!(outcome.error().is_none());
    assert_eq!(outcome.message(), Some("Document not found"));
}

#[tokio::test]
async fn test_select_hides_id_and_renders_timestamp() {
    let (dao, _) = dao();
    let created = DateTime::from_millis(1_500_000_000_000);
    dao.insert(doc! { "uuid": "a", "creation_timestamp": created })
        .await;
    dao.insert(doc! { "uuid": "b", "creation_timestamp": created })
        .await;

    let outcome = dao.select_all(None).await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 2);
    for document in outcome.documents() {
        assert!(!document.contains_key("_id"));
        let rendered = document.get_str("creation_timestamp").unwrap();
        assert!(rendered.starts_with("2017-07-14T02:40:00"));
    }

    let outcome = dao
        .select_by_condition(doc! { "uuid": "b" }, Some(doc! { "uuid": 1 }))
        .await;
    assert_eq!(outcome.count(), 1);
    assert_eq!(outcome.documents(), &[doc! { "uuid": "b" }]);
}

#[tokio::test]
async fn test_count_documents() {
    let (dao, _) = dao();
    let outcome = dao.count_documents(None).await;
    assert!(!outcome.success());
    assert_eq!(outcome.message(), Some("No Documents found"));

    dao.insert_many(vec![record("a", "x"), record("b", "y")])
        .await;
    let outcome = dao.count_documents(Some(doc! { "uuid": "a" })).await;
    assert!(outcome.success());
    assert_eq!(outcome.count(), 1);
    assert_eq!(outcome.message(), Some("Document found"));
}

// ========== Replace ==========

#[tokio::test]
async fn test_replace_is_idempotent() {
    let (dao, collection) = dao();
    let replacement = doc! { "uuid": "r", "location": "Lisbon" };

    let first = dao.replace(doc! { "uuid": "r" }, replacement.clone()).await;
    let second = dao.replace(doc! { "uuid": "r" }, replacement.clone()).await;
    assert!(first.success());
    assert!(second.success());
    assert_eq!(second.message(), Some("Document replaced"));
    assert_eq!(collection.len(), 1);

    let stored = dao.find_one_filter(doc! { "uuid": "r" }, None).await;
    assert_eq!(stored.document(), Some(&replacement));
}

#[tokio::test]
async fn test_replace_without_uuid_is_rejected() {
    let (dao, collection) = dao();
    let outcome = dao
        .replace(doc! { "uuid": "r" }, doc! { "location": "Lisbon" })
        .await;
    assert!(!outcome.success());
    assert_eq!(outcome.category(), Some(FailureCategory::BadRequest));
    assert!(collection.is_empty());
}

#[tokio::test]
async fn test_replace_with_custom_uuid_field() {
    let collection = Arc::new(InMemoryCollection::new("magen_test"));
    let dao = Dao::new(collection).with_uuid_field("asset_id");
    let outcome = dao
        .replace(
            doc! { "asset_id": "a-1" },
            doc! { "asset_id": "a-1", "v": 2 },
        )
        .await;
    assert!(outcome.success());
}

// ========== Bulk ==========

#[tokio::test]
async fn test_empty_bulk_succeeds() {
    let (dao, _) = dao();
    let bulk = dao.initialize_bulk_operation();
    let outcome = dao.execute_bulk_operation(bulk).await;
    assert!(outcome.success());
    assert!(outcome.error().is_none());
}

#[tokio::test]
async fn test_bulk_insert_remove_add_to_set() {
    let (dao, collection) = dao();
    dao.insert_many(vec![record("a", "San Jose"), record("b", "Tokyo")])
        .await;

    let mut bulk = dao.initialize_bulk_operation();
    dao.bulk_insert(
        &mut bulk,
        doc! { "uuid": "c", "name": "InsertOne", "locations": ["Paris"] },
    );
    dao.bulk_remove_one(&mut bulk, "a");
    dao.bulk_remove_one(&mut bulk, "b");
    dao.bulk_add_to_set(&mut bulk, doc! { "uuid": "c" }, doc! { "locations": "Rome" });

    let outcome = dao.execute_bulk_operation(bulk).await;
    assert!(outcome.success());
    assert_eq!(collection.len(), 1);

    let found = dao.find_one_filter(doc! { "uuid": "c" }, None).await;
    let locations = found.document().unwrap().get_array("locations").unwrap();
    assert_eq!(locations.len(), 2);
}

#[tokio::test]
async fn test_bulk_duplicate_key_is_partial_failure() {
    let (dao, _) = dao();
    let mut bulk = dao.initialize_bulk_operation();
    dao.bulk_insert(&mut bulk, doc! { "_id": 4, "uuid": "a" });
    dao.bulk_insert(&mut bulk, doc! { "_id": 4, "uuid": "b" });

    let outcome = dao.execute_bulk_operation(bulk).await;
    assert!(!outcome.success());
    assert_eq!(outcome.count(), 1);
    let Some(StoreError::BulkWrite {
        write_errors,
        completed,
    }) = outcome.error()
    else {
        panic!("expected bulk write error");
    };
    assert_eq!(completed.inserted_count, 1);
    assert_eq!(write_errors[0].index, 1);
    assert_eq!(write_errors[0].code, 11000);
}
