//! Projection of stored documents

use super::filter::truthy;
use crate::driver::StoreResult;
use crate::error::StoreError;
use mongodb::bson::{Bson, Document};

/// Apply an inclusion or exclusion projection
///
/// `_id` is kept unless explicitly excluded and may be excluded from an
/// inclusion projection. Mixing inclusion and exclusion on other fields is
/// rejected.
pub(crate) fn project(doc: &Document, projection: &Document) -> StoreResult<Document> {
    let keep_id = projection.get("_id").is_none_or(truthy);

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for (field, flag) in projection {
        if field == "_id" {
            continue;
        }
        if truthy(flag) {
            included.push(field.as_str());
        } else {
            excluded.push(field.as_str());
        }
    }

    if !included.is_empty() && !excluded.is_empty() {
        return Err(StoreError::MalformedRequest(format!(
            "Cannot do exclusion on field {} in inclusion projection",
            excluded[0]
        )));
    }

    if included.is_empty() {
        let mut out = doc.clone();
        if !keep_id {
            out.remove("_id");
        }
        for path in excluded {
            remove_path(&mut out, path);
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if keep_id && let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for path in included {
        copy_path(doc, &mut out, path);
    }
    Ok(out)
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(child)) = doc.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

fn copy_path(source: &Document, target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path, value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Bson::Document(child)) = source.get(head) else {
                return;
            };
            if !matches!(target.get(head), Some(Bson::Document(_))) {
                target.insert(head, Document::new());
            }
            if let Some(Bson::Document(sub)) = target.get_mut(head) {
                copy_path(child, sub, rest);
            }
        }
    }
}
