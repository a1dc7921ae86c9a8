//! Query filter evaluation
//!
//! Supports field equality (including dotted paths and array membership)
//! and the operators `$eq`, `$ne`, `$in`, `$nin`, `$exists`, `$gt`, `$gte`,
//! `$lt`, `$lte`, plus top-level `$and` / `$or`.

use crate::driver::StoreResult;
use crate::error::StoreError;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;

/// Does `doc` satisfy `filter`?
pub(crate) fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => all_of(doc, condition)?,
            "$or" => any_of(doc, condition)?,
            op if op.starts_with('$') => {
                return Err(StoreError::MalformedRequest(format!(
                    "unknown top level operator: {op}"
                )));
            }
            path => field_matches(&path_values(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses(condition: &Bson) -> StoreResult<Vec<&Document>> {
    let Bson::Array(items) = condition else {
        return Err(StoreError::MalformedRequest(
            "$and/$or must be an array".into(),
        ));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(StoreError::MalformedRequest(
                "$and/$or entries must be documents".into(),
            )),
        })
        .collect()
}

fn all_of(doc: &Document, condition: &Bson) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if !matches(doc, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_of(doc: &Document, condition: &Bson) -> StoreResult<bool> {
    for clause in clauses(condition)? {
        if matches(doc, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ========== Path resolution ==========

/// All values reachable through a dotted path
///
/// Arrays of sub-documents are traversed element by element, so
/// `"items.sku"` yields the `sku` of every item.
pub(crate) fn path_values<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some(value) = doc.get(segments[0]) {
        collect(value, &segments[1..], &mut out);
    }
    out
}

fn collect<'a>(value: &'a Bson, rest: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((segment, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(d) => {
            if let Some(child) = d.get(*segment) {
                collect(child, tail, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(child) = items.get(index) {
                    collect(child, tail, out);
                }
                return;
            }
            for item in items {
                if let Bson::Document(d) = item
                    && let Some(child) = d.get(*segment)
                {
                    collect(child, tail, out);
                }
            }
        }
        _ => {}
    }
}

// ========== Field conditions ==========

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(values: &[&Bson], condition: &Bson) -> StoreResult<bool> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals_any(values, condition));
    };

    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$eq" => equals_any(values, operand),
            "$ne" => !equals_any(values, operand),
            "$in" => in_list(values, operand)?,
            "$nin" => !in_list(values, operand)?,
            "$exists" => values.is_empty() != truthy(operand),
            "$gt" => compares(values, operand, |o| o == Ordering::Greater),
            "$gte" => compares(values, operand, |o| o != Ordering::Less),
            "$lt" => compares(values, operand, |o| o == Ordering::Less),
            "$lte" => compares(values, operand, |o| o != Ordering::Greater),
            other => {
                return Err(StoreError::MalformedRequest(format!(
                    "unknown operator: {other}"
                )));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality with array membership; a missing field equals `null`
fn equals_any(values: &[&Bson], target: &Bson) -> bool {
    if values.is_empty() {
        return matches!(target, Bson::Null);
    }
    values.iter().any(|value| {
        bson_eq(value, target)
            || matches!(value, Bson::Array(items) if items.iter().any(|i| bson_eq(i, target)))
    })
}

fn in_list(values: &[&Bson], operand: &Bson) -> StoreResult<bool> {
    let Bson::Array(candidates) = operand else {
        return Err(StoreError::MalformedRequest("$in needs an array".into()));
    };
    Ok(candidates.iter().any(|c| equals_any(values, c)))
}

fn compares(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    values.iter().any(|value| {
        let direct = bson_cmp(value, operand).is_some_and(&accept);
        let element = matches!(value, Bson::Array(items)
            if items.iter().any(|i| bson_cmp(i, operand).is_some_and(&accept)));
        direct || element
    })
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Equality where numbers compare across int/long/double
pub(crate) fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between comparable values of the same type family
fn bson_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ => None,
    }
}

/// Truthiness of a flag operand (`true`, non-zero numbers)
pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).is_none_or(|n| n != 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn sample() -> Document {
        doc! {
            "uuid": "u-1",
            "age": 42,
            "score": 7.5,
            "tags": ["a", "b"],
            "owner": { "name": "alice", "roles": [{ "r": "admin" }, { "r": "dev" }] },
        }
    }

    #[test]
    fn test_equality_and_paths() {
        let d = sample();
        assert!(matches(&d, &doc! { "uuid": "u-1" }).unwrap());
        assert!(!matches(&d, &doc! { "uuid": "u-2" }).unwrap());
        assert!(matches(&d, &doc! { "owner.name": "alice" }).unwrap());
        assert!(matches(&d, &doc! { "owner.roles.r": "dev" }).unwrap());
        assert!(matches(&d, &doc! { "tags": "b" }).unwrap());
        assert!(matches(&d, &doc! { "age": 42.0 }).unwrap());
        assert!(matches(&d, &doc! { "missing": Bson::Null }).unwrap());
        assert!(matches(&d, &doc! {}).unwrap());
    }

    #[test]
    fn test_operators() {
        let d = sample();
        assert!(matches(&d, &doc! { "age": { "$gt": 40, "$lte": 42 } }).unwrap());
        assert!(!matches(&d, &doc! { "age": { "$lt": 42 } }).unwrap());
        assert!(matches(&d, &doc! { "uuid": { "$in": ["x", "u-1"] } }).unwrap());
        assert!(matches(&d, &doc! { "uuid": { "$nin": ["x"] } }).unwrap());
        assert!(matches(&d, &doc! { "uuid": { "$ne": "x" } }).unwrap());
        assert!(matches(&d, &doc! { "tags": { "$ne": "z" } }).unwrap());
        assert!(!matches(&d, &doc! { "tags": { "$ne": "a" } }).unwrap());
        assert!(matches(&d, &doc! { "score": { "$exists": true } }).unwrap());
        assert!(matches(&d, &doc! { "nope": { "$exists": false } }).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let d = sample();
        assert!(matches(&d, &doc! { "$or": [{ "age": 1 }, { "uuid": "u-1" }] }).unwrap());
        assert!(!matches(&d, &doc! { "$and": [{ "age": 42 }, { "uuid": "x" }] }).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_malformed() {
        let err = matches(&sample(), &doc! { "age": { "$regex": "4" } }).unwrap_err();
        assert!(matches!(err, StoreError::MalformedRequest(_)));
        let err = matches(&sample(), &doc! { "$where": "1" }).unwrap_err();
        assert!(matches!(err, StoreError::MalformedRequest(_)));
    }
}
