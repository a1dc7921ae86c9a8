//! Update documents
//!
//! An update is parsed into a list of field updates first, then applied to a
//! copy of each matched document. Bare fields are rejected: every top-level
//! key must be one of `$set`, `$unset`, `$inc`, `$addToSet`, `$push`, `$pull`.

use super::filter::{bson_eq, matches};
use crate::driver::{BAD_VALUE_CODE, StoreResult};
use crate::error::StoreError;
use mongodb::bson::{Bson, Document};

const TYPE_MISMATCH_CODE: i32 = 14;
const PATH_NOT_VIABLE_CODE: i32 = 28;
const IMMUTABLE_FIELD_CODE: i32 = 66;

/// A single field-level update operator
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UpdateOp {
    Set(Bson),
    Unset,
    Inc(Bson),
    AddToSet(Vec<Bson>),
    Push(Vec<Bson>),
    Pull(Bson),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldUpdate {
    pub field: String,
    pub op: UpdateOp,
}

/// Parse an update document
pub(crate) fn parse_update(update: &Document) -> StoreResult<Vec<FieldUpdate>> {
    if update.is_empty() {
        return Err(StoreError::MalformedRequest(
            "update document must not be empty".into(),
        ));
    }

    let mut updates = Vec::new();
    for (key, value) in update {
        let Bson::Document(fields) = value else {
            return Err(StoreError::MalformedRequest(format!(
                "Modifiers operate on fields but we found type {:?} instead",
                value.element_type()
            )));
        };
        for (field, operand) in fields {
            let op = match key.as_str() {
                "$set" => UpdateOp::Set(operand.clone()),
                "$unset" => UpdateOp::Unset,
                "$inc" => {
                    if !is_number(operand) {
                        return Err(StoreError::MalformedRequest(format!(
                            "Cannot increment with non-numeric argument: {{{field}: {operand}}}"
                        )));
                    }
                    UpdateOp::Inc(operand.clone())
                }
                "$addToSet" => UpdateOp::AddToSet(each(operand)),
                "$push" => UpdateOp::Push(each(operand)),
                "$pull" => UpdateOp::Pull(operand.clone()),
                k if k.starts_with('$') => {
                    return Err(StoreError::MalformedRequest(format!(
                        "Unknown modifier: {k}"
                    )));
                }
                _ => {
                    return Err(StoreError::MalformedRequest(
                        "update document requires atomic operators".into(),
                    ));
                }
            };
            if field == "_id" || field.starts_with("_id.") {
                return Err(StoreError::OperationFailure {
                    code: IMMUTABLE_FIELD_CODE,
                    message: "Performing an update on the path '_id' would modify the immutable field '_id'".into(),
                });
            }
            updates.push(FieldUpdate {
                field: field.clone(),
                op,
            });
        }
    }
    Ok(updates)
}

/// Values of `{"$each": [...]}` or the single operand
fn each(operand: &Bson) -> Vec<Bson> {
    match operand {
        Bson::Document(d) if d.len() == 1 => match d.get("$each") {
            Some(Bson::Array(items)) => items.clone(),
            _ => vec![operand.clone()],
        },
        _ => vec![operand.clone()],
    }
}

fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

/// Apply parsed updates to a document in place
pub(crate) fn apply_update(doc: &mut Document, updates: &[FieldUpdate]) -> StoreResult<()> {
    for update in updates {
        let creates = !matches!(update.op, UpdateOp::Unset | UpdateOp::Pull(_));
        let Some((parent, leaf)) = parent_mut(doc, &update.field, creates)? else {
            continue;
        };
        match &update.op {
            UpdateOp::Set(value) => {
                parent.insert(leaf, value.clone());
            }
            UpdateOp::Unset => {
                parent.remove(leaf);
            }
            UpdateOp::Inc(amount) => {
                let next = match parent.get(leaf) {
                    None => amount.clone(),
                    Some(current) => add(current, amount).ok_or_else(|| {
                        StoreError::OperationFailure {
                            code: TYPE_MISMATCH_CODE,
                            message: format!(
                                "Cannot apply $inc to a value of non-numeric type at '{}'",
                                update.field
                            ),
                        }
                    })?,
                };
                parent.insert(leaf, next);
            }
            UpdateOp::AddToSet(values) => {
                let items = array_mut(parent, leaf, "$addToSet")?;
                for value in values {
                    if !items.iter().any(|i| bson_eq(i, value)) {
                        items.push(value.clone());
                    }
                }
            }
            UpdateOp::Push(values) => {
                let items = array_mut(parent, leaf, "$push")?;
                items.extend(values.iter().cloned());
            }
            UpdateOp::Pull(condition) => {
                if let Some(Bson::Array(items)) = parent.get_mut(leaf) {
                    let mut kept = Vec::with_capacity(items.len());
                    for item in items.drain(..) {
                        if !pull_matches(&item, condition)? {
                            kept.push(item);
                        }
                    }
                    *items = kept;
                }
            }
        }
    }
    Ok(())
}

fn pull_matches(item: &Bson, condition: &Bson) -> StoreResult<bool> {
    match (item, condition) {
        (Bson::Document(d), Bson::Document(c)) if !c.keys().any(|k| k.starts_with('$')) => {
            matches(d, c)
        }
        (_, Bson::Document(c)) if c.keys().all(|k| k.starts_with('$')) && !c.is_empty() => {
            let wrapped = Document::from_iter([("v".to_string(), item.clone())]);
            matches(&wrapped, &Document::from_iter([("v".to_string(), condition.clone())]))
        }
        _ => Ok(bson_eq(item, condition)),
    }
}

fn array_mut<'a>(
    parent: &'a mut Document,
    leaf: &str,
    op: &str,
) -> StoreResult<&'a mut Vec<Bson>> {
    if !parent.contains_key(leaf) {
        parent.insert(leaf, Bson::Array(Vec::new()));
    }
    match parent.get_mut(leaf) {
        Some(Bson::Array(items)) => Ok(items),
        _ => Err(StoreError::OperationFailure {
            code: BAD_VALUE_CODE,
            message: format!("Cannot apply {op} to non-array field '{leaf}'"),
        }),
    }
}

fn add(current: &Bson, amount: &Bson) -> Option<Bson> {
    let sum = match (current, amount) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(n) => Bson::Int32(n),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a).checked_add(*b)?),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.checked_add(i64::from(*b))?),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b)?),
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Bson::Double(a), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        _ => return None,
    };
    Some(sum)
}

/// Resolve the parent document of a dotted path
///
/// With `create` missing intermediate documents are inserted. Returns `None`
/// when the path does not exist and nothing may be created.
fn parent_mut<'a, 'p>(
    doc: &'a mut Document,
    path: &'p str,
    create: bool,
) -> StoreResult<Option<(&'a mut Document, &'p str)>> {
    let Some((head, rest)) = path.split_once('.') else {
        return Ok(Some((doc, path)));
    };
    if !doc.contains_key(head) {
        if !create {
            return Ok(None);
        }
        doc.insert(head, Document::new());
    }
    match doc.get_mut(head) {
        Some(Bson::Document(child)) => parent_mut(child, rest, create),
        Some(_) if create => Err(StoreError::OperationFailure {
            code: PATH_NOT_VIABLE_CODE,
            message: format!("Cannot create field '{rest}' in element '{head}'"),
        }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn run(doc: &mut Document, update: Document) -> StoreResult<()> {
        let parsed = parse_update(&update)?;
        apply_update(doc, &parsed)
    }

    #[test]
    fn test_set_and_unset() {
        let mut d = doc! { "a": 1, "b": 2 };
        run(&mut d, doc! { "$set": { "a": 5, "c.d": "x" }, "$unset": { "b": "" } }).unwrap();
        assert_eq!(d, doc! { "a": 5, "c": { "d": "x" } });
    }

    #[test]
    fn test_inc() {
        let mut d = doc! { "n": 1 };
        run(&mut d, doc! { "$inc": { "n": 2, "m": 1.5 } }).unwrap();
        assert_eq!(d, doc! { "n": 3, "m": 1.5 });

        let mut d = doc! { "n": "text" };
        let err = run(&mut d, doc! { "$inc": { "n": 1 } }).unwrap_err();
        assert!(matches!(err, StoreError::OperationFailure { code: 14, .. }));
    }

    #[test]
    fn test_add_to_set_push_pull() {
        let mut d = doc! { "tags": ["a"] };
        run(&mut d, doc! { "$addToSet": { "tags": "a" } }).unwrap();
        assert_eq!(d, doc! { "tags": ["a"] });
        run(&mut d, doc! { "$addToSet": { "tags": { "$each": ["b", "a", "c"] } } }).unwrap();
        assert_eq!(d, doc! { "tags": ["a", "b", "c"] });
        run(&mut d, doc! { "$push": { "tags": "a" } }).unwrap();
        assert_eq!(d, doc! { "tags": ["a", "b", "c", "a"] });
        run(&mut d, doc! { "$pull": { "tags": "a" } }).unwrap();
        assert_eq!(d, doc! { "tags": ["b", "c"] });
    }

    #[test]
    fn test_pull_with_condition() {
        let mut d = doc! { "n": [1, 5, 10], "items": [{ "k": 1 }, { "k": 2 }] };
        run(&mut d, doc! { "$pull": { "n": { "$gte": 5 }, "items": { "k": 2 } } }).unwrap();
        assert_eq!(d, doc! { "n": [1], "items": [{ "k": 1 }] });
    }

    #[test]
    fn test_add_to_set_on_scalar_fails() {
        let mut d = doc! { "tags": "a" };
        let err = run(&mut d, doc! { "$addToSet": { "tags": "b" } }).unwrap_err();
        assert!(matches!(
            err,
            StoreError::OperationFailure {
                code: BAD_VALUE_CODE,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_updates() {
        assert!(matches!(
            parse_update(&doc! {}),
            Err(StoreError::MalformedRequest(_))
        ));
        assert!(matches!(
            parse_update(&doc! { "name": "x" }),
            Err(StoreError::MalformedRequest(_))
        ));
        assert!(matches!(
            parse_update(&doc! { "$rename": { "a": "b" } }),
            Err(StoreError::MalformedRequest(_))
        ));
        assert!(matches!(
            parse_update(&doc! { "$set": { "_id": 1 } }),
            Err(StoreError::OperationFailure { code: 66, .. })
        ));
    }
}
