//! Filter, ordering and projection semantics for [`MemoryStore`](super::MemoryStore)
//!
//! This is a subset of the MongoDB query language: field equality (with
//! array-contains), `$eq $ne $gt $gte $lt $lte $in $nin $exists`, the logical
//! operators `$and $or $nor`, and dotted paths. Unknown operators never match.

use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};

use super::{SortKey, SortOrder, ID_FIELD};

/// Check whether a document satisfies a filter
pub(crate) fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => sub_filters(condition).is_some_and(|mut fs| fs.all(|f| matches(doc, f))),
        "$or" => sub_filters(condition).is_some_and(|mut fs| fs.any(|f| matches(doc, f))),
        "$nor" => sub_filters(condition).is_some_and(|mut fs| !fs.any(|f| matches(doc, f))),
        path => field_matches(lookup(doc, path), condition),
    })
}

fn sub_filters(condition: &Bson) -> Option<impl Iterator<Item = &Document>> {
    match condition {
        Bson::Array(items) if !items.is_empty() => {
            Some(items.iter().filter_map(Bson::as_document))
        }
        _ => None,
    }
}

/// Resolve a dotted path inside a document
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_operator_document(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> bool {
    match condition {
        Bson::Document(ops) if is_operator_document(ops) => {
            ops.iter().all(|(op, arg)| apply_operator(value, op, arg))
        }
        _ => equals(value, condition),
    }
}

fn apply_operator(value: Option<&Bson>, op: &str, arg: &Bson) -> bool {
    match op {
        "$eq" => equals(value, arg),
        "$ne" => !equals(value, arg),
        "$gt" => ordered(value, arg, |o| o == Ordering::Greater),
        "$gte" => ordered(value, arg, |o| o != Ordering::Less),
        "$lt" => ordered(value, arg, |o| o == Ordering::Less),
        "$lte" => ordered(value, arg, |o| o != Ordering::Greater),
        "$in" => match arg {
            Bson::Array(candidates) => candidates.iter().any(|c| equals(value, c)),
            _ => false,
        },
        "$nin" => match arg {
            Bson::Array(candidates) => !candidates.iter().any(|c| equals(value, c)),
            _ => false,
        },
        "$exists" => truthy(arg) == value.is_some(),
        _ => false,
    }
}

/// Equality with MongoDB's array-contains rule and missing-equals-null
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(v) => values_equal(v, expected),
    }
}

fn ordered(value: Option<&Bson>, arg: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = value else {
        return false;
    };
    let candidates: Vec<&Bson> = match value {
        Bson::Array(items) if !matches!(arg, Bson::Array(_)) => items.iter().collect(),
        other => vec![other],
    };
    candidates
        .into_iter()
        .any(|v| type_rank(v) == type_rank(arg) && accept(compare(v, arg)))
}

pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b) && compare(a, b) == Ordering::Equal
}

/// Canonical type ordering used when values of different types are compared
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 255,
        _ => 12,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

/// Total order over BSON values
pub(crate) fn compare(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Bson::String(x) | Bson::Symbol(x), Bson::String(y) | Bson::Symbol(y)) => x.cmp(y),
        (Bson::Document(x), Bson::Document(y)) => {
            for ((kx, vx), (ky, vy)) in x.iter().zip(y.iter()) {
                let ord = compare(vx, vy).then_with(|| kx.cmp(ky));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Array(x), Bson::Array(y)) => {
            for (vx, vy) in x.iter().zip(y.iter()) {
                let ord = compare(vx, vy);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => compare_numbers(a, b),
    }
}

/// Exact numeric order; NaN sorts below every other number
fn compare_numbers(a: &Bson, b: &Bson) -> Ordering {
    match (as_i64(a), as_i64(b), as_f64(a), as_f64(b)) {
        (Some(x), Some(y), _, _) => x.cmp(&y),
        (Some(x), None, _, Some(y)) => compare_int_double(x, y),
        (None, Some(y), Some(x), _) => compare_int_double(y, x).reverse(),
        (None, None, Some(x), Some(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        },
        _ => Ordering::Equal,
    }
}

fn compare_int_double(int: i64, double: f64) -> Ordering {
    // 2^63; every double in [-2^63, 2^63) truncates to an exact i64
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() {
        return Ordering::Greater;
    }
    if double >= BOUND {
        return Ordering::Less;
    }
    if double < -BOUND {
        return Ordering::Greater;
    }

    let whole = double.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => whole
            .partial_cmp(&double)
            .unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

/// Order two documents by a list of sort keys; missing fields sort as null
pub(crate) fn compare_by_keys(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = lookup(a, &key.field).unwrap_or(&Bson::Null);
        let right = lookup(b, &key.field).unwrap_or(&Bson::Null);
        let ord = match key.order {
            SortOrder::Asc => compare(left, right),
            SortOrder::Desc => compare(right, left),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Apply an inclusion or exclusion projection to top-level fields
///
/// `_id` is kept unless the projection sets it to a falsy value.
pub(crate) fn project(doc: Document, projection: &Document) -> Document {
    let keep_id = projection.get(ID_FIELD).map_or(true, truthy);
    let mut others = projection.iter().filter(|(k, _)| k.as_str() != ID_FIELD);
    let inclusive = match others.next() {
        Some((_, first)) => truthy(first),
        // Only `_id` mentioned: `{_id: 1}` keeps just the id
        None => projection.get(ID_FIELD).is_some_and(truthy),
    };

    doc.into_iter()
        .filter(|(key, _)| {
            if key == ID_FIELD {
                return keep_id;
            }
            match projection.get(key) {
                Some(flag) => inclusive && truthy(flag),
                None => !inclusive,
            }
        })
        .collect()
}
