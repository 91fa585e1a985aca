//! Conversion between JSON payloads and stored BSON documents
//!
//! Request bodies and query parameters arrive as JSON and are stored as BSON.
//! The conversion is plain: no extended-JSON keys (`$oid`, `$date`, ...) are
//! interpreted on the way in, so a body is stored exactly as written.
//!
//! On the way out, object ids are rendered as 24-character hex strings and
//! integers stay integers, which gives responses such as
//! `{"_id":"507f1f77bcf86cd799439011","foo":"bar"}`.

use mongodb::bson::{Bson, Document};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Error produced when a JSON payload cannot become a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The payload is not valid JSON
    #[error("{0}")]
    Syntax(String),

    /// The payload is valid JSON but not an object
    #[error("document must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Decode raw bytes into a document
///
/// # Example
///
/// ```rust
/// use mongo_rest::document::decode_document;
///
/// let doc = decode_document(br#"{"foo":"bar","n":1}"#).unwrap();
/// assert_eq!(doc.get_str("foo").unwrap(), "bar");
/// assert_eq!(doc.get_i32("n").unwrap(), 1);
/// ```
pub fn decode_document(bytes: &[u8]) -> Result<Document, DocumentError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DocumentError::Syntax(e.to_string()))?;
    json_to_document(value)
}

/// Decode a JSON string into a document (used for `query` and `select`)
pub fn parse_document(text: &str) -> Result<Document, DocumentError> {
    decode_document(text.as_bytes())
}

/// Convert a JSON object into a document
pub fn json_to_document(value: Value) -> Result<Document, DocumentError> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, json_to_bson(value)))
            .collect()),
        other => Err(DocumentError::NotAnObject(json_type_name(&other))),
    }
}

/// Convert any JSON value into BSON
///
/// Integers become Int32 when they fit and Int64 otherwise. Numbers outside
/// the `i64` range become doubles.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => number_to_bson(&n),
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(key, value)| (key, json_to_bson(value)))
                .collect(),
        ),
    }
}

fn number_to_bson(n: &Number) -> Bson {
    if let Some(i) = n.as_i64() {
        return match i32::try_from(i) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(i),
        };
    }
    Bson::Double(n.as_f64().unwrap_or(f64::NAN))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a stored document into JSON for a response
pub fn document_to_json(doc: Document) -> Value {
    let map: Map<String, Value> = doc
        .into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect();
    Value::Object(map)
}

/// Convert a BSON value into JSON
///
/// Types without a natural JSON form fall back to relaxed extended JSON.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        Bson::String(s) | Bson::Symbol(s) => Value::String(s),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => document_to_json(doc),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn test_decode_object() {
        let doc = decode_document(br#"{"_id":1,"foo":"bar","nested":{"a":[1,2.5,null]}}"#)
            .unwrap();
        assert_eq!(
            doc,
            doc! {"_id": 1_i32, "foo": "bar", "nested": {"a": [1_i32, 2.5, Bson::Null]}}
        );
    }

    #[test]
    fn test_key_order_preserved() {
        let doc = decode_document(br#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_large_integer_is_int64() {
        let doc = decode_document(br#"{"n":4294967296}"#).unwrap();
        assert_eq!(doc.get("n"), Some(&Bson::Int64(4_294_967_296)));
    }

    #[test]
    fn test_syntax_error_message() {
        let err = decode_document(b"string").unwrap_err();
        assert!(matches!(err, DocumentError::Syntax(_)));
        assert!(err.to_string().contains("expected"));
    }

    #[test]
    fn test_trailing_characters_rejected() {
        let err = decode_document(br#"{"foo":"bar"}}"#).unwrap_err();
        assert!(matches!(err, DocumentError::Syntax(_)));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = decode_document(b"[1,2]").unwrap_err();
        assert_eq!(err, DocumentError::NotAnObject("array"));
    }

    #[test]
    fn test_extended_json_not_interpreted() {
        let doc = parse_document(r#"{"_id":{"$oid":"507f1f77bcf86cd799439011"}}"#).unwrap();
        assert!(matches!(doc.get("_id"), Some(Bson::Document(_))));
    }

    #[test]
    fn test_object_id_rendered_as_hex() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let value = document_to_json(doc! {"_id": oid, "foo": "bar"});
        assert_eq!(value, json!({"_id": "507f1f77bcf86cd799439011", "foo": "bar"}));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"_id":"507f1f77bcf86cd799439011","foo":"bar"}"#
        );
    }

    #[test]
    fn test_numbers_rendered_natively() {
        let value = document_to_json(doc! {"a": 1_i32, "b": 2_i64, "c": 1.5});
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"a":1,"b":2,"c":1.5}"#);
    }

    #[test]
    fn test_datetime_rendered_as_rfc3339() {
        let dt = mongodb::bson::DateTime::from_millis(0);
        assert_eq!(
            bson_to_json(Bson::DateTime(dt)),
            json!("1970-01-01T00:00:00Z")
        );
    }
}
