//! Document identifiers parsed from URL path segments
//!
//! A path segment is classified into one of three representations:
//!
//! - **ObjectId**: the segment hex-decodes to exactly 12 bytes (24 hex characters)
//! - **Int**: otherwise, the segment parses as a base-10 `i64`
//! - **Str**: anything else, kept verbatim
//!
//! The empty segment is rejected.
//!
//! # Example
//!
//! ```rust
//! use mongo_rest::id::DocumentId;
//!
//! let id = DocumentId::parse("5f1d7f3c9b1e8a2d4c6b0a19").unwrap();
//! assert!(matches!(id, DocumentId::ObjectId(_)));
//!
//! assert_eq!(DocumentId::parse("42").unwrap(), DocumentId::Int(42));
//! assert_eq!(DocumentId::parse("alice").unwrap(), DocumentId::Str("alice".to_string()));
//! assert!(DocumentId::parse("").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use mongodb::bson::{oid::ObjectId, Bson};
use thiserror::Error;

/// Error returned when a path segment cannot be used as an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid _id")]
pub struct InvalidIdentifier;

/// Identifier of a single document, as taken from the request path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    /// 12-byte binary object id
    ObjectId(ObjectId),
    /// Signed integer id
    Int(i64),
    /// Opaque string id
    Str(String),
}

impl DocumentId {
    /// Classify a path segment
    ///
    /// Hex decoding is tried first, so a 24-digit decimal string is an
    /// object id, not an integer.
    pub fn parse(segment: &str) -> Result<Self, InvalidIdentifier> {
        if let Ok(oid) = ObjectId::parse_str(segment) {
            return Ok(Self::ObjectId(oid));
        }
        if segment.is_empty() {
            return Err(InvalidIdentifier);
        }
        match segment.parse::<i64>() {
            Ok(n) => Ok(Self::Int(n)),
            Err(_) => Ok(Self::Str(segment.to_string())),
        }
    }

    /// BSON value used in `{"_id": ...}` lookups
    ///
    /// Integers that fit are stored as Int32 so they compare equal to ids
    /// inserted from JSON bodies.
    #[must_use]
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::ObjectId(oid) => Bson::ObjectId(*oid),
            Self::Int(n) => match i32::try_from(*n) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(*n),
            },
            Self::Str(s) => Bson::String(s.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for DocumentId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        id.to_bson()
    }
}
