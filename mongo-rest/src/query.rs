//! Translation of list-request query strings into store queries
//!
//! | parameter | meaning                                   | when unparseable |
//! |-----------|-------------------------------------------|------------------|
//! | `query`   | JSON filter document                      | match all        |
//! | `limit`   | maximum number of documents               | ignored          |
//! | `skip`    | number of documents to skip               | ignored          |
//! | `count`   | any non-empty value returns a count       | n/a              |
//! | `sort`    | field names, `-field` for descending      | n/a              |
//! | `select`  | JSON projection document                  | ignored          |
//!
//! For every parameter except `sort` the first non-empty value wins. `sort`
//! collects all values, and each value may itself be a comma-separated list.
//!
//! # Example
//!
//! ```rust
//! use mongo_rest::query::{ListParams, ListPlan};
//! use mongodb::bson::doc;
//!
//! let params = ListParams::from_pairs(vec![
//!     ("query".to_string(), r#"{"foo":"bar"}"#.to_string()),
//!     ("sort".to_string(), "-_id".to_string()),
//!     ("limit".to_string(), "3".to_string()),
//! ]);
//!
//! let ListPlan::Fetch(query) = params.into_plan() else {
//!     panic!("expected a fetch plan");
//! };
//! assert_eq!(query.filter, doc! {"foo": "bar"});
//! assert_eq!(query.limit, Some(3));
//! ```

use mongodb::bson::Document;

use crate::document::parse_document;
use crate::store::{FindQuery, SortKey};

/// Raw list parameters, before interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub query: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub count: Option<String>,
    pub sort: Vec<String>,
    pub select: Option<String>,
}

/// What a list request should do
#[derive(Debug, Clone, PartialEq)]
pub enum ListPlan {
    /// Return the number of matching documents
    Count(FindQuery),
    /// Return the matching documents
    Fetch(FindQuery),
}

impl ListPlan {
    /// The query either plan runs
    pub fn query(&self) -> &FindQuery {
        match self {
            Self::Count(query) | Self::Fetch(query) => query,
        }
    }
}

impl ListParams {
    /// Collect parameters from decoded query-string pairs
    ///
    /// Unknown keys are ignored. Empty values count as absent.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "query" => &mut params.query,
                "limit" => &mut params.limit,
                "skip" => &mut params.skip,
                "count" => &mut params.count,
                "select" => &mut params.select,
                "sort" => {
                    params.sort.push(value);
                    continue;
                }
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    /// Build the plan: filter, limit and skip first, then the count decision,
    /// then sort and projection for fetches only
    pub fn into_plan(self) -> ListPlan {
        let mut query = FindQuery::new();

        if let Some(filter) = self.query.as_deref().and_then(parse_json_document) {
            query = query.with_filter(filter);
        }
        if let Some(limit) = self.limit.as_deref().and_then(|l| l.trim().parse::<i64>().ok()) {
            query = query.with_limit(limit);
        }
        if let Some(skip) = self.skip.as_deref().and_then(|s| s.trim().parse::<u64>().ok()) {
            query = query.with_skip(skip);
        }

        if self.count.is_some() {
            return ListPlan::Count(query);
        }

        let sort: Vec<SortKey> = self
            .sort
            .iter()
            .flat_map(|value| value.split(','))
            .filter_map(SortKey::parse)
            .collect();
        if !sort.is_empty() {
            query = query.with_sort(sort);
        }

        if let Some(projection) = self.select.as_deref().and_then(parse_json_document) {
            query = query.with_projection(projection);
        }

        ListPlan::Fetch(query)
    }
}

fn parse_json_document(text: &str) -> Option<Document> {
    match parse_document(text) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable query parameter");
            None
        }
    }
}
