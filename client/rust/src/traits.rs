//! Client trait for resource operations.
//!
//! The CLI command runner is written against this trait, so the same
//! commands drive the HTTP client or a test double.

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::{BaseResult, ListResult, RecordResult};
use crate::error::Result;

/// Equality filters and window for collection requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.offset.is_none() && self.limit.is_none()
    }

    /// Query string pairs, filters first.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Operations on one resource collection.
///
/// Identifiers may be a URN, a surrogate id, or a bare name; the server
/// resolves them.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Collection segment, e.g. `hosts`.
    fn collection(&self) -> &str;

    /// Active records.
    async fn list(&self, query: &ListQuery) -> Result<ListResult<Value>>;

    /// Every version of every record.
    async fn list_history(&self, query: &ListQuery) -> Result<ListResult<Value>>;

    async fn get(&self, identifier: &str) -> Result<RecordResult<Value>>;

    /// Every version of one record.
    async fn history(&self, identifier: &str) -> Result<ListResult<Value>>;

    async fn create(&self, body: &Value) -> Result<RecordResult<Value>>;

    async fn update(&self, identifier: &str, body: &Value) -> Result<RecordResult<Value>>;

    async fn delete(&self, identifier: &str) -> Result<BaseResult>;
}
