//! Versioned store interface.
//!
//! A store is bound to one entity table and keeps every version of every
//! record. Updates append a new version and retire the previous one;
//! deletes retire the current version without a successor. Exactly one
//! version per surrogate id is active at any time.
//!
//! Implementations:
//! - `SqliteVersionedStore`: SQLite storage (sqlx + sea-query)

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

use crate::entity::{Entity, NewRecord, Patch, Record};

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteVersionedStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error kinds carried in [`FieldError::kind`].
pub mod kinds {
    pub const VALUE_ERROR: &str = "value_error";
    pub const REFERENCE_ERROR: &str = "reference_error";
    pub const ALREADY_EXISTS: &str = "already_exist_error";
    pub const MODEL_VALIDATION: &str = "model_validation_error";
    pub const NOT_FOUND: &str = "not_found_error";
    pub const INTERNAL: &str = "internal_error";
}

/// One structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Location path, e.g. `["body", "tenant_urn"]`.
    pub loc: Vec<String>,
    pub msg: String,
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// Field grammar or required-field failure.
    pub fn value(loc: Vec<String>, msg: impl Into<String>) -> Self {
        Self::new(loc, msg, kinds::VALUE_ERROR)
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("NotFound: {entity}({identifier})")]
    NotFound { entity: &'static str, identifier: String },

    #[error("Already Exists: {urn}")]
    AlreadyExists { urn: String },

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Uniqueness violation caught by the storage layer rather than the
    /// pre-write checks, i.e. a lost race.
    #[error("Model failed validation: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored value in column {column}: {value}")]
    InvalidStoredValue { column: &'static str, value: String },
}

impl StoreError {
    /// Single-entry validation error.
    pub fn invalid(loc: Vec<String>, msg: impl Into<String>) -> Self {
        StoreError::Validation(vec![FieldError::value(loc, msg)])
    }

    /// Map an insert failure, separating constraint violations from other
    /// database errors.
    pub fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Integrity(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.loc.join("."), e.msg))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Explicit store configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// URN namespace segment.
    pub namespace: String,
    /// Timezone timestamps are stamped in.
    pub timezone: Tz,
}

impl StoreContext {
    pub fn new(namespace: impl Into<String>, timezone: Tz) -> Self {
        Self {
            namespace: namespace.into(),
            timezone,
        }
    }

    /// Current time in the configured timezone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.timezone).fixed_offset()
    }
}

impl Default for StoreContext {
    fn default() -> Self {
        Self::new("orchestrix", Tz::UTC)
    }
}

/// Equality search over one entity table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub offset: u64,
    pub limit: Option<u64>,
    /// Column name to expected value, parsed per column type.
    pub filters: BTreeMap<String, String>,
    pub only_active: bool,
}

impl SearchQuery {
    pub fn active() -> Self {
        Self {
            only_active: true,
            ..Self::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn window(mut self, offset: u64, limit: Option<u64>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Generic persistence and versioning engine for one entity.
///
/// Identifiers passed to lookups may be a URN, a surrogate id, or a bare
/// name, tried in that order.
#[async_trait]
pub trait VersionedStore<E: Entity>: Send + Sync {
    /// Validate, compute the URN, and insert version 1.
    async fn create(&self, data: NewRecord<E::Attributes>) -> Result<Record<E::Attributes>>;

    /// Current active version for an identifier.
    async fn get(&self, identifier: &str) -> Result<Record<E::Attributes>>;

    /// Like `get`, but absence is `None` instead of an error.
    async fn find(&self, identifier: &str) -> Result<Option<Record<E::Attributes>>>;

    /// Every version of the matched record, ascending by version.
    async fn get_history(&self, identifier: &str) -> Result<Vec<Record<E::Attributes>>>;

    /// Retire the active version and append its successor. Returns the new
    /// active version.
    async fn update(&self, identifier: &str, patch: Patch<E>) -> Result<Record<E::Attributes>>;

    /// Retire the active version without a successor. Returns the retired row.
    async fn delete(&self, identifier: &str) -> Result<Record<E::Attributes>>;

    /// All active rows.
    async fn list_active(&self) -> Result<Vec<Record<E::Attributes>>>;

    /// All rows, active or not.
    async fn list_history(&self) -> Result<Vec<Record<E::Attributes>>>;

    async fn search(&self, query: SearchQuery) -> Result<Vec<Record<E::Attributes>>>;

    /// Field and cross-entity checks run before any write.
    async fn validate_data(&self, name: &str, attributes: &E::Attributes) -> Result<()>;
}
