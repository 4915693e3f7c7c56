//! Entity schema contract.
//!
//! Every managed resource is described by an [`Entity`] adapter: its table
//! binding, URN entity type, attribute columns and immutable fields. The
//! versioned store and the endpoint binder are generic over this trait, so
//! adding a resource means writing one adapter and nothing else.

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::FieldError;

pub mod host;
pub mod oauth_client;
pub mod tenant;
pub mod user;
pub mod view;

pub use host::{Host, HostAttributes};
pub use oauth_client::{OAuthClient, OAuthClientAttributes};
pub use tenant::{Tenant, TenantAttributes};
pub use user::{User, UserAttributes, UserState};
pub use view::{Patch, Schema};

/// Fields managed by the store. Never accepted from callers.
pub const INTERNAL_FIELDS: &[&str] = &[
    "urn",
    "row_id",
    "surrogate_id",
    "created",
    "modified",
    "deleted",
    "version",
    "active",
];

/// Fields that can never change after creation, for every entity.
pub const CORE_IMMUTABLE_FIELDS: &[&str] = &["name"];

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
}

impl FieldKind {
    /// SQL column type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::Boolean => "BOOLEAN",
        }
    }
}

/// Column description for one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    /// Omitted values take a default on create.
    pub defaulted: bool,
}

impl FieldDef {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            nullable: false,
            defaulted: false,
        }
    }

    pub const fn optional_text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            nullable: true,
            defaulted: false,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            nullable: false,
            defaulted: false,
        }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Boolean,
            nullable: false,
            defaulted: false,
        }
    }

    const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn with_default(mut self) -> Self {
        self.defaulted = true;
        self
    }

    /// Whether a create payload must carry this field.
    pub const fn is_required(&self) -> bool {
        !self.nullable && !self.defaulted
    }
}

/// Identity and audit columns shared by every entity table, in column order.
pub const CORE_FIELDS: &[FieldDef] = &[
    FieldDef::text("row_id"),
    FieldDef::text("surrogate_id"),
    FieldDef::text("urn"),
    FieldDef::text("name"),
    FieldDef::text("created"),
    FieldDef::text("modified"),
    FieldDef::text("deleted").nullable(),
    FieldDef::integer("version"),
    FieldDef::boolean("active"),
];

/// A write-time reference from one record to another entity's active record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Attribute holding the reference, used as the error location.
    pub field: &'static str,
    /// Table of the referenced entity.
    pub table: &'static str,
    /// URN that must resolve to an active record.
    pub urn: String,
}

impl Reference {
    pub fn to<E: Entity>(field: &'static str, urn: impl Into<String>) -> Self {
        Self {
            field,
            table: E::TABLE,
            urn: urn.into(),
        }
    }
}

/// Per-entity adapter consumed by the generic store and endpoint binder.
pub trait Entity: Send + Sync + 'static {
    /// Entity-specific attributes (everything beyond identity and audit).
    type Attributes: Serialize
        + DeserializeOwned
        + Clone
        + PartialEq
        + std::fmt::Debug
        + Send
        + Sync
        + 'static;

    /// URN entity-type segment, e.g. `host`.
    const ENTITY_TYPE: &'static str;

    /// Physical table name.
    const TABLE: &'static str;

    /// Network collection segment, e.g. `hosts`.
    const COLLECTION: &'static str;

    /// Attribute columns, matching the serialized shape of `Attributes`.
    const FIELDS: &'static [FieldDef];

    /// Attributes that cannot be updated, in addition to `name`.
    const IMMUTABLE: &'static [&'static str] = &[];

    /// URN discriminator for a record with this name and attributes.
    fn discriminator(name: &str, _attributes: &Self::Attributes) -> String {
        name.to_string()
    }

    /// Other records that must exist and be active when this one is written.
    fn references(_attributes: &Self::Attributes) -> Vec<Reference> {
        Vec::new()
    }

    /// Field-level checks beyond what deserialization enforces.
    fn validate(_name: &str, _attributes: &Self::Attributes) -> Vec<FieldError> {
        Vec::new()
    }
}

/// One physical row: one version of a logical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<A> {
    pub row_id: Uuid,
    pub surrogate_id: Uuid,
    pub urn: String,
    pub name: String,
    pub created: DateTime<FixedOffset>,
    pub modified: DateTime<FixedOffset>,
    pub deleted: Option<DateTime<FixedOffset>>,
    pub version: i64,
    pub active: bool,
    #[serde(flatten)]
    pub attributes: A,
}

/// Create-view payload: the name plus entity attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord<A> {
    pub name: String,
    #[serde(flatten)]
    pub attributes: A,
}

impl<A> NewRecord<A> {
    pub fn new(name: impl Into<String>, attributes: A) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }
}

/// Location path for an attribute in a request body.
pub(crate) fn body_loc(field: &str) -> Vec<String> {
    vec!["body".to_string(), field.to_string()]
}
