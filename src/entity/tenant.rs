//! Tenants: the top-level scope other records reference by URN.

use serde::{Deserialize, Serialize};

use super::{Entity, FieldDef};

/// Tenant adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant;

/// A tenant carries nothing beyond identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAttributes {}

impl Entity for Tenant {
    type Attributes = TenantAttributes;

    const ENTITY_TYPE: &'static str = "tenant";
    const TABLE: &'static str = "tenants";
    const COLLECTION: &'static str = "tenants";
    const FIELDS: &'static [FieldDef] = &[];
}
