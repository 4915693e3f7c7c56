//! Users, optionally scoped to a tenant.

use serde::{Deserialize, Serialize};

use super::{body_loc, Entity, FieldDef, Reference, Tenant};
use crate::store::FieldError;
use crate::urn::{scoped_discriminator, validate_urn};

/// User adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User;

/// Account lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    #[default]
    Pending,
    Active,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttributes {
    #[serde(default)]
    pub tenant_urn: Option<String>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub state: UserState,
}

impl Entity for User {
    type Attributes = UserAttributes;

    const ENTITY_TYPE: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLLECTION: &'static str = "users";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::optional_text("tenant_urn"),
        FieldDef::text("username"),
        FieldDef::text("email"),
        FieldDef::text("password_hash"),
        FieldDef::text("state").with_default(),
    ];
    const IMMUTABLE: &'static [&'static str] = &["tenant_urn"];

    fn discriminator(name: &str, attributes: &UserAttributes) -> String {
        match &attributes.tenant_urn {
            Some(tenant_urn) => scoped_discriminator(Self::ENTITY_TYPE, tenant_urn, name),
            None => name.to_string(),
        }
    }

    fn references(attributes: &UserAttributes) -> Vec<Reference> {
        attributes
            .tenant_urn
            .iter()
            .map(|urn| Reference::to::<Tenant>("tenant_urn", urn))
            .collect()
    }

    fn validate(_name: &str, attributes: &UserAttributes) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(tenant_urn) = &attributes.tenant_urn {
            if let Err(e) = validate_urn(tenant_urn) {
                errors.push(FieldError::value(body_loc("tenant_urn"), e.to_string()));
            }
        }
        if attributes.username.trim().is_empty() {
            errors.push(FieldError::value(body_loc("username"), "username cannot be empty"));
        }
        if !attributes.email.contains('@') {
            errors.push(FieldError::value(
                body_loc("email"),
                format!("'{}' is not an email address", attributes.email),
            ));
        }
        errors
    }
}
