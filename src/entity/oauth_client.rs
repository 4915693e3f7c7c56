//! OAuth clients registered under a tenant.

use serde::{Deserialize, Serialize};

use super::{body_loc, Entity, FieldDef, Reference, Tenant};
use crate::store::FieldError;
use crate::urn::{scoped_discriminator, validate_urn};

/// OAuth client adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OAuthClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClientAttributes {
    pub tenant_urn: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Entity for OAuthClient {
    type Attributes = OAuthClientAttributes;

    // The URN type segment admits no underscore.
    const ENTITY_TYPE: &'static str = "oauthclient";
    const TABLE: &'static str = "oauth_clients";
    const COLLECTION: &'static str = "oauthclients";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::text("tenant_urn"),
        FieldDef::text("client_id"),
        FieldDef::text("client_secret"),
    ];
    const IMMUTABLE: &'static [&'static str] = &["tenant_urn"];

    fn discriminator(name: &str, attributes: &OAuthClientAttributes) -> String {
        scoped_discriminator(Self::ENTITY_TYPE, &attributes.tenant_urn, name)
    }

    fn references(attributes: &OAuthClientAttributes) -> Vec<Reference> {
        vec![Reference::to::<Tenant>("tenant_urn", &attributes.tenant_urn)]
    }

    fn validate(_name: &str, attributes: &OAuthClientAttributes) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = validate_urn(&attributes.tenant_urn) {
            errors.push(FieldError::value(body_loc("tenant_urn"), e.to_string()));
        }
        if attributes.client_id.trim().is_empty() {
            errors.push(FieldError::value(body_loc("client_id"), "client_id cannot be empty"));
        }
        errors
    }
}
