//! Hosts: machines registered under a tenant.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::{body_loc, Entity, FieldDef, Reference, Tenant};
use crate::store::FieldError;
use crate::urn::{scoped_discriminator, validate_urn};

/// Host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttributes {
    pub ip: String,
    pub tenant_urn: String,
}

impl Entity for Host {
    type Attributes = HostAttributes;

    const ENTITY_TYPE: &'static str = "host";
    const TABLE: &'static str = "hosts";
    const COLLECTION: &'static str = "hosts";
    const FIELDS: &'static [FieldDef] = &[FieldDef::text("ip"), FieldDef::text("tenant_urn")];
    // Part of the URN discriminator.
    const IMMUTABLE: &'static [&'static str] = &["tenant_urn"];

    fn discriminator(name: &str, attributes: &HostAttributes) -> String {
        scoped_discriminator(Self::ENTITY_TYPE, &attributes.tenant_urn, name)
    }

    fn references(attributes: &HostAttributes) -> Vec<Reference> {
        vec![Reference::to::<Tenant>("tenant_urn", &attributes.tenant_urn)]
    }

    fn validate(_name: &str, attributes: &HostAttributes) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if attributes.ip.parse::<IpAddr>().is_err() {
            errors.push(FieldError::value(
                body_loc("ip"),
                format!("'{}' is not a valid IP address", attributes.ip),
            ));
        }
        if let Err(e) = validate_urn(&attributes.tenant_urn) {
            errors.push(FieldError::value(body_loc("tenant_urn"), e.to_string()));
        }
        errors
    }
}
