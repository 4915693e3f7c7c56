//! Canonical resource names and identifiers.
//!
//! A URN has the shape `urn:<namespace>:<entity-type>:<discriminator>`. The
//! discriminator is usually the record name, or a composite such as
//! `host(urn:orchestrix:tenant:acme,web01)` for records scoped under a parent.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

/// Maximum length of a record name.
pub const MAX_NAME_LEN: usize = 64;
/// Maximum length of a URN.
pub const MAX_URN_LEN: usize = 128;
/// Length of a hyphenated UUID, the only form accepted as a surrogate id.
const HYPHENATED_UUID_LEN: usize = 36;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9_]+$").expect("name pattern is a valid regex")
});

static URN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^urn:[a-z0-9][a-z0-9-]{0,31}:[a-z0-9]+:[a-z0-9_():,]+$")
        .expect("urn pattern is a valid regex")
});

/// Grammar violations for names and URNs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrnError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name can only contain lowercase letters, numbers, and underscores")]
    InvalidName,

    #[error("Name cannot be longer than {MAX_NAME_LEN} characters")]
    NameTooLong,

    #[error("URN cannot be empty")]
    EmptyUrn,

    #[error("URN is not valid")]
    InvalidUrn,

    #[error("URN cannot be longer than {MAX_URN_LEN} characters")]
    UrnTooLong,
}

/// Validate a short machine name (`^[a-z0-9_]{1,64}$`).
pub fn validate_name(name: &str) -> Result<&str, UrnError> {
    if name.is_empty() {
        return Err(UrnError::EmptyName);
    }
    if !NAME_RE.is_match(name) {
        return Err(UrnError::InvalidName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(UrnError::NameTooLong);
    }
    Ok(name)
}

/// Validate a URN against the canonical grammar.
pub fn validate_urn(urn: &str) -> Result<&str, UrnError> {
    if urn.is_empty() {
        return Err(UrnError::EmptyUrn);
    }
    if !URN_RE.is_match(urn) {
        return Err(UrnError::InvalidUrn);
    }
    if urn.len() > MAX_URN_LEN {
        return Err(UrnError::UrnTooLong);
    }
    Ok(urn)
}

/// Build a URN from its parts. The result is not validated; callers that
/// persist it run it through [`validate_urn`].
pub fn format_urn(namespace: &str, entity_type: &str, discriminator: &str) -> String {
    format!("urn:{}:{}:{}", namespace, entity_type, discriminator)
}

/// Discriminator for a record scoped under a parent record.
pub fn scoped_discriminator(entity_type: &str, parent_urn: &str, name: &str) -> String {
    format!("{}({},{})", entity_type, parent_urn, name)
}

/// A caller-supplied reference to a record.
///
/// Resolution order is URN, then surrogate id, then bare name, because
/// API and CLI callers use the three forms interchangeably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Urn(String),
    SurrogateId(Uuid),
    Name(String),
}

impl Identifier {
    /// Classify a raw identifier string.
    pub fn parse(raw: &str) -> Self {
        if validate_urn(raw).is_ok() {
            return Identifier::Urn(raw.to_string());
        }
        // Only the hyphenated form. The 32-digit simple form is also a
        // valid name and falls through to a name match.
        if raw.len() == HYPHENATED_UUID_LEN {
            if let Ok(id) = Uuid::parse_str(raw) {
                return Identifier::SurrogateId(id);
            }
        }
        Identifier::Name(raw.to_string())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Urn(urn) => write!(f, "{}", urn),
            Identifier::SurrogateId(id) => write!(f, "{}", id),
            Identifier::Name(name) => write!(f, "{}", name),
        }
    }
}
