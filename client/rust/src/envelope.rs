//! Response envelopes shared by server and client.
//!
//! Every response carries a status discriminator and a possibly empty list
//! of structured error details. Record responses add `record`, collection
//! responses add `records`.

use serde::{Deserialize, Serialize};

/// Outcome discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// One structured error: where, what, and which kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorDetail {
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.loc.is_empty() {
            write!(f, "{} ({})", self.msg, self.kind)
        } else {
            write!(f, "{}: {} ({})", self.loc.join("."), self.msg, self.kind)
        }
    }
}

/// Status-only result, used for deletes and for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResult {
    pub status: Status,
    #[serde(default)]
    pub detail: Vec<ErrorDetail>,
}

impl BaseResult {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            detail: Vec::new(),
        }
    }

    pub fn error(detail: Vec<ErrorDetail>) -> Self {
        Self {
            status: Status::Error,
            detail,
        }
    }
}

/// Single-record result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult<T> {
    pub status: Status,
    #[serde(default)]
    pub detail: Vec<ErrorDetail>,
    pub record: Option<T>,
}

impl<T> RecordResult<T> {
    pub fn success(record: T) -> Self {
        Self {
            status: Status::Success,
            detail: Vec::new(),
            record: Some(record),
        }
    }
}

/// Collection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub status: Status,
    #[serde(default)]
    pub detail: Vec<ErrorDetail>,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn success(records: Vec<T>) -> Self {
        Self {
            status: Status::Success,
            detail: Vec::new(),
            records,
        }
    }
}
