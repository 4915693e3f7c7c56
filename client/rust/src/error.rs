//! Error types for the Orchestrix client library.

use crate::envelope::ErrorDetail;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error from reqwest.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response from the server.
    #[error("server returned {status}")]
    Api {
        status: u16,
        /// Structured details, empty when the body was not an envelope.
        details: Vec<ErrorDetail>,
        body: String,
    },

    /// Server URL could not be used as a base for resource paths.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// Response body was not the expected envelope.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Input document could not be parsed.
    #[error("invalid document: {0}")]
    Document(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ClientError {
    fn from(err: serde_yaml::Error) -> Self {
        ClientError::Document(err.to_string())
    }
}

impl ClientError {
    /// Returns the error message.
    pub fn message(&self) -> String {
        match self {
            ClientError::Api { details, body, .. } if details.is_empty() => body.clone(),
            ClientError::Api { details, .. } => details
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Returns true if the server rejected the payload.
    pub fn is_validation(&self) -> bool {
        matches!(self.status(), Some(422))
    }

    /// Returns true if this is a connection or transport error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
