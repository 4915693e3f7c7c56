//! Store errors rendered as error envelopes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrix_client::{BaseResult, ErrorDetail};
use tracing::error;

use crate::store::{kinds, FieldError, StoreError};

/// Error response: an HTTP status plus structured details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: Vec<ErrorDetail>,
}

impl ApiError {
    /// 422 with one `value_error` detail.
    pub fn invalid(loc: Vec<String>, msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: vec![ErrorDetail::new(loc, msg, kinds::VALUE_ERROR)],
        }
    }

    /// 422 with one `field required` detail per missing body field.
    pub fn missing(fields: &[&str]) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: fields
                .iter()
                .map(|field| {
                    ErrorDetail::new(
                        vec!["body".to_string(), field.to_string()],
                        "field required",
                        kinds::VALUE_ERROR,
                    )
                })
                .collect(),
        }
    }

    /// 422 for a request body that does not deserialize into the create view.
    pub fn from_body(err: serde_json::Error) -> Self {
        Self::invalid(vec!["body".to_string()], err.to_string())
    }
}

fn detail(err: FieldError) -> ErrorDetail {
    ErrorDetail::new(err.loc, err.msg, err.kind)
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                detail: vec![ErrorDetail::new(
                    vec!["path".to_string(), "identifier".to_string()],
                    message,
                    kinds::NOT_FOUND,
                )],
            },
            StoreError::AlreadyExists { .. } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: vec![ErrorDetail::new(
                    vec!["body".to_string()],
                    message,
                    kinds::ALREADY_EXISTS,
                )],
            },
            StoreError::Validation(errors) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: errors.into_iter().map(detail).collect(),
            },
            StoreError::Integrity(_) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: vec![ErrorDetail::new(
                    vec!["body".to_string()],
                    message,
                    kinds::MODEL_VALIDATION,
                )],
            },
            other => {
                error!(error = %other, "storage failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: vec![ErrorDetail::new(
                        Vec::new(),
                        "internal server error",
                        kinds::INTERNAL,
                    )],
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(BaseResult::error(self.detail))).into_response()
    }
}
