//! Mapping from registry outcomes to HTTP responses.

use api_shared::{DetailRes, ValidationErrorItem, ValidationErrorRes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use registry_core::{RegistryError, PATIENT_NOT_FOUND};

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// 422 with one item per violated field or parameter.
    Validation(Vec<ValidationErrorItem>),
    /// 404 with a fixed message.
    NotFound(&'static str),
    /// 500. Details are logged, never returned.
    Internal,
}

impl ApiError {
    pub fn patient_not_found() -> Self {
        Self::NotFound(PATIENT_NOT_FOUND)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(violations) => ApiError::Validation(
                violations
                    .as_slice()
                    .iter()
                    .map(ValidationErrorItem::from_body_violation)
                    .collect(),
            ),
            other => {
                tracing::error!("Registry error: {:?}", other);
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::Validation(detail) => {
                (status, Json(ValidationErrorRes { detail })).into_response()
            }
            ApiError::NotFound(message) => (
                status,
                Json(DetailRes {
                    detail: message.into(),
                }),
            )
                .into_response(),
            ApiError::Internal => (
                status,
                Json(DetailRes {
                    detail: "Internal server error".into(),
                }),
            )
                .into_response(),
        }
    }
}
