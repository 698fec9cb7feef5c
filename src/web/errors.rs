//! HTTP error surface. Every failure renders as `{ "detail": ... }` with the
//! matching status code; 409 responses may carry extra context (the conflict
//! report for calendar collisions).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String, Option<Value>),

    #[error("{0}")]
    Unprocessable(String),

    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_, _) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Internal(source) => {
                error!(error = %source, "request failed");
                json!({ "detail": "internal server error" })
            }
            ApiError::Conflict(detail, Some(context)) => {
                let mut body = json!({ "detail": detail });
                if let (Some(obj), Some(ctx)) = (body.as_object_mut(), context.as_object()) {
                    for (k, v) in ctx {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                body
            }
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<crate::error::TeamflowError> for ApiError {
    fn from(err: crate::error::TeamflowError) -> Self {
        match err {
            crate::error::TeamflowError::Validation(msg) => ApiError::Unprocessable(msg),
            crate::error::TeamflowError::Database(e) => e.into(),
            other => ApiError::Internal(other.into()),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_the_conventional_codes() {
        // Time-ordering problems are 400, schedule collisions 409,
        // malformed payloads 422.
        let cases = [
            (
                ApiError::BadRequest("meeting must end after it starts".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into(), None), StatusCode::CONFLICT),
            (
                ApiError::Unprocessable("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status(), expected);
        }
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }
}
