use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use dosewise_shared::validation::{FieldError, ValidationErrors};
use dosewise_store::StoreError;

/// Localized message for a registration with a taken e-mail.
pub const EMAIL_TAKEN_MESSAGE: &str = "Este e-mail já está cadastrado";

/// Localized message for sharing twice with the same clinician.
pub const ALREADY_SHARED_MESSAGE: &str = "Você já compartilha seus dados com este médico";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    /// Valid session, but the account has no profile row.
    #[error("Profile not found for user {0}")]
    ProfileMissing(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Clinician asked for a patient who is not sharing with them.
    #[error("No access to this patient's data")]
    NoAccess,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many attempts, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl ServerError {
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Validation(_) => "VALIDATION_FAILED",
            ServerError::Unauthorized | ServerError::InvalidCredentials => "AUTH_REQUIRED",
            ServerError::ProfileMissing(_) => "PROFILE_MISSING",
            ServerError::Forbidden(_) => "FORBIDDEN",
            ServerError::NoAccess => "NO_ACCESS",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Conflict(_) => "CONFLICT",
            ServerError::RateLimited { .. } => "RATE_LIMITED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Unauthorized | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::ProfileMissing(_) | ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Forbidden(_) | ServerError::NoAccess => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::Internal(detail) => {
                tracing::error!(detail, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        let fields = match &self {
            ServerError::Validation(errors) => Some(errors.0.as_slice()),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
                fields,
            },
        };

        let mut response = (self.status(), Json(body)).into_response();
        if let ServerError::RateLimited { retry_after } = &self {
            if let Ok(val) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServerError::NotFound("record not found".into()),
            StoreError::Conflict(rule) => ServerError::Conflict(rule),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.push("email", "invalid e-mail address");
        let (status, json) = body_json(ServerError::Validation(errors)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(json["error"]["fields"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body_json(ServerError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["message"], "An internal error occurred");
        assert!(json["error"].get("fields").is_none());
    }

    #[tokio::test]
    async fn test_localized_conflict_message() {
        let (status, json) =
            body_json(ServerError::Conflict(EMAIL_TAKEN_MESSAGE.to_string())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["message"], EMAIL_TAKEN_MESSAGE);
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(ServerError::from(StoreError::NotFound).code(), "NOT_FOUND");
        assert_eq!(
            ServerError::from(StoreError::Conflict("x".into())).code(),
            "CONFLICT"
        );
        assert_eq!(
            ServerError::from(StoreError::Migration("x".into())).code(),
            "INTERNAL"
        );
    }
}
