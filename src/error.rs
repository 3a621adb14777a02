// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::models::ValidationError;
use crate::database::StoreError;
use crate::provider::ProviderError;
use crate::services::prekeys::PreKeyError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 500, kept distinct so clients can tell a failed bundle write apart
    BundleRegistrationFailed,

    // 503 Service Unavailable
    ServiceUnavailable(String),

    // 503, identity generation ran out of attempts
    IdentityExhausted,
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BundleRegistrationFailed => 500,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::IdentityExhausted => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BundleRegistrationFailed => "Failed to register pre-key bundle",
            ApiError::ServiceUnavailable(msg) => msg,
            ApiError::IdentityExhausted => "Could not allocate a unique identity, please retry",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            response["field_errors"] = json!(field_errors);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BundleRegistrationFailed => "BUNDLE_REGISTRATION_FAILED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::IdentityExhausted => "IDENTITY_EXHAUSTED",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// Map a provider failure for a passthrough endpoint. A refusal becomes
    /// `on_rejected`; anything else is an internal error.
    pub fn from_provider(err: ProviderError, on_rejected: ApiError) -> Self {
        match err {
            ProviderError::Rejected { .. } => on_rejected,
            other => {
                tracing::error!("Identity provider error: {}", other);
                ApiError::internal_server_error("Identity provider request failed")
            }
        }
    }
}

// Convert other error types to ApiError
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let field_errors = err.field_errors();
        match err {
            ValidationError::Malformed(msg) => ApiError::invalid_json(msg),
            other @ (ValidationError::UnknownCategory(_)
            | ValidationError::UnknownIndex(_)
            | ValidationError::EmptyPatch) => ApiError::bad_request(other.to_string()),
            other => ApiError::validation_error(other.to_string(), field_errors),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::RegistrationFailed(msg) => {
                tracing::error!("Bundle registration failed: {}", msg);
                ApiError::BundleRegistrationFailed
            }
            StoreError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StoreError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            StoreError::Decode(e) => {
                tracing::error!("Row decode error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                match sqlx_err {
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                        ApiError::service_unavailable("Database temporarily unavailable")
                    }
                    _ => ApiError::internal_server_error("Database error occurred"),
                }
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ProviderUnavailable(msg) => {
                tracing::error!("Token verification failed: {}", msg);
                ApiError::service_unavailable("Identity provider unavailable")
            }
            AuthError::Internal(msg) => {
                tracing::error!("Authentication error: {}", msg);
                ApiError::internal_server_error("Authentication error")
            }
            other => {
                tracing::warn!("Rejected request: {}", other);
                ApiError::unauthorized(other.to_string())
            }
        }
    }
}

impl From<PreKeyError> for ApiError {
    fn from(err: PreKeyError) -> Self {
        match err {
            PreKeyError::Invalid(e) => e.into(),
            PreKeyError::IdentityExhausted(attempts) => {
                tracing::error!("No unique identity after {} attempts", attempts);
                ApiError::IdentityExhausted
            }
            PreKeyError::Store(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn envelope_shape() {
        let (status, body) = body_of(ApiError::not_found("No journal_entries entry with id 9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "No journal_entries entry with id 9");
    }

    #[tokio::test]
    async fn validation_errors_carry_field_detail() {
        let err: ApiError = ValidationError::ReservedField("user_id".to_string()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["user_id"].is_string());
    }

    #[tokio::test]
    async fn store_internals_are_not_exposed() {
        let err: ApiError = StoreError::QueryError("syntax error at or near".to_string()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().contains("syntax"));
    }

    #[test]
    fn prekey_failures_map_to_distinct_codes() {
        let exhausted: ApiError = PreKeyError::IdentityExhausted(5).into();
        assert_eq!(exhausted.status_code(), 503);
        assert_eq!(exhausted.error_code(), "IDENTITY_EXHAUSTED");

        let failed: ApiError = PreKeyError::Store(StoreError::RegistrationFailed("fk".to_string())).into();
        assert_eq!(failed.status_code(), 500);
        assert_eq!(failed.error_code(), "BUNDLE_REGISTRATION_FAILED");
    }

    #[test]
    fn provider_rejection_uses_caller_mapping() {
        let rejected = ProviderError::Rejected {
            status: 400,
            body: Value::Null,
        };
        let err = ApiError::from_provider(rejected, ApiError::unauthorized("Login failed"));
        assert_eq!(err.status_code(), 401);

        let broken = ProviderError::InvalidResponse("eof".to_string());
        assert_eq!(ApiError::from_provider(broken, ApiError::unauthorized("x")).status_code(), 500);
    }
}
