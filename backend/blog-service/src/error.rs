/// Error types for Blog Service
///
/// Service and handler failures are collected in `AppError`, which maps onto
/// HTTP responses: validation failures carry per-field messages, a non-author
/// edit attempt and a missing session both turn into redirects.
use crate::cache::CacheError;
use crate::db::StoreError;
use crate::forms::FormErrors;
use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Submitted form failed validation
    #[error("Validation error: {0}")]
    Validation(FormErrors),

    /// Unknown group, user, post or follow edge
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not the author of the post they tried to edit
    #[error("User {user_id} is not the author of post {post_id}")]
    NotAuthor { post_id: i64, user_id: i64 },

    /// Route requires a session; `location` is the login redirect
    #[error("Authentication required")]
    Unauthenticated { location: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn form_errors(&self) -> Option<&FormErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FormErrors> for AppError {
    fn from(errors: FormErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotAuthor { .. } | AppError::Unauthenticated { .. } => StatusCode::FOUND,
            AppError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotAuthor { post_id, .. } => HttpResponse::Found()
                .insert_header((header::LOCATION, format!("/posts/{}/", post_id)))
                .finish(),
            AppError::Unauthenticated { location } => HttpResponse::Found()
                .insert_header((header::LOCATION, location.as_str()))
                .finish(),
            AppError::Validation(errors) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "errors": errors,
                "status": StatusCode::BAD_REQUEST.as_u16(),
            })),
            _ => {
                let status = self.status_code();
                if status.is_server_error() {
                    tracing::error!(error = %self, "request failed");
                }
                HttpResponse::build(status).json(serde_json::json!({
                    "error": self.to_string(),
                    "status": status.as_u16(),
                }))
            }
        }
    }
}
