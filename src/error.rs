use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::db::DatabaseError;
use crate::i18n::I18n;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    /// Localized validation failure. A bad CPF gets its own message since it
    /// is the error participants hit most.
    pub fn validation(errors: &ValidationErrors, i18n: &I18n) -> Self {
        let fields = errors.field_errors();
        if fields.contains_key("cpf") {
            return AppError::Validation(i18n.get("cpf-invalid"));
        }

        let mut names: Vec<String> = fields.keys().map(|name| name.to_string()).collect();
        names.sort_unstable();
        AppError::Validation(format!("{}: {}", i18n.get("validation-failed"), names.join(", ")))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(err) => match err {
                DatabaseError::NotFound => StatusCode::NOT_FOUND,
                DatabaseError::Duplicate | DatabaseError::CapacityReached | DatabaseError::TooSoon => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AppError::Database(DatabaseError::NotFound) | AppError::NotFound(_) => "Resource not found",
            AppError::Database(DatabaseError::Duplicate) => "Resource already exists",
            AppError::Database(DatabaseError::CapacityReached | DatabaseError::TooSoon) | AppError::Conflict(_) => {
                "Resource conflict"
            }
            AppError::Database(_) => "An internal server error occurred",
            AppError::Authentication(_) => "Authentication failed",
            AppError::Authorization(_) => "Access denied",
            AppError::Validation(_) => "Validation error",
        }
    }

    /// Text safe to show to the caller. Storage failures are logged, not echoed.
    fn details(&self) -> String {
        match self {
            AppError::Database(
                err @ (DatabaseError::NotFound
                | DatabaseError::Duplicate
                | DatabaseError::CapacityReached
                | DatabaseError::TooSoon),
            ) => err.to_string(),
            AppError::Database(_) => self.message().to_string(),
            AppError::Authentication(details)
            | AppError::Authorization(details)
            | AppError::Validation(details)
            | AppError::NotFound(details)
            | AppError::Conflict(details) => details.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "message": self.message(),
                "details": self.details(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_map_to_http_status() {
        assert_eq!(AppError::from(DatabaseError::NotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(DatabaseError::Duplicate).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(DatabaseError::CapacityReached).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::from(DatabaseError::TooSoon).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let err = AppError::from(DatabaseError::Sqlx(sqlx::Error::Protocol("secret handshake".into())));
        assert!(!err.details().contains("secret"));

        let err = AppError::Validation("CPF inválido".into());
        assert_eq!(err.details(), "CPF inválido");
    }
}
