//! API error handling
//!
//! Every failure a client can observe is one `AppError` variant with a fixed
//! status code and a stable `code` string. Operational errors are expected and
//! are not logged as faults; `Internal` is logged and its detail withheld.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use exploria_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// `fail` for client errors, `error` for server errors
    pub status: String,
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let status = if status.is_server_error() { "error" } else { "fail" };
        Self {
            status: status.to_string(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please provide email and password")]
    MissingCredentials,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Passwords do not match")]
    SecretConfirmationMismatch,

    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("There is no account with that email address")]
    AccountNotFound,

    #[error("Reset token is invalid or has expired")]
    ResetTokenInvalidOrExpired,

    #[error("Your current password is wrong")]
    CurrentSecretIncorrect,

    #[error("You are not logged in. Please log in to get access")]
    NoCredentialsSupplied,

    #[error("Session token is invalid or has expired. Please log in again")]
    InvalidOrExpiredToken,

    #[error("The account belonging to this token no longer exists")]
    AccountNoLongerExists,

    #[error("Password was changed after this token was issued. Please log in again")]
    SecretChangedSinceIssuance,

    #[error("You do not have permission to perform this action")]
    InsufficientRole,

    #[error("There was an error sending the email. Try again later")]
    DeliveryFailed,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredentials
            | AppError::SecretConfirmationMismatch
            | AppError::ResetTokenInvalidOrExpired
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::CurrentSecretIncorrect
            | AppError::NoCredentialsSupplied
            | AppError::InvalidOrExpiredToken
            | AppError::AccountNoLongerExists
            | AppError::SecretChangedSinceIssuance => StatusCode::UNAUTHORIZED,
            AppError::InsufficientRole => StatusCode::FORBIDDEN,
            AppError::AccountNotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::DeliveryFailed | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCredentials => "MISSING_CREDENTIALS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::SecretConfirmationMismatch => "PASSWORD_CONFIRMATION_MISMATCH",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            AppError::ResetTokenInvalidOrExpired => "RESET_TOKEN_INVALID",
            AppError::CurrentSecretIncorrect => "CURRENT_PASSWORD_INCORRECT",
            AppError::NoCredentialsSupplied => "NOT_LOGGED_IN",
            AppError::InvalidOrExpiredToken => "INVALID_TOKEN",
            AppError::AccountNoLongerExists => "ACCOUNT_NO_LONGER_EXISTS",
            AppError::SecretChangedSinceIssuance => "PASSWORD_CHANGED",
            AppError::InsufficientRole => "FORBIDDEN",
            AppError::DeliveryFailed => "DELIVERY_FAILED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error while handling request");
                "Something went wrong".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiError::new(status, self.code(), message))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::DuplicateEmail,
            StoreError::NotFound => AppError::AccountNotFound,
            StoreError::Database(msg) => AppError::Internal(format!("Database error: {msg}")),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value for {field}"),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join(". "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::MissingCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::AccountNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InsufficientRole.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::DeliveryFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::SecretChangedSinceIssuance.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            AppError::from(StoreError::DuplicateEmail),
            AppError::DuplicateEmail
        ));
        assert!(matches!(
            AppError::from(StoreError::Database("boom".into())),
            AppError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = AppError::Internal("connection string leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.status, "error");
        assert_eq!(error.code, "INTERNAL_ERROR");
        assert!(!error.message.contains("connection string"));
    }

    #[tokio::test]
    async fn test_client_error_body() {
        let response = AppError::InvalidCredentials.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.status, "fail");
        assert_eq!(error.message, "Incorrect email or password");
    }
}
