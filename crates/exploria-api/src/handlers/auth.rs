//! Authentication API handlers
//!
//! Signup, login and the password lifecycle under `/api/v1/users`. The
//! `secret`, `secretConfirm` and `currentSecret` field names are accepted as
//! aliases of `password`, `passwordConfirm` and `passwordCurrent`.

use super::ApiJson;
use crate::audit::ClientInfo;
use crate::auth::middleware::CurrentAccount;
use crate::auth::service::{AuthOutcome, SignupInput};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use exploria_core::AccountPublic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Signup request
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[serde(alias = "secret")]
    pub password: String,
    #[serde(alias = "secretConfirm")]
    pub password_confirm: String,
}

/// Login request; missing fields are reported as missing credentials
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[serde(alias = "secret")]
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(alias = "secret")]
    pub password: String,
    #[serde(alias = "secretConfirm")]
    pub password_confirm: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(alias = "currentSecret")]
    pub password_current: String,
    #[serde(alias = "secret")]
    pub password: String,
    #[serde(alias = "secretConfirm")]
    pub password_confirm: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountData {
    pub account: AccountPublic,
}

/// Session token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub status: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AccountData>,
}

impl AuthResponse {
    fn token_only(outcome: AuthOutcome) -> Self {
        Self {
            status: "success".to_string(),
            token: outcome.token,
            data: None,
        }
    }

    fn with_account(outcome: AuthOutcome) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(AccountData {
                account: outcome.account.to_public(),
            }),
            token: outcome.token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

/// Create an account with the `user` role and sign it in
#[utoipa::path(
    post,
    path = "/api/v1/users/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input or passwords do not match", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    )
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let outcome = state
        .auth
        .signup(
            SignupInput {
                email: request.email,
                name: request.name,
                password: request.password,
                password_confirm: request.password_confirm,
            },
            &ClientInfo::from_headers(&headers),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::with_account(outcome))))
}

/// Exchange email and password for a session token
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing", body = crate::error::ApiError),
        (status = 401, description = "Incorrect email or password", body = crate::error::ApiError),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let outcome = state
        .auth
        .login(
            request.email,
            request.password,
            &ClientInfo::from_headers(&headers),
        )
        .await?;

    Ok(Json(AuthResponse::token_only(outcome)))
}

/// Email a single-use reset link
#[utoipa::path(
    post,
    path = "/api/v1/users/forgotPassword",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 404, description = "No account with that email", body = crate::error::ApiError),
        (status = 500, description = "Email could not be sent", body = crate::error::ApiError),
    )
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth
        .forgot_password(&request.email, &ClientInfo::from_headers(&headers))
        .await?;

    Ok(Json(MessageResponse {
        status: "success".to_string(),
        message: "Token sent to email!".to_string(),
    }))
}

/// Redeem a reset token for a new password
#[utoipa::path(
    patch,
    path = "/api/v1/users/resetPassword/{token}",
    tag = "auth",
    params(("token" = String, Path, description = "Raw reset token from the email")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset, signed in", body = AuthResponse),
        (status = 400, description = "Token invalid or expired, or passwords do not match", body = crate::error::ApiError),
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let outcome = state
        .auth
        .reset_password(&token, request.password, request.password_confirm)
        .await?;

    Ok(Json(AuthResponse::token_only(outcome)))
}

/// Change the password of the signed-in account
#[utoipa::path(
    patch,
    path = "/api/v1/users/updatePassword",
    tag = "auth",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed, fresh token issued", body = AuthResponse),
        (status = 400, description = "Passwords do not match", body = crate::error::ApiError),
        (status = 401, description = "Not signed in or current password wrong", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
    ApiJson(request): ApiJson<UpdatePasswordRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let outcome = state
        .auth
        .update_password(
            current.id(),
            request.password_current,
            request.password,
            request.password_confirm,
        )
        .await?;

    Ok(Json(AuthResponse::token_only(outcome)))
}
