//! Account self-service and administration handlers

use super::auth::AccountData;
use super::ApiJson;
use crate::auth::middleware::CurrentAccount;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use exploria_core::AccountPublic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Profile update; only `name` and `email` are applied
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    /// Rejected when present
    #[serde(default, alias = "secret")]
    #[schema(value_type = Option<String>)]
    pub password: Option<serde_json::Value>,
    /// Rejected when present
    #[serde(default, alias = "secretConfirm")]
    #[schema(value_type = Option<String>)]
    pub password_confirm: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub status: String,
    pub data: AccountData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountsData {
    pub accounts: Vec<AccountPublic>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountListResponse {
    pub status: String,
    pub results: usize,
    pub data: AccountsData,
}

fn account_response(account: AccountPublic) -> Json<AccountResponse> {
    Json(AccountResponse {
        status: "success".to_string(),
        data: AccountData { account },
    })
}

/// The signed-in account
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not signed in", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(Extension(current): Extension<CurrentAccount>) -> Json<AccountResponse> {
    account_response(current.account.to_public())
}

/// Update name and/or email of the signed-in account
#[utoipa::path(
    patch,
    path = "/api/v1/users/updateMe",
    tag = "users",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 400, description = "Invalid input or password fields supplied", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
    ApiJson(request): ApiJson<UpdateMeRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    if request.password.is_some() || request.password_confirm.is_some() {
        return Err(AppError::Validation(
            "This route is not for password updates. Please use /updatePassword".to_string(),
        ));
    }
    request.validate()?;

    let account = state
        .auth
        .update_profile(current.id(), request.name, request.email)
        .await?;

    Ok(account_response(account.to_public()))
}

/// Deactivate the signed-in account
#[utoipa::path(
    delete,
    path = "/api/v1/users/deleteMe",
    tag = "users",
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 401, description = "Not signed in", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<StatusCode, AppError> {
    state.auth.deactivate(current.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All active accounts (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Active accounts", body = AccountListResponse),
        (status = 403, description = "Not an admin", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccountListResponse>, AppError> {
    let accounts: Vec<AccountPublic> = state
        .auth
        .list_accounts()
        .await?
        .iter()
        .map(|a| a.to_public())
        .collect();

    Ok(Json(AccountListResponse {
        status: "success".to_string(),
        results: accounts.len(),
        data: AccountsData { accounts },
    }))
}
