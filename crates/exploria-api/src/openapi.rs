//! OpenAPI document served at `/api-docs/openapi.json`

use crate::handlers::{auth, health, users};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Exploria API",
        description = "Accounts, sessions and authorization for the Exploria booking platform"
    ),
    paths(
        auth::signup,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        auth::update_password,
        users::get_me,
        users::update_me,
        users::delete_me,
        users::list_accounts,
        health::health_check,
        health::metrics,
    ),
    components(schemas(
        auth::SignupRequest,
        auth::LoginRequest,
        auth::ForgotPasswordRequest,
        auth::ResetPasswordRequest,
        auth::UpdatePasswordRequest,
        auth::AuthResponse,
        auth::AccountData,
        auth::MessageResponse,
        users::UpdateMeRequest,
        users::AccountResponse,
        users::AccountsData,
        users::AccountListResponse,
        health::HealthResponse,
        health::MetricsResponse,
        crate::state::EndpointStats,
        crate::error::ApiError,
        exploria_core::AccountPublic,
        exploria_core::Role,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Signup, login and password lifecycle"),
        (name = "users", description = "Account self-service and administration"),
        (name = "health", description = "Liveness and metrics"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
