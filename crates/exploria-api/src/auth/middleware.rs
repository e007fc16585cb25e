//! Authorization middleware chain
//!
//! A protected request moves through fixed stages:
//!
//! 1. bearer token extracted from `Authorization`
//! 2. token signature, issuer and expiry verified
//! 3. account resolved by the token subject (active accounts only)
//! 4. token rejected if the password changed after it was issued
//! 5. optionally, the account role checked against a route's allow-list
//!
//! Any stage failing ends the request with its error; the handler never runs.
//! On success `CurrentAccount` is inserted into the request extensions.

use super::jwt::VerifiedToken;
use super::service::AuthService;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use exploria_core::{Account, Role};
use std::sync::Arc;

/// The signed-in account attached to a request that passed the chain
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub account: Account,
    /// Issue instant of the token that authenticated the request (unix millis)
    pub token_issued_at_ms: i64,
}

impl CurrentAccount {
    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn role(&self) -> Role {
        self.account.role
    }
}

/// Stage 1: pull the bearer token out of the headers
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::NoCredentialsSupplied)
}

/// Stage 2
fn verify_token(service: &AuthService, token: &str) -> Result<VerifiedToken, (AppError, String)> {
    service
        .tokens()
        .verify(token)
        .map_err(|e| (AppError::InvalidOrExpiredToken, e.to_string()))
}

/// Stage 3
async fn resolve_account(
    service: &AuthService,
    verified: &VerifiedToken,
) -> Result<Account, (AppError, String)> {
    match service.store().find_by_id(&verified.subject_id).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err((
            AppError::AccountNoLongerExists,
            "subject not found".to_string(),
        )),
        Err(e) => Err((e, "account lookup failed".to_string())),
    }
}

/// Stage 4
fn ensure_fresh(account: &Account, verified: &VerifiedToken) -> Result<(), (AppError, String)> {
    if account.changed_password_after(verified.issued_at_ms) {
        return Err((
            AppError::SecretChangedSinceIssuance,
            "password changed after issuance".to_string(),
        ));
    }
    Ok(())
}

async fn run_stages(
    service: &AuthService,
    token: &str,
) -> Result<CurrentAccount, (AppError, String)> {
    let verified = verify_token(service, token)?;
    let account = resolve_account(service, &verified).await?;
    ensure_fresh(&account, &verified)?;
    Ok(CurrentAccount {
        account,
        token_issued_at_ms: verified.issued_at_ms,
    })
}

/// Run stages 1-4 against a set of request headers
pub async fn authorize(service: &AuthService, headers: &HeaderMap) -> Result<CurrentAccount, AppError> {
    let token = extract_bearer(headers)?;

    run_stages(service, token).await.map_err(|(error, reason)| {
        if !matches!(error, AppError::Internal(_)) {
            audit_log(&AuditEvent::InvalidToken {
                reason,
                client: ClientInfo::from_headers(headers),
            });
        }
        error
    })
}

/// Stage 5: role allow-list check
pub fn check_role(current: &CurrentAccount, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&current.role()) {
        Ok(())
    } else {
        Err(AppError::InsufficientRole)
    }
}

/// Middleware guarding every protected route
///
/// ```ignore
/// let protected = Router::new()
///     .route("/me", get(users::get_me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), protect));
/// ```
pub async fn protect(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let current = authorize(&state.auth, request.headers()).await?;
    tracing::debug!(account_id = %current.id(), role = %current.role(), "Request authorized");

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>;

/// Middleware factory restricting a route to a set of roles
///
/// Must sit inside `protect`. Admins get no implicit pass; list them when they
/// should be allowed.
///
/// ```ignore
/// let admin = Router::new()
///     .route("/", get(users::list_accounts))
///     .route_layer(middleware::from_fn(restrict_to(&[Role::Admin])));
/// ```
pub fn restrict_to(
    allowed: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let current = request
                .extensions()
                .get::<CurrentAccount>()
                .ok_or(AppError::NoCredentialsSupplied)?;

            if let Err(e) = check_role(current, allowed) {
                audit_log(&AuditEvent::AccessDenied {
                    account_id: current.id().to_string(),
                    role: current.role(),
                    required_roles: allowed.to_vec(),
                    path: request.uri().path().to_string(),
                });
                return Err(e);
            }

            Ok(next.run(request).await)
        })
    }
}
