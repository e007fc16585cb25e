//! API route definitions

use crate::auth::middleware::{protect, restrict_to};
use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use exploria_core::Role;
use std::sync::Arc;

/// Routes nested under `/api/v1/users`
pub fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/forgotPassword", post(auth::forgot_password))
        .route("/resetPassword/:token", patch(auth::reset_password));

    let admin_routes = Router::new()
        .route("/", get(users::list_accounts))
        .route_layer(middleware::from_fn(restrict_to(&[Role::Admin])));

    // Protected routes: the authorization chain runs before any role gate
    let protected_routes = Router::new()
        .route("/updatePassword", patch(auth::update_password))
        .route("/me", get(users::get_me))
        .route("/updateMe", patch(users::update_me))
        .route("/deleteMe", delete(users::delete_me))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, protect));

    Router::new().merge(public_routes).merge(protected_routes)
}
