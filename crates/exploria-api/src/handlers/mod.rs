//! API handlers

pub mod auth;
pub mod health;
pub mod users;

use crate::error::AppError;
use axum::extract::FromRequest;

/// `Json` extractor whose rejections use the API error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
