//! Cross-cutting HTTP middleware

pub mod metrics;
pub mod security_headers;

pub use metrics::{metrics_middleware, normalize_endpoint};
pub use security_headers::security_headers_middleware;
