// Middleware module - Axum middleware

pub mod cache_control;
pub mod cors;
pub mod logging;

pub use cache_control::cache_control_middleware;
pub use cors::cors_layer;
pub use logging::logging_middleware;
