// proxy module - Directus edge service

pub mod config;
pub mod render; // Rendering strategies over the render cache
pub mod server;

pub mod handlers; // API endpoint handlers
pub mod middleware; // Axum middleware
pub mod upstream; // Directus client

pub use config::ProxyConfig;
pub use server::{build_router, AppState, AxumServer};
