pub mod config;
pub mod render;

pub use config::AppConfig;
pub use render::{RenderDocument, RenderStrategy};
