use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] reqwest::Error),

    #[error("Directus API error: {0}")]
    UpstreamStatus(u16),

    #[error("Malformed upstream body: {0}")]
    MalformedUpstreamBody(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid revalidation request: {0}")]
    InvalidRequest(String),
}

impl AppError {
    /// Upstream answered, but not with a 2xx.
    pub fn is_upstream_status(&self) -> bool {
        matches!(self, AppError::UpstreamStatus(_))
    }
}

// Serialize as the display string so errors can be embedded in JSON bodies
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type AppResult<T> = Result<T, AppError>;
