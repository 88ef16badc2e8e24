use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a page could not be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Timeout {0}ms exceeded")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl LoadError {
    pub fn from_reqwest(error: &reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            LoadError::Timeout(timeout_ms)
        } else if error.is_connect() {
            LoadError::Connection(error.to_string())
        } else if error.is_builder() {
            LoadError::InvalidUrl(error.to_string())
        } else {
            LoadError::Request(error.to_string())
        }
    }
}

/// A query against rendered content could not be answered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("page has no renderable content")]
    NoContent,

    #[error("invalid selector '{0}'")]
    InvalidSelector(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("page has no content to capture")]
    NoContent,

    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),
}
