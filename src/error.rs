use thiserror::Error;

/// Upstream failures. Always absorbed per source or per candidate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {secs}s: {url}")]
    Timeout { url: String, secs: u64 },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("render failed for {url}: {message}")]
    Render { url: String, message: String },
    #[error("malformed feed at {url}: {message}")]
    Feed { url: String, message: String },
}

/// Persistence failures. Never absorbed: the caller of save/load sees them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unreadable timestamp {0:?}")]
    Timestamp(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no source named {0:?}")]
    NotFound(String),
}

#[derive(Debug, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] pub config::ConfigError);
