//! Typed errors at the memory layer's module boundaries. Per §4.3/§4.4's
//! failure model, these never escape a public API method: callers get a
//! safely-degraded value (empty read, `false` write) and a log line, not a
//! propagated error. The typed variants exist so the degrade-and-log sites
//! have something concrete to log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("belief store backend error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
