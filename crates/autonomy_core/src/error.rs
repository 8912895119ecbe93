//! Shared error taxonomy (§7). Library crates return typed errors at their
//! boundary; the CLI layer collapses everything into `anyhow::Result`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("store unavailable, degraded to fallback: {0}")]
    StoreDegraded(String),
}
