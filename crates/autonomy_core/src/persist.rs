//! Atomic JSON state-file persistence: write-to-temp + rename (§5, §9).
//!
//! Used by the Emotion Service, BDI Engine, and anything else that keeps a
//! single JSON document as its durable state. A crash mid-write leaves the
//! previous file intact rather than a half-written document.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a JSON document, falling back to `default` on a missing file or a
/// parse error (logged as a warning). Never panics on malformed state.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse state file, using defaults");
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}
