//! Saves raw choreo response bytes to `{dir}/{choreo}/{timestamp}.json` for
//! offline analysis.
//!
//! Errors are logged and swallowed; saving is best-effort and must never
//! interrupt the monitor loop.
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

/// Write `bytes` under `dir/choreo/`, returning the path on success.
pub async fn save(dir: &Path, choreo: &str, bytes: &[u8]) -> Option<PathBuf> {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let dir = dir.join(choreo);
    let path = dir.join(format!("{ts}.json"));

    if let Err(e) = fs::create_dir_all(&dir).await {
        warn!(path = %path.display(), error = %e, "response_store: failed to create directory");
        return None;
    }

    // Pretty-print the JSON if valid; fall back to raw bytes otherwise.
    let content = serde_json::from_slice::<serde_json::Value>(bytes)
        .and_then(|v| serde_json::to_vec_pretty(&v))
        .unwrap_or_else(|_| bytes.to_vec());

    match fs::write(&path, &content).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), bytes = content.len(), "response_store: saved");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "response_store: failed to write response file");
            None
        }
    }
}
