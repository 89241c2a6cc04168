//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Ensure the data directory exists; warn when the optional dashboard directory is missing.
pub async fn ensure_env(data_dir: &Path, dashboard_dir: Option<&Path>) -> anyhow::Result<()> {
    if let Some(dir) = dashboard_dir {
        if tokio::fs::metadata(dir).await.is_err() {
            warn!(dashboard_dir = %dir.display(), "dashboard directory not found; static assets will 404");
        }
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", data_dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_env_creates_nested_data_dir() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let data = tmp.path().join("a/b/data");
        ensure_env(&data, Some(&tmp.path().join("missing-frontend"))).await?;
        assert!(data.is_dir());
        Ok(())
    }
}
