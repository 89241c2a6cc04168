use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::{SlotInfo, SnapshotStore};
use crate::errors::RelayError;
use crate::tier::Tier;

const TEMP_PREFIX: &str = ".relay-";
const TEMP_SUFFIX: &str = ".tmp";
/// Temp files younger than this may belong to a live writer (e.g. a second
/// instance during a rolling restart) and are left alone.
const STALE_TEMP_AGE: Duration = Duration::from_secs(300);

/// File-backed snapshot store: `<dir>/<tier>_data.json`, one file per tier.
///
/// Writes land in a temp file inside `dir`, get fsynced, and are renamed over
/// the slot file, so readers see either the old or the new document. Every
/// writer gets its own temp file; concurrent uploads to one tier resolve to
/// whichever rename happens last.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Open (creating if needed) the data directory and drop temp files left by
    /// an interrupted write. Only temp files older than five minutes are removed.
    pub async fn new<P: Into<PathBuf>>(dir: P) -> Result<Arc<Self>, RelayError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| RelayError::storage(&format!("create {}", dir.display()), e))?;
        let store = Self { dir };
        store.sweep_temp_files().await;
        Ok(Arc::new(store))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, tier: Tier) -> PathBuf {
        self.dir.join(tier.file_name())
    }

    async fn sweep_temp_files(&self) {
        let Ok(mut entries) = fs::read_dir(&self.dir).await else { return };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)) {
                continue;
            }
            let age = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok());
            if !age.map_or(false, |age| age >= STALE_TEMP_AGE) {
                debug!(file = %name, "keeping recent temp file");
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => debug!(file = %name, "removed stale temp file"),
                Err(e) => warn!(file = %name, error = %e, "failed to remove stale temp file"),
            }
        }
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), RelayError> {
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| RelayError::storage("create temp file", e))?;
    temp.write_all(bytes)
        .map_err(|e| RelayError::storage("write temp file", e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| RelayError::storage("sync temp file", e))?;
    temp.persist(path)
        .map_err(|e| RelayError::storage(&format!("replace {}", path.display()), e.error))?;
    #[cfg(unix)]
    {
        if let Ok(dir) = std::fs::File::open(dir) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn put(&self, tier: Tier, document: &Value) -> Result<SlotInfo, RelayError> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| RelayError::storage("encode snapshot", e))?;
        let len = bytes.len() as u64;
        let dir = self.dir.clone();
        let path = self.slot_path(tier);

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &bytes))
            .await
            .map_err(|e| RelayError::storage("write task", e))??;

        Ok(SlotInfo::new(tier, len, Utc::now()))
    }

    async fn get(&self, tier: Tier) -> Result<Value, RelayError> {
        let path = self.slot_path(tier);
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                warn!(%tier, path = %path.display(), error = %e, "stored snapshot is not valid JSON");
                RelayError::Storage(format!("stored snapshot for `{tier}` is corrupt: {e}"))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RelayError::NotFound(tier)),
            Err(e) => Err(RelayError::storage(&format!("read {}", path.display()), e)),
        }
    }

    async fn list(&self) -> Result<Vec<SlotInfo>, RelayError> {
        let mut slots = Vec::new();
        for tier in Tier::ALL {
            let path = self.slot_path(tier);
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    let updated_at = meta
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now());
                    slots.push(SlotInfo::new(tier, meta.len(), updated_at));
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(RelayError::storage(&format!("stat {}", path.display()), e)),
            }
        }
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn open() -> anyhow::Result<(tempfile::TempDir, Arc<FileSnapshotStore>)> {
        let tmp = tempfile::tempdir()?;
        let store = FileSnapshotStore::new(tmp.path().join("data")).await?;
        Ok((tmp, store))
    }

    fn temp_files(dir: &Path) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(TEMP_PREFIX) {
                names.push(name);
            }
        }
        Ok(names)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_and_writes_slot_file() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        let doc = json!({"buy_price_php": 123.45, "timestamp": "2024-01-01T00:00:00Z"});

        let info = store.put(Tier::Free, &doc).await?;
        assert_eq!(info.file, "free_data.json");
        assert_eq!(store.get(Tier::Free).await?, doc);

        let on_disk: Value = serde_json::from_slice(&std::fs::read(store.slot_path(Tier::Free))?)?;
        assert_eq!(on_disk, doc);
        assert!(temp_files(store.dir())?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn get_on_empty_slot_is_not_found() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        assert!(matches!(store.get(Tier::Pro).await, Err(RelayError::NotFound(Tier::Pro))));
        assert!(store.list().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn second_put_replaces_first() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        store.put(Tier::Pro, &json!({"v": 1, "stale": true})).await?;
        let second = json!({"v": 2});
        let info = store.put(Tier::Pro, &second).await?;

        assert_eq!(store.get(Tier::Pro).await?, second);
        let slots = store.list().await?;
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].tier, Tier::Pro);
        assert_eq!(slots[0].bytes, info.bytes);
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_slot_is_a_storage_error() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        std::fs::write(store.slot_path(Tier::Free), b"{\"truncated\": ")?;
        assert!(matches!(store.get(Tier::Free).await, Err(RelayError::Storage(_))));
        Ok(())
    }

    fn backdate(path: &Path, by: Duration) -> anyhow::Result<()> {
        let file = std::fs::File::options().write(true).open(path)?;
        file.set_modified(SystemTime::now() - by)?;
        Ok(())
    }

    #[tokio::test]
    async fn reopen_keeps_data_and_sweeps_stale_temp_files() -> anyhow::Result<()> {
        let (tmp, store) = open().await?;
        store.put(Tier::Free, &json!({"a": 1})).await?;
        let abandoned = store.dir().join(".relay-abandoned.tmp");
        std::fs::write(&abandoned, b"{\"half")?;
        backdate(&abandoned, Duration::from_secs(3600))?;

        let reopened = FileSnapshotStore::new(tmp.path().join("data")).await?;
        assert_eq!(reopened.get(Tier::Free).await?, json!({"a": 1}));
        assert!(temp_files(reopened.dir())?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn reopen_leaves_recent_temp_files_of_other_writers() -> anyhow::Result<()> {
        let (tmp, store) = open().await?;
        let in_flight = store.dir().join(".relay-inflight.tmp");
        std::fs::write(&in_flight, b"{\"partial")?;

        let reopened = FileSnapshotStore::new(tmp.path().join("data")).await?;
        assert_eq!(temp_files(reopened.dir())?, vec![".relay-inflight.tmp".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn float_and_big_integer_values_round_trip_exactly() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        let raw = r#"{"p":1175.4621790330661,"q":1865.8799244302274,"big":123456789012345678901234567890}"#;
        let doc: Value = serde_json::from_str(raw)?;
        store.put(Tier::Free, &doc).await?;

        let fetched = serde_json::to_string(&store.get(Tier::Free).await?)?;
        assert!(fetched.contains("1175.4621790330661"), "{fetched}");
        assert!(fetched.contains("1865.8799244302274"), "{fetched}");
        assert!(fetched.contains("123456789012345678901234567890"), "{fetched}");
        let on_disk = std::fs::read_to_string(store.slot_path(Tier::Free))?;
        assert!(on_disk.contains("123456789012345678901234567890"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_is_storage_error() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        std::fs::remove_dir_all(store.dir())?;
        let res = store.put(Tier::Free, &json!({"a": 1})).await;
        assert!(matches!(res, Err(RelayError::Storage(_))));
        Ok(())
    }

    #[tokio::test]
    async fn readers_never_see_partial_writes() -> anyhow::Result<()> {
        let (_tmp, store) = open().await?;
        let small = json!({"size": "small"});
        let large = json!({"size": "large", "rows": (0..2000).collect::<Vec<u32>>()});
        store.put(Tier::Free, &small).await?;

        let writer = {
            let store = Arc::clone(&store);
            let (small, large) = (small.clone(), large.clone());
            tokio::spawn(async move {
                for i in 0..40 {
                    let doc = if i % 2 == 0 { &large } else { &small };
                    store.put(Tier::Free, doc).await?;
                }
                Ok::<_, RelayError>(())
            })
        };
        let other_tier = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..40 {
                    store.put(Tier::Pro, &json!({"i": i})).await?;
                }
                Ok::<_, RelayError>(())
            })
        };

        for _ in 0..200 {
            let seen = store.get(Tier::Free).await?;
            assert!(seen == small || seen == large);
        }
        writer.await??;
        other_tier.await??;

        assert_eq!(store.get(Tier::Free).await?, small);
        assert_eq!(store.get(Tier::Pro).await?, json!({"i": 39}));
        assert!(temp_files(store.dir())?.is_empty());
        Ok(())
    }
}
