// # File State Stores
//
// File-based implementations of StatusStore and AddressCache.
//
// ## Purpose
//
// Keeps the alert history and the cached WAN/gateway pair across runs.
// Each record is one JSON document, overwritten wholesale on save.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Automatic backup: Keeps .backup of the last document before each save
// - Recovery: Falls back to backup if the main document cannot be parsed
// - Last resort: A record that cannot be recovered is treated as absent
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "updated_at": "2024-04-22T12:00:00Z",
//   "statuses": {
//     "192.168.1.20": {
//       "in_alert": true,
//       "alert_start": "2024-04-22T09:00:00Z",
//       "alert_description": "Request timeout",
//       "last_notified": "2024-04-22T09:00:00Z",
//       "last_checked": "2024-04-22T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::model::{DynamicAddressRecord, StatusSnapshot};
use crate::traits::state_store::{AddressCache, StatusStore};

/// Document format version
/// Used for future migration if format changes
const DOCUMENT_VERSION: &str = "1.0";

/// Serializable document envelope
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct DocumentFormat<T> {
    version: String,
    #[serde(flatten)]
    payload: T,
}

/// One JSON document with backup and atomic replacement
#[derive(Debug, Clone)]
struct JsonDocument {
    path: PathBuf,
    /// What the document holds, for log lines
    label: &'static str,
}

impl JsonDocument {
    /// Create a document handle, creating parent directories if needed
    async fn open(path: PathBuf, label: &'static str) -> Result<Self, Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create {} directory {}: {}",
                    label,
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path, label })
    }

    /// Load the document with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load the main document
    /// 2. If it is missing, report absence
    /// 3. If it is unreadable or corrupt, try the backup
    /// 4. If the backup also fails, report absence
    async fn load<T: DeserializeOwned>(&self) -> Option<T> {
        match Self::read(&self.path).await {
            Ok(Some(payload)) => {
                tracing::debug!("Loaded {} from {}", self.label, self.path.display());
                return Some(payload);
            }
            Ok(None) => {
                tracing::info!(
                    "The {} file {} was not found and will be created.",
                    self.label,
                    self.path.display()
                );
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "The {} file cannot be used: {}. Attempting recovery from backup.",
                    self.label,
                    e
                );
            }
        }

        let backup_path = backup_path(&self.path);
        match Self::read(&backup_path).await {
            Ok(Some(payload)) => {
                tracing::info!("Recovered {} from backup", self.label);
                if let Err(e) = fs::copy(&backup_path, &self.path).await {
                    tracing::error!("Failed to restore {} file from backup: {}", self.label, e);
                }
                Some(payload)
            }
            Ok(None) => {
                tracing::info!(
                    "No {} backup found. The {} will be created anew.",
                    self.label,
                    self.label
                );
                None
            }
            Err(e) => {
                tracing::info!(
                    "The {} backup cannot be used either: {}. The {} will be created anew.",
                    self.label,
                    e,
                    self.label
                );
                None
            }
        }
    }

    /// Read and parse one file; `Ok(None)` if it does not exist
    async fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let document: DocumentFormat<T> = serde_json::from_str(&content).map_err(|e| {
            Error::state_store(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        if document.version != DOCUMENT_VERSION {
            tracing::warn!(
                "Document version mismatch in {}: expected {}, got {}. Loading anyway.",
                path.display(),
                DOCUMENT_VERSION,
                document.version
            );
        }

        Ok(Some(document.payload))
    }

    /// Write the document atomically
    async fn store<T: Serialize>(&self, payload: &T) -> Result<(), Error> {
        let document = DocumentFormat {
            version: DOCUMENT_VERSION.to_string(),
            payload,
        };

        let json = serde_json::to_string_pretty(&document).map_err(|e| {
            Error::state_store(format!("Failed to serialize {}: {}", self.label, e))
        })?;

        // Write to temporary file first
        let temp_path = temp_path(&self.path);
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Keep the previous document as backup
        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create {} backup: {}", self.label, e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("{} written to {}", self.label, self.path.display());
        Ok(())
    }
}

/// Get path to temporary file for atomic writes
fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    temp.set_extension("tmp");
    temp
}

/// Get path to backup file
fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.to_path_buf();
    backup.set_extension("backup");
    backup
}

/// File-based status snapshot store
///
/// # Example
///
/// ```rust,no_run
/// use nettest_core::state::FileStatusStore;
/// use nettest_core::traits::StatusStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStatusStore::new("/var/lib/nettest/status.json").await?;
///
///     let snapshot = store.load().await;
///     println!("{} addresses known", snapshot.len());
///
///     store.save(&snapshot).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    document: JsonDocument,
}

impl FileStatusStore {
    /// Create a store backed by `path`
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self {
            document: JsonDocument::open(path.as_ref().to_path_buf(), "status").await?,
        })
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.document.path
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn load(&self) -> StatusSnapshot {
        self.document
            .load::<StatusSnapshot>()
            .await
            .map(StatusSnapshot::validated)
            .unwrap_or_default()
    }

    async fn save(&self, snapshot: &StatusSnapshot) -> Result<(), Error> {
        self.document.store(snapshot).await
    }
}

/// File-based dynamic address cache
#[derive(Debug, Clone)]
pub struct FileAddressCache {
    document: JsonDocument,
}

impl FileAddressCache {
    /// Create a cache backed by `path`
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self {
            document: JsonDocument::open(path.as_ref().to_path_buf(), "WAN address").await?,
        })
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.document.path
    }
}

#[async_trait]
impl AddressCache for FileAddressCache {
    async fn load(&self) -> Option<DynamicAddressRecord> {
        self.document.load().await
    }

    async fn save(&self, record: &DynamicAddressRecord) -> Result<(), Error> {
        self.document.store(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AddressStatus;
    use chrono::{TimeZone, Utc};
    use std::net::Ipv4Addr;
    use tempfile::tempdir;

    fn snapshot_with(address: &str, in_alert: bool) -> StatusSnapshot {
        let now = Utc.with_ymd_and_hms(2024, 4, 22, 12, 0, 0).unwrap();
        let mut snapshot = StatusSnapshot::new(now);
        snapshot.statuses.insert(
            address.to_string(),
            AddressStatus {
                in_alert,
                alert_start: in_alert.then_some(now),
                alert_description: in_alert.then(|| "timeout".to_string()),
                last_notified: in_alert.then_some(now),
                last_checked: now,
            },
        );
        snapshot
    }

    #[tokio::test]
    async fn test_missing_status_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = FileStatusStore::new(dir.path().join("status.json")).await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("status.json");

        let store = FileStatusStore::new(&path).await.unwrap();
        let snapshot = snapshot_with("192.168.1.20", true);
        store.save(&snapshot).await.unwrap();
        assert!(path.exists());

        let reopened = FileStatusStore::new(&path).await.unwrap();
        assert_eq!(reopened.load().await, snapshot);
    }

    #[tokio::test]
    async fn test_garbage_status_without_backup_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        fs::write(&path, b"{ this is not json").await.unwrap();

        let store = FileStatusStore::new(&path).await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_status_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        fs::write(&path, br#"{ "version": "1.0", "status": ["a", "b"] }"#)
            .await
            .unwrap();

        let store = FileStatusStore::new(&path).await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_status_recovers_previous_snapshot_from_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        let store = FileStatusStore::new(&path).await.unwrap();

        let first = snapshot_with("192.168.1.20", true);
        store.save(&first).await.unwrap();
        store.save(&snapshot_with("192.168.1.20", false)).await.unwrap();
        assert!(backup_path(&path).exists(), "Backup file should exist after write");

        // A crash mid-write leaves a truncated main document behind
        fs::write(&path, b"{\"version\": \"1.0\", \"upd").await.unwrap();

        let recovered = FileStatusStore::new(&path).await.unwrap().load().await;
        assert_eq!(recovered, first, "Backup should contain previous state, not latest");
    }

    #[tokio::test]
    async fn test_address_cache_round_trip_and_absence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wanip.json");
        let cache = FileAddressCache::new(&path).await.unwrap();
        assert!(cache.load().await.is_none());

        let obtained = Utc.with_ymd_and_hms(2022, 5, 18, 22, 45, 2).unwrap();
        let record = DynamicAddressRecord::new(Ipv4Addr::new(52, 144, 115, 26), obtained);
        cache.save(&record).await.unwrap();

        assert_eq!(cache.load().await, Some(record));
    }

    #[tokio::test]
    async fn test_address_cache_rejects_non_ipv4_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wanip.json");
        fs::write(
            &path,
            br#"{ "version": "1.0", "obtained_at": "2022-05-18T22:45:02Z",
                  "wan": "429 Too Many Requests", "gateway": "52.144.115.1" }"#,
        )
        .await
        .unwrap();

        let cache = FileAddressCache::new(&path).await.unwrap();
        assert!(cache.load().await.is_none());
    }
}
