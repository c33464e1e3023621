//! Cluster store persisted as a JSON snapshot.
//!
//! Every mutation rewrites the whole snapshot through a temp file in the
//! same directory followed by an atomic rename, so a crash leaves either the
//! old or the new snapshot on disk. The in-memory map is only updated after
//! the snapshot write succeeded.

use super::memory::{RecordMap, apply_upsert, select, validate_upsert};
use super::record::ClusterRecord;
use super::store::ClusterStore;
use crate::core::{ConfigServerError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct FileClusterStore {
    path: PathBuf,
    records: RwLock<RecordMap>,
}

impl FileClusterStore {
    /// Load the snapshot at `path`, starting empty when it does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = RecordMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => {}
            Ok(raw) => {
                let loaded: Vec<ClusterRecord> = serde_json::from_str(&raw).map_err(|e| {
                    ConfigServerError::storage(format!(
                        "parse snapshot '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                for record in loaded {
                    records.insert(record.key(), record);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        ConfigServerError::storage(format!(
                            "create snapshot directory '{}': {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            Err(e) => {
                return Err(ConfigServerError::storage(format!(
                    "read snapshot '{}': {}",
                    path.display(),
                    e
                )));
            }
        }

        info!(path = %path.display(), records = records.len(), "cluster snapshot loaded");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &RecordMap) -> Result<()> {
        let path = self.path.clone();
        let snapshot: Vec<ClusterRecord> = records.values().cloned().collect();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot))
            .await
            .map_err(|e| ConfigServerError::storage(format!("snapshot writer panicked: {e}")))?
    }
}

fn write_snapshot(path: &Path, records: &[ClusterRecord]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let storage_err = |stage: &str, e: &dyn std::fmt::Display| {
        ConfigServerError::storage(format!("{stage} snapshot '{}': {e}", path.display()))
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_err("create", &e))?;
    serde_json::to_writer_pretty(&mut tmp, records).map_err(|e| storage_err("encode", &e))?;
    tmp.flush().map_err(|e| storage_err("flush", &e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| storage_err("sync", &e))?;
    tmp.persist(path)
        .map_err(|e| storage_err("replace", &e.error))?;

    debug!(path = %path.display(), records = records.len(), "cluster snapshot written");
    Ok(())
}

#[async_trait]
impl ClusterStore for FileClusterStore {
    async fn upsert(
        &self,
        name: &str,
        cluster_id: i64,
        cluster_type: &str,
        root_service_json: &str,
    ) -> Result<ClusterRecord> {
        validate_upsert(name, cluster_id, root_service_json)?;
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let record = apply_upsert(&mut next, name, cluster_id, cluster_type, root_service_json);
        self.persist(&next).await?;
        *records = next;
        Ok(record)
    }

    async fn find(&self, name: &str, cluster_id: Option<i64>) -> Result<Vec<ClusterRecord>> {
        let records = self.records.read().await;
        Ok(select(&records, name, cluster_id))
    }

    async fn delete(&self, name: &str, cluster_id: i64) -> Result<bool> {
        let mut records = self.records.write().await;
        let key = (name.to_string(), cluster_id);
        if !records.contains_key(&key) {
            return Ok(false);
        }
        let mut next = records.clone();
        next.remove(&key);
        self.persist(&next).await?;
        *records = next;
        Ok(true)
    }

    async fn all(&self) -> Result<Vec<ClusterRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = r#"{"ObCluster":"c1","ObClusterId":1}"#;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("clusters.json");

        let store = FileClusterStore::open(&path).await.unwrap();
        store.upsert("c1", 1, "PRIMARY", DOC).await.unwrap();
        store.upsert("c1", 2, "STANDBY", DOC).await.unwrap();
        store.upsert("c2", 1, "PRIMARY", DOC).await.unwrap();
        assert!(store.delete("c2", 1).await.unwrap());
        drop(store);

        let reopened = FileClusterStore::open(&path).await.unwrap();
        let all = reopened.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "c1");
        assert_eq!(all[1].cluster_type, "STANDBY");
        assert!(reopened.find("c2", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileClusterStore::open(dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clusters.json");
        std::fs::write(&path, "[{broken").unwrap();

        let err = FileClusterStore::open(&path).await.err().unwrap();
        assert!(matches!(err, ConfigServerError::Storage(_)));
    }

    #[tokio::test]
    async fn deleting_an_absent_record_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clusters.json");
        let store = FileClusterStore::open(&path).await.unwrap();

        assert!(!store.delete("c1", 1).await.unwrap());
        assert!(!path.exists());
    }
}
