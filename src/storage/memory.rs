use super::record::{ClusterRecord, RecordKey};
use super::store::ClusterStore;
use crate::core::{ConfigServerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

pub(crate) type RecordMap = BTreeMap<RecordKey, ClusterRecord>;

pub struct InMemoryClusterStore {
    records: RwLock<RecordMap>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryClusterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn upsert(
        &self,
        name: &str,
        cluster_id: i64,
        cluster_type: &str,
        root_service_json: &str,
    ) -> Result<ClusterRecord> {
        validate_upsert(name, cluster_id, root_service_json)?;
        let mut records = self.records.write().await;
        Ok(apply_upsert(
            &mut records,
            name,
            cluster_id,
            cluster_type,
            root_service_json,
        ))
    }

    async fn find(&self, name: &str, cluster_id: Option<i64>) -> Result<Vec<ClusterRecord>> {
        let records = self.records.read().await;
        Ok(select(&records, name, cluster_id))
    }

    async fn delete(&self, name: &str, cluster_id: i64) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(&(name.to_string(), cluster_id)).is_some())
    }

    async fn all(&self) -> Result<Vec<ClusterRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}

pub(crate) fn validate_upsert(name: &str, cluster_id: i64, root_service_json: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConfigServerError::illegal_argument(
            "cluster name must not be empty",
        ));
    }
    if cluster_id <= 0 {
        return Err(ConfigServerError::illegal_argument(format!(
            "cluster id must be positive, got {cluster_id}"
        )));
    }
    let document = serde_json::from_str::<serde_json::Value>(root_service_json).map_err(|e| {
        ConfigServerError::illegal_argument(format!("root service json is malformed: {e}"))
    })?;
    if !document.is_object() {
        return Err(ConfigServerError::illegal_argument(
            "root service json must be an object",
        ));
    }
    Ok(())
}

/// Insert or replace; `create_time` survives replacement.
pub(crate) fn apply_upsert(
    records: &mut RecordMap,
    name: &str,
    cluster_id: i64,
    cluster_type: &str,
    root_service_json: &str,
) -> ClusterRecord {
    let now = Utc::now();
    let record = records
        .entry((name.to_string(), cluster_id))
        .and_modify(|existing| {
            existing.cluster_type = cluster_type.to_string();
            existing.root_service_json = root_service_json.to_string();
            existing.update_time = now;
        })
        .or_insert_with(|| ClusterRecord {
            name: name.to_string(),
            cluster_id,
            cluster_type: cluster_type.to_string(),
            root_service_json: root_service_json.to_string(),
            create_time: now,
            update_time: now,
        });
    record.clone()
}

pub(crate) fn select(records: &RecordMap, name: &str, cluster_id: Option<i64>) -> Vec<ClusterRecord> {
    match cluster_id {
        Some(id) => records
            .get(&(name.to_string(), id))
            .cloned()
            .into_iter()
            .collect(),
        None => records
            .range((name.to_string(), i64::MIN)..=(name.to_string(), i64::MAX))
            .map(|(_, record)| record.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const DOC: &str = r#"{"ObCluster":"c1","ObClusterId":1}"#;

    #[tokio::test]
    async fn upsert_keeps_create_time_and_replaces_blob() {
        let store = InMemoryClusterStore::new();
        let first = store.upsert("c1", 1, "PRIMARY", DOC).await.unwrap();
        let second = store
            .upsert("c1", 1, "STANDBY", r#"{"ObCluster":"c1"}"#)
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(second.create_time, first.create_time);
        assert!(second.update_time >= first.update_time);
        assert_eq!(second.cluster_type, "STANDBY");
        assert_eq!(second.root_service_json, r#"{"ObCluster":"c1"}"#);
    }

    #[tokio::test]
    async fn find_without_id_matches_by_name_in_id_order() {
        let store = InMemoryClusterStore::new();
        store.upsert("c1", 2, "STANDBY", DOC).await.unwrap();
        store.upsert("c1", 1, "PRIMARY", DOC).await.unwrap();
        store.upsert("c10", 1, "PRIMARY", DOC).await.unwrap();

        let found = store.find("c1", None).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|r| r.cluster_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let narrowed = store.find("c1", Some(2)).await.unwrap();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].cluster_type, "STANDBY");

        assert!(store.find("c2", None).await.unwrap().is_empty());
        assert!(store.find("c1", Some(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let store = InMemoryClusterStore::new();
        store.upsert("c1", 1, "PRIMARY", DOC).await.unwrap();
        assert!(store.delete("c1", 1).await.unwrap());
        assert!(!store.delete("c1", 1).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn upsert_rejects_bad_keys_and_malformed_json() {
        let store = InMemoryClusterStore::new();
        assert!(matches!(
            store.upsert("", 1, "PRIMARY", DOC).await,
            Err(ConfigServerError::IllegalArgument(_))
        ));
        assert!(matches!(
            store.upsert("c1", 0, "PRIMARY", DOC).await,
            Err(ConfigServerError::IllegalArgument(_))
        ));
        assert!(matches!(
            store.upsert("c1", 1, "PRIMARY", "{oops").await,
            Err(ConfigServerError::IllegalArgument(_))
        ));
        assert!(matches!(
            store.upsert("c1", 1, "PRIMARY", "[7,0]").await,
            Err(ConfigServerError::IllegalArgument(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_upserts_to_distinct_keys_all_land() {
        let store = Arc::new(InMemoryClusterStore::new());
        let mut handles = vec![];

        for task_id in 0..8_i64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 1..=10_i64 {
                    store
                        .upsert(&format!("c{task_id}"), i, "PRIMARY", DOC)
                        .await
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.all().await.unwrap().len(), 80);
    }
}
