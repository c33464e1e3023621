use super::record::ClusterRecord;
use crate::core::Result;
use async_trait::async_trait;

/// Record store the request handlers talk to.
///
/// Implementations serialize conflicting writes to the same `(name, id)`
/// key themselves; callers add no locking of their own.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Create the record or replace its type and topology blob.
    async fn upsert(
        &self,
        name: &str,
        cluster_id: i64,
        cluster_type: &str,
        root_service_json: &str,
    ) -> Result<ClusterRecord>;

    /// Records named `name`, narrowed to `cluster_id` when given, in id order.
    async fn find(&self, name: &str, cluster_id: Option<i64>) -> Result<Vec<ClusterRecord>>;

    /// Returns whether a record was removed.
    async fn delete(&self, name: &str, cluster_id: i64) -> Result<bool>;

    async fn all(&self) -> Result<Vec<ClusterRecord>>;
}
