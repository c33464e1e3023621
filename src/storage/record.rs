use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique key of a stored cluster: name plus positive numeric id.
pub type RecordKey = (String, i64);

/// Type tag of the record a read without numeric id prefers.
pub const PRIMARY_TYPE: &str = "PRIMARY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub name: String,
    pub cluster_id: i64,
    pub cluster_type: String,
    /// Last reported topology, kept as opaque JSON text.
    pub root_service_json: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl ClusterRecord {
    pub fn key(&self) -> RecordKey {
        (self.name.clone(), self.cluster_id)
    }

    pub fn is_primary(&self) -> bool {
        self.cluster_type.eq_ignore_ascii_case(PRIMARY_TYPE)
    }
}
