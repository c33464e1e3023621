use serde::{Deserialize, Serialize};

/// Region/IDC layout of a cluster as served to legacy callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObClusterIdcRegionInfo {
    #[serde(rename = "ObRegion")]
    pub cluster: String,
    #[serde(rename = "ObRegionId")]
    pub cluster_id: i64,
    #[serde(rename = "IDCList")]
    pub idc_list: Vec<IdcRegionInfo>,
    #[serde(rename = "ReadonlyRsList")]
    pub readonly_rs_list: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdcRegionInfo {
    pub idc: String,
    pub region: String,
}

impl ObClusterIdcRegionInfo {
    /// No IDC placement is tracked; the list is always empty.
    pub fn new(cluster: impl Into<String>, cluster_id: i64) -> Self {
        Self {
            cluster: cluster.into(),
            cluster_id,
            idc_list: Vec::new(),
            readonly_rs_list: String::new(),
        }
    }
}
