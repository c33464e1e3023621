//! Query-string parameters shared by the topology operations.

use crate::core::{ConfigServerError, Result};
use crate::model::RootServiceInfo;
use std::collections::HashMap;

pub type QueryParams = HashMap<String, String>;

pub const PARAM_ACTION: &str = "Action";
pub const PARAM_OB_CLUSTER: &str = "ObCluster";
pub const PARAM_OB_CLUSTER_ID: &str = "ObClusterId";
pub const PARAM_OB_REGION: &str = "ObRegion";
pub const PARAM_OB_REGION_ID: &str = "ObRegionId";
pub const PARAM_VERSION: &str = "version";
pub const PARAM_VERSION_ONLY: &str = "VersionOnly";

/// Request-level protocol generation. Absent, `0` and `1` are legacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    Legacy,
    Current,
}

impl ProtocolVersion {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") | Some("0") | Some("1") => Ok(Self::Legacy),
            Some("2") => Ok(Self::Current),
            Some(other) => Err(ConfigServerError::illegal_argument(format!(
                "unsupported version '{other}'"
            ))),
        }
    }
}

/// Identity of the cluster a topology request addresses, after the
/// cluster/region pairs were reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootServiceParam {
    pub ob_cluster: String,
    pub ob_cluster_id: Option<i64>,
    pub version: ProtocolVersion,
}

impl RootServiceParam {
    pub fn from_query(query: &QueryParams) -> Result<Self> {
        let lookup = |key: &str| query.get(key).map(String::as_str).filter(|v| !v.is_empty());

        let identity = RootServiceInfo {
            ob_cluster: lookup(PARAM_OB_CLUSTER).unwrap_or_default().to_string(),
            ob_region: lookup(PARAM_OB_REGION).unwrap_or_default().to_string(),
            ob_cluster_id: parse_cluster_id(PARAM_OB_CLUSTER_ID, lookup(PARAM_OB_CLUSTER_ID))?,
            ob_region_id: parse_cluster_id(PARAM_OB_REGION_ID, lookup(PARAM_OB_REGION_ID))?,
            ..Default::default()
        }
        .normalized();

        Ok(Self {
            ob_cluster_id: (identity.ob_cluster_id > 0).then_some(identity.ob_cluster_id),
            ob_cluster: identity.ob_cluster,
            version: ProtocolVersion::parse(lookup(PARAM_VERSION))?,
        })
    }

    /// Name is mandatory for every lookup.
    pub fn require_cluster(&self) -> Result<&str> {
        if self.ob_cluster.is_empty() {
            return Err(ConfigServerError::illegal_argument(
                "no obcluster or obregion",
            ));
        }
        Ok(&self.ob_cluster)
    }
}

fn parse_cluster_id(key: &str, raw: Option<&str>) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ConfigServerError::illegal_argument(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// `VersionOnly` accepts the usual spellings of a boolean; absent is false.
pub fn version_only(query: &QueryParams) -> Result<bool> {
    match query.get(PARAM_VERSION_ONLY).map(String::as_str) {
        None => Ok(false),
        Some("1" | "t" | "T" | "TRUE" | "true" | "True") => Ok(true),
        Some("0" | "f" | "F" | "FALSE" | "false" | "False") => Ok(false),
        Some(other) => Err(ConfigServerError::illegal_argument(format!(
            "invalid parameter, failed to parse versiononly '{other}'"
        ))),
    }
}
