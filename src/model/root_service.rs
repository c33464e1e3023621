use crate::core::{ConfigServerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Root-service topology of one cluster, as reported by its nodes.
///
/// The `ObCluster*` and `ObRegion*` pairs name the same thing under the two
/// protocol generations; [`RootServiceInfo::normalize`] makes them agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootServiceInfo {
    #[serde(rename = "ObClusterId")]
    pub ob_cluster_id: i64,
    #[serde(rename = "ObRegionId")]
    pub ob_region_id: i64,
    #[serde(rename = "ObCluster")]
    pub ob_cluster: String,
    #[serde(rename = "ObRegion")]
    pub ob_region: String,
    #[serde(rename = "ReadonlyRsList")]
    pub readonly_rs_list: Vec<ServerEntry>,
    #[serde(rename = "RsList")]
    pub rs_list: Vec<ServerEntry>,
    #[serde(rename = "Type")]
    pub cluster_type: String,
    #[serde(rename = "timestamp")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEntry {
    pub address: String,
    pub role: String,
    pub sql_port: i32,
}

impl RootServiceInfo {
    /// Parse a topology document and normalize it. Only JSON objects are
    /// documents; a derived struct would also accept an array positionally.
    pub fn from_json(raw: &str) -> Result<Self> {
        let malformed = |e: &dyn std::fmt::Display| {
            ConfigServerError::illegal_argument(format!("malformed root service info: {e}"))
        };

        let value: JsonValue = serde_json::from_str(raw).map_err(|e| malformed(&e))?;
        require_object_shape(&value).map_err(|e| malformed(&e))?;
        let mut info: Self = serde_json::from_value(value).map_err(|e| malformed(&e))?;
        info.normalize();
        Ok(info)
    }

    /// Propagate whichever identifier pair is populated to the other one.
    /// The cluster pair wins when both are set.
    pub fn normalize(&mut self) {
        if !self.ob_cluster.is_empty() {
            self.ob_region = self.ob_cluster.clone();
        } else if !self.ob_region.is_empty() {
            self.ob_cluster = self.ob_region.clone();
        }

        if self.ob_cluster_id > 0 {
            self.ob_region_id = self.ob_cluster_id;
        } else if self.ob_region_id > 0 {
            self.ob_cluster_id = self.ob_region_id;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Cluster name and, when positive, the numeric id. Requires a name.
    pub fn identity(&self) -> Result<(&str, Option<i64>)> {
        if self.ob_cluster.is_empty() {
            return Err(ConfigServerError::illegal_argument(
                "no obcluster or obregion",
            ));
        }
        let id = (self.ob_cluster_id > 0).then_some(self.ob_cluster_id);
        Ok((self.ob_cluster.as_str(), id))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

const SERVER_LIST_FIELDS: [&str; 2] = ["RsList", "ReadonlyRsList"];

/// The document and every server entry must be objects.
fn require_object_shape(value: &JsonValue) -> std::result::Result<(), String> {
    let JsonValue::Object(fields) = value else {
        return Err(format!("expected a JSON object, got {}", json_kind(value)));
    };
    for name in SERVER_LIST_FIELDS {
        let Some(JsonValue::Array(entries)) = fields.get(name) else {
            continue;
        };
        if let Some(entry) = entries.iter().find(|entry| !entry.is_object()) {
            return Err(format!(
                "{name} entries must be objects, got {}",
                json_kind(entry)
            ));
        }
    }
    Ok(())
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
