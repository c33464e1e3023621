//! Proxy bootstrap documents and their content versions.
//!
//! A version is the MD5 of the canonical JSON of every variable input,
//! concatenated in a fixed order. Cluster names are deduplicated and sorted
//! before they reach the hash, so the order they were gathered in never
//! matters.
//!
//! Canonical JSON escapes `&`, `<`, `>`, U+2028 and U+2029 the way the
//! previous registry implementation did. Proxies holding a version computed
//! there keep seeing the same value for unchanged inputs.

use crate::core::Result;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const PROXY_BIN_URL_PATH: &str = "/client?Action=GetObProxy";
pub const CONFIG_URL_PATH: &str = "/services?Action=ObRootServiceInfo&ObCluster=";
pub const CONFIG_URL_TEMPLATE_V1_PATH: &str =
    "/services?Action=ObRootServiceInfo&ObRegion=${ObRegion}";
pub const CONFIG_URL_TEMPLATE_V2_PATH: &str =
    "/services?Action=ObRootServiceInfo&version=2&ObCluster=${ObCluster}&ObClusterId=${OBClusterId}";
const META_DATABASE_URL_PATH: &str =
    "/services?Action=ObRootServiceInfo&User_ID=alibaba&UID=admin&ObRegion=obdv1";
const MASKED: &str = "***";

/// Connection description of the proxy metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDatabaseInfo {
    #[serde(rename = "DataBase")]
    pub database: String,
    #[serde(rename = "MetaDataBase")]
    pub config_url: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "User")]
    pub user: String,
}

impl MetaDatabaseInfo {
    pub fn new_default(service_address: &str) -> Self {
        Self {
            database: MASKED.to_string(),
            config_url: format!("{service_address}{META_DATABASE_URL_PATH}"),
            password: MASKED.to_string(),
            user: MASKED.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootServiceInfoUrl {
    #[serde(rename = "ObRegion")]
    pub ob_cluster: String,
    #[serde(rename = "ObRootServiceInfoUrl")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(rename = "ObProxyBinUrl")]
    pub proxy_bin_url: String,
    #[serde(rename = "ObProxyDatabaseInfo")]
    pub meta_database: MetaDatabaseInfo,
    #[serde(rename = "ObRootServiceInfoUrlList")]
    pub config_url_list: Vec<RootServiceInfoUrl>,
    #[serde(rename = "Version")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfigWithTemplate {
    #[serde(rename = "ObProxyBinUrl")]
    pub proxy_bin_url: String,
    #[serde(rename = "ObProxyDatabaseInfo")]
    pub meta_database: MetaDatabaseInfo,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "ObClusterList")]
    pub ob_clusters: Vec<String>,
    #[serde(rename = "ObRootServiceInfoUrlTemplate")]
    pub template_v1: String,
    #[serde(rename = "ObRootServiceInfoUrlTemplateV2")]
    pub template_v2: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfigVersionOnly {
    #[serde(rename = "Version")]
    pub version: String,
}

impl ProxyConfigVersionOnly {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl ProxyConfig {
    /// Hash order: url list, metadata store, binary url.
    pub fn new<I, S>(service_address: &str, cluster_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let proxy_bin_url = format!("{service_address}{PROXY_BIN_URL_PATH}");
        let meta_database = MetaDatabaseInfo::new_default(service_address);
        let config_url_list: Vec<RootServiceInfoUrl> = sorted_distinct(cluster_names)
            .into_iter()
            .map(|name| RootServiceInfoUrl {
                url: format!("{service_address}{CONFIG_URL_PATH}{name}"),
                ob_cluster: name,
            })
            .collect();

        let urls_json = canonical_json(&config_url_list)?;
        let meta_json = canonical_json(&meta_database)?;
        let version = content_version(&[&urls_json, &meta_json, &proxy_bin_url]);

        Ok(Self {
            proxy_bin_url,
            meta_database,
            config_url_list,
            version,
        })
    }
}

impl ProxyConfigWithTemplate {
    /// Hash order: cluster names, template v1, template v2, metadata store,
    /// binary url.
    pub fn new<I, S>(service_address: &str, cluster_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let proxy_bin_url = format!("{service_address}{PROXY_BIN_URL_PATH}");
        let meta_database = MetaDatabaseInfo::new_default(service_address);
        let ob_clusters = sorted_distinct(cluster_names);
        let template_v1 = format!("{service_address}{CONFIG_URL_TEMPLATE_V1_PATH}");
        let template_v2 = format!("{service_address}{CONFIG_URL_TEMPLATE_V2_PATH}");

        let names_json = canonical_json(&ob_clusters)?;
        let v1_json = canonical_json(&template_v1)?;
        let v2_json = canonical_json(&template_v2)?;
        let meta_json = canonical_json(&meta_database)?;
        let version = content_version(&[
            &names_json,
            &v1_json,
            &v2_json,
            &meta_json,
            &proxy_bin_url,
        ]);

        Ok(Self {
            proxy_bin_url,
            meta_database,
            version,
            ob_clusters,
            template_v1,
            template_v2,
        })
    }
}

fn sorted_distinct<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Lowercase hex MD5 over the concatenated parts.
pub fn content_version(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let raw = serde_json::to_string(value)?;
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("\\u0026"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    Ok(out)
}
