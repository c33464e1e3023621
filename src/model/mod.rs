pub mod idc_region;
pub mod proxy_config;
pub mod root_service;

pub use idc_region::{IdcRegionInfo, ObClusterIdcRegionInfo};
pub use proxy_config::{
    MetaDatabaseInfo, ProxyConfig, ProxyConfigVersionOnly, ProxyConfigWithTemplate,
    RootServiceInfoUrl, canonical_json, content_version,
};
pub use root_service::{RootServiceInfo, ServerEntry};
