//! Root-service topology: read, write, delete and region info.

use crate::core::{ConfigServerError, Result};
use crate::model::{ObClusterIdcRegionInfo, RootServiceInfo};
use crate::server::params::{ProtocolVersion, RootServiceParam};
use crate::server::response::ApiResponse;
use crate::server::router::RequestContext;
use crate::server::state::AppState;
use crate::storage::ClusterRecord;
use tracing::{debug, info};

pub async fn get_root_service_info(
    state: &AppState,
    request: &RequestContext,
) -> Result<ApiResponse> {
    let param = RootServiceParam::from_query(&request.query)?;
    let cluster = param.require_cluster()?;
    let record = find_record(state, cluster, param.ob_cluster_id).await?;

    let info = RootServiceInfo::from_json(&record.root_service_json).map_err(|e| {
        ConfigServerError::storage(format!(
            "stored root service info of {}:{} is unreadable: {e}",
            record.name, record.cluster_id
        ))
    })?;
    Ok(ApiResponse::success(&info))
}

/// Upsert the topology in the body. Identity given in the query must agree
/// with the body; missing body fields are taken from the query.
pub async fn create_or_update_root_service_info(
    state: &AppState,
    request: &RequestContext,
) -> Result<ApiResponse> {
    let param = RootServiceParam::from_query(&request.query)?;
    let body = std::str::from_utf8(&request.body)
        .map_err(|e| ConfigServerError::illegal_argument(format!("body is not utf-8: {e}")))?;
    if body.trim().is_empty() {
        return Err(ConfigServerError::illegal_argument(
            "root service info is required in body",
        ));
    }

    let mut info = RootServiceInfo::from_json(body)?;
    if !param.ob_cluster.is_empty() {
        if info.ob_cluster.is_empty() {
            info.ob_cluster = param.ob_cluster.clone();
        } else if info.ob_cluster != param.ob_cluster {
            return Err(ConfigServerError::illegal_argument(format!(
                "cluster '{}' in query does not match '{}' in body",
                param.ob_cluster, info.ob_cluster
            )));
        }
    }
    if let Some(id) = param.ob_cluster_id {
        if info.ob_cluster_id <= 0 {
            info.ob_cluster_id = id;
        } else if info.ob_cluster_id != id {
            return Err(ConfigServerError::illegal_argument(format!(
                "cluster id {id} in query does not match {} in body",
                info.ob_cluster_id
            )));
        }
    }
    info.normalize();

    let (cluster, cluster_id) = info.identity()?;
    let cluster_id = cluster_id.ok_or_else(|| {
        ConfigServerError::unsupported("ob cluster id is required to save root service info")
    })?;
    let json = info.to_json()?;
    state
        .store
        .upsert(cluster, cluster_id, &info.cluster_type, &json)
        .await
        .map_err(|e| e.context("save root service info"))?;

    info!(cluster, cluster_id, cluster_type = %info.cluster_type, "root service info saved");
    Ok(ApiResponse::success(&info))
}

/// Only the current protocol may delete, and only a fully identified record.
pub async fn delete_root_service_info(
    state: &AppState,
    request: &RequestContext,
) -> Result<ApiResponse> {
    let param = RootServiceParam::from_query(&request.query)?;
    if param.version == ProtocolVersion::Legacy {
        return Err(ConfigServerError::unsupported(
            "delete root service info is not supported in version 1",
        ));
    }
    let cluster = param.require_cluster()?;
    let cluster_id = param.ob_cluster_id.ok_or_else(|| {
        ConfigServerError::unsupported("ob cluster id is required to delete root service info")
    })?;

    let deleted = state
        .store
        .delete(cluster, cluster_id)
        .await
        .map_err(|e| e.context("delete root service info"))?;
    if !deleted {
        return Err(ConfigServerError::unsupported(format!(
            "no root service info of {cluster}:{cluster_id} to delete"
        )));
    }

    info!(cluster, cluster_id, "root service info deleted");
    Ok(ApiResponse::success(&()))
}

pub async fn get_idc_region_info(
    state: &AppState,
    request: &RequestContext,
) -> Result<ApiResponse> {
    let param = RootServiceParam::from_query(&request.query)?;
    let cluster = param.require_cluster()?;
    let record = find_record(state, cluster, param.ob_cluster_id).await?;
    Ok(ApiResponse::success(&ObClusterIdcRegionInfo::new(
        cluster,
        record.cluster_id,
    )))
}

async fn find_record(
    state: &AppState,
    cluster: &str,
    cluster_id: Option<i64>,
) -> Result<ClusterRecord> {
    let records = state
        .store
        .find(cluster, cluster_id)
        .await
        .map_err(|e| e.context("query root service info"))?;
    debug!(cluster, ?cluster_id, matches = records.len(), "root service info lookup");

    preferred(records).ok_or_else(|| match cluster_id {
        Some(id) => ConfigServerError::not_found(format!("no root service info of {cluster}:{id}")),
        None => ConfigServerError::not_found(format!("no root service info of {cluster}")),
    })
}

/// The primary record when there is one, otherwise the lowest id.
fn preferred(records: Vec<ClusterRecord>) -> Option<ClusterRecord> {
    let index = records
        .iter()
        .position(ClusterRecord::is_primary)
        .unwrap_or(0);
    records.into_iter().nth(index)
}
