//! Proxy bootstrap documents derived from the set of registered clusters.

use crate::core::Result;
use crate::model::{ProxyConfig, ProxyConfigVersionOnly, ProxyConfigWithTemplate};
use crate::server::params::version_only;
use crate::server::response::ApiResponse;
use crate::server::router::RequestContext;
use crate::server::state::AppState;

pub async fn get_proxy_config(state: &AppState, request: &RequestContext) -> Result<ApiResponse> {
    let version_only = version_only(&request.query)?;
    let config = ProxyConfig::new(&state.service_address, cluster_names(state).await?)?;
    if version_only {
        return Ok(ApiResponse::success(&ProxyConfigVersionOnly::new(
            config.version,
        )));
    }
    Ok(ApiResponse::success(&config))
}

pub async fn get_proxy_config_with_template(
    state: &AppState,
    request: &RequestContext,
) -> Result<ApiResponse> {
    let version_only = version_only(&request.query)?;
    let config =
        ProxyConfigWithTemplate::new(&state.service_address, cluster_names(state).await?)?;
    if version_only {
        return Ok(ApiResponse::success(&ProxyConfigVersionOnly::new(
            config.version,
        )));
    }
    Ok(ApiResponse::success(&config))
}

async fn cluster_names(state: &AppState) -> Result<Vec<String>> {
    let records = state
        .store
        .all()
        .await
        .map_err(|e| e.context("query ob clusters"))?;
    Ok(records.into_iter().map(|record| record.name).collect())
}
