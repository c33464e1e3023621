//! Action-based dispatch for the single `/services` endpoint.
//!
//! The `(method, action)` table is built once when the state is created;
//! anything not in it resolves to [`Operation::InvalidAction`].

use super::handlers::{observer, proxy};
use super::params::{PARAM_ACTION, QueryParams};
use super::response::ApiResponse;
use super::state::AppState;
use super::trace::random_trace_id;
use crate::core::{ConfigServerError, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ObRootServiceInfo,
    GetObProxyConfig,
    GetObRootServiceInfoUrlTemplate,
    ObIdcRegionInfo,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ObRootServiceInfo" => Some(Self::ObRootServiceInfo),
            "GetObProxyConfig" => Some(Self::GetObProxyConfig),
            "GetObRootServiceInfoUrlTemplate" => Some(Self::GetObRootServiceInfoUrlTemplate),
            "ObIDCRegionInfo" => Some(Self::ObIdcRegionInfo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObRootServiceInfo => "ObRootServiceInfo",
            Self::GetObProxyConfig => "GetObProxyConfig",
            Self::GetObRootServiceInfoUrlTemplate => "GetObRootServiceInfoUrlTemplate",
            Self::ObIdcRegionInfo => "ObIDCRegionInfo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetRootServiceInfo,
    CreateOrUpdateRootServiceInfo,
    DeleteRootServiceInfo,
    GetProxyConfig,
    GetProxyConfigWithTemplate,
    GetIdcRegionInfo,
    InvalidAction,
}

impl Operation {
    async fn invoke(self, state: &AppState, request: &RequestContext) -> ApiResponse {
        let result = match self {
            Self::GetRootServiceInfo => observer::get_root_service_info(state, request).await,
            Self::CreateOrUpdateRootServiceInfo => {
                observer::create_or_update_root_service_info(state, request).await
            }
            Self::DeleteRootServiceInfo => {
                observer::delete_root_service_info(state, request).await
            }
            Self::GetProxyConfig => proxy::get_proxy_config(state, request).await,
            Self::GetProxyConfigWithTemplate => {
                proxy::get_proxy_config_with_template(state, request).await
            }
            Self::GetIdcRegionInfo => observer::get_idc_region_info(state, request).await,
            Self::InvalidAction => invalid_action(),
        };

        result.unwrap_or_else(|err| {
            error!(operation = ?self, error = %err, "request failed");
            ApiResponse::from_error(&err)
        })
    }
}

fn invalid_action() -> Result<ApiResponse> {
    Err(ConfigServerError::illegal_argument("invalid action"))
}

#[derive(Debug)]
pub struct DispatchTable {
    routes: HashMap<(Method, Action), Operation>,
}

impl DispatchTable {
    pub fn new() -> Self {
        let routes = HashMap::from([
            (
                (Method::GET, Action::ObRootServiceInfo),
                Operation::GetRootServiceInfo,
            ),
            (
                (Method::POST, Action::ObRootServiceInfo),
                Operation::CreateOrUpdateRootServiceInfo,
            ),
            (
                (Method::DELETE, Action::ObRootServiceInfo),
                Operation::DeleteRootServiceInfo,
            ),
            (
                (Method::GET, Action::GetObProxyConfig),
                Operation::GetProxyConfig,
            ),
            (
                (Method::POST, Action::GetObProxyConfig),
                Operation::GetProxyConfig,
            ),
            (
                (Method::GET, Action::GetObRootServiceInfoUrlTemplate),
                Operation::GetProxyConfigWithTemplate,
            ),
            (
                (Method::POST, Action::GetObRootServiceInfoUrlTemplate),
                Operation::GetProxyConfigWithTemplate,
            ),
            (
                (Method::GET, Action::ObIdcRegionInfo),
                Operation::GetIdcRegionInfo,
            ),
        ]);
        Self { routes }
    }

    pub fn resolve(&self, method: &Method, action: &str) -> Operation {
        Action::parse(action)
            .and_then(|action| self.routes.get(&(method.clone(), action)).copied())
            .unwrap_or(Operation::InvalidAction)
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs of one request, owned by the wrapper for the handler's lifetime.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub query: QueryParams,
    pub body: Bytes,
}

/// Entry point for every request to `/services`. Query and body rejections
/// are answered with the envelope like any handler failure.
pub async fn services(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let trace_id = random_trace_id();
    let query = Query::<QueryParams>::try_from_uri(&uri).map(|Query(query)| query);
    let action = query
        .as_ref()
        .ok()
        .and_then(|query| query.get(PARAM_ACTION).cloned())
        .unwrap_or_default();
    let span = info_span!("request", trace_id = %trace_id, method = %method, action = %action);

    async move {
        info!(uri = %uri, "handle request");

        let mut response = match (query, body) {
            (Ok(query), Ok(body)) => {
                let operation = state.dispatch.resolve(&method, &action);
                let request = RequestContext {
                    trace_id: trace_id.clone(),
                    query,
                    body,
                };
                operation.invoke(&state, &request).await
            }
            (Err(rejection), _) => ApiResponse::from_error(&ConfigServerError::illegal_argument(
                format!("malformed query string: {rejection}"),
            )),
            (_, Err(rejection)) => {
                warn!(status = %rejection.status(), error = %rejection, "request body rejected");
                ApiResponse::from_error(&ConfigServerError::illegal_argument(format!(
                    "unreadable request body: {rejection}"
                )))
            }
        };

        let cost = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        response.stamp(&trace_id, &state.server_identity, cost);
        response.into_response()
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_maps_methods_per_action() {
        let table = DispatchTable::new();
        assert_eq!(
            table.resolve(&Method::GET, "ObRootServiceInfo"),
            Operation::GetRootServiceInfo
        );
        assert_eq!(
            table.resolve(&Method::POST, "ObRootServiceInfo"),
            Operation::CreateOrUpdateRootServiceInfo
        );
        assert_eq!(
            table.resolve(&Method::DELETE, "ObRootServiceInfo"),
            Operation::DeleteRootServiceInfo
        );
        assert_eq!(
            table.resolve(&Method::POST, "GetObRootServiceInfoUrlTemplate"),
            Operation::GetProxyConfigWithTemplate
        );
        assert_eq!(
            table.resolve(&Method::GET, "ObIDCRegionInfo"),
            Operation::GetIdcRegionInfo
        );
    }

    #[test]
    fn actions_outside_their_methods_are_invalid() {
        let table = DispatchTable::new();
        assert_eq!(
            table.resolve(&Method::POST, "ObIDCRegionInfo"),
            Operation::InvalidAction
        );
        assert_eq!(
            table.resolve(&Method::DELETE, "GetObProxyConfig"),
            Operation::InvalidAction
        );
        assert_eq!(table.resolve(&Method::GET, "Nope"), Operation::InvalidAction);
        assert_eq!(table.resolve(&Method::GET, ""), Operation::InvalidAction);
        assert_eq!(
            table.resolve(&Method::PUT, "ObRootServiceInfo"),
            Operation::InvalidAction
        );
    }

    #[test]
    fn action_names_round_trip() {
        for action in [
            Action::ObRootServiceInfo,
            Action::GetObProxyConfig,
            Action::GetObRootServiceInfoUrlTemplate,
            Action::ObIdcRegionInfo,
        ] {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
    }
}
