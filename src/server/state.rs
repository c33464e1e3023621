use super::router::DispatchTable;
use crate::storage::ClusterStore;
use std::sync::Arc;

/// Everything a handler may consult, injected per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClusterStore>,
    /// `http://vip:port`, prefix of every generated URL.
    pub service_address: String,
    /// Reported in the `Server` field of each response.
    pub server_identity: String,
    pub dispatch: Arc<DispatchTable>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        service_address: impl Into<String>,
        server_identity: impl Into<String>,
    ) -> Self {
        Self {
            store,
            service_address: service_address.into(),
            server_identity: server_identity.into(),
            dispatch: Arc::new(DispatchTable::new()),
        }
    }
}
