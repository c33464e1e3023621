//! Config server for a distributed database: stores each cluster's
//! root-service topology and serves it, plus derived proxy bootstrap
//! documents, over a single action-dispatched HTTP endpoint.

pub mod config;
pub mod core;
pub mod logger;
pub mod model;
pub mod server;
pub mod storage;

pub use config::ConfigServerConfig;
pub use core::{ConfigServerError, Result};
pub use server::{ApiResponse, AppState, ConfigServer, HttpServer, build_router};
pub use storage::{ClusterStore, FileClusterStore, InMemoryClusterStore};
