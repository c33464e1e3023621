pub mod app;
pub mod counter;
pub mod handlers;
pub mod lifecycle;
pub mod params;
pub mod response;
pub mod router;
pub mod state;
pub mod trace;

pub use app::{ConfigServer, SERVICES_PATH, build_router};
pub use counter::{SessionCounter, SessionGuard};
pub use lifecycle::{HttpServer, LifecycleState};
pub use response::ApiResponse;
pub use router::{Action, DispatchTable, Operation};
pub use state::AppState;
