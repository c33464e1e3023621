pub mod file;
pub mod memory;
pub mod record;
pub mod store;

pub use file::FileClusterStore;
pub use memory::InMemoryClusterStore;
pub use record::{ClusterRecord, PRIMARY_TYPE, RecordKey};
pub use store::ClusterStore;
