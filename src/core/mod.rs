pub mod error;

pub use error::{ConfigServerError, Result};
