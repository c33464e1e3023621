//! Operation handlers. Each takes the shared state and the decoded request
//! and returns the envelope to send, or the error that becomes one.

pub mod observer;
pub mod proxy;
