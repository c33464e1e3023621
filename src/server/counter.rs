use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of requests currently being processed.
///
/// Every [`SessionCounter::increment`] must be paired with exactly one
/// [`SessionCounter::decrement`]; [`SessionCounter::enter`] does the pairing
/// through a drop guard, which also covers handlers that panic.
#[derive(Debug, Default)]
pub struct SessionCounter {
    sessions: AtomicUsize,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.sessions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement(&self) {
        self.sessions.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Count one session until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> SessionGuard {
        self.increment();
        SessionGuard {
            counter: Arc::clone(self),
        }
    }
}

#[derive(Debug)]
pub struct SessionGuard {
    counter: Arc<SessionCounter>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.counter.decrement();
    }
}
