//! Listener ownership, admission control and the drain-then-close shutdown.
//!
//! States: `Running` until the governing shutdown future resolves, then
//! `Stopping` while the session counter is above zero (polled at a fixed
//! interval), then `Stopped` once the listener is closed.

use super::counter::{SessionCounter, SessionGuard};
use super::response::ApiResponse;
use crate::config::ShutdownConfig;
use crate::core::{ConfigServerError, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Stopping,
    Stopped,
}

pub struct HttpServer {
    stopping: AtomicBool,
    counter: Arc<SessionCounter>,
    closed: watch::Sender<bool>,
    shutdown: ShutdownConfig,
}

impl HttpServer {
    pub fn new(shutdown: ShutdownConfig) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            stopping: AtomicBool::new(false),
            counter: Arc::new(SessionCounter::new()),
            closed,
            shutdown,
        }
    }

    pub fn counter(&self) -> &Arc<SessionCounter> {
        &self.counter
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LifecycleState {
        if *self.closed.borrow() {
            LifecycleState::Stopped
        } else if self.is_stopping() {
            LifecycleState::Stopping
        } else {
            LifecycleState::Running
        }
    }

    /// Count the request unless the server is stopping. A rejected request
    /// never touches the counter.
    pub fn admit(&self) -> Option<SessionGuard> {
        if self.is_stopping() {
            return None;
        }
        Some(self.counter.enter())
    }

    /// Enter `Stopping` and close the listener if nothing is in flight.
    pub fn try_close(&self) -> Result<()> {
        self.stopping.store(true, Ordering::SeqCst);
        let sessions = self.counter.current();
        if sessions > 0 {
            return Err(ConfigServerError::SessionsInFlight { sessions });
        }
        self.closed.send_replace(true);
        Ok(())
    }

    /// Poll [`HttpServer::try_close`] until it succeeds or the configured
    /// drain deadline passes. Returns `false` when the deadline cut it short.
    pub async fn drain(&self) -> bool {
        let poll_interval = self.shutdown.poll_interval();
        let deadline = self.shutdown.drain_timeout().map(|t| Instant::now() + t);

        loop {
            match self.try_close() {
                Ok(()) => {
                    info!("server shutdown successfully");
                    return true;
                }
                Err(err) => {
                    if let Some(deadline) = deadline
                        && Instant::now() >= deadline
                    {
                        warn!(
                            sessions = self.counter.current(),
                            "drain deadline reached, closing listener with requests in flight"
                        );
                        self.stopping.store(true, Ordering::SeqCst);
                        self.closed.send_replace(true);
                        return false;
                    }
                    warn!(error = %err, "server shutdown deferred");
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    /// Serve `app` on `listener` until `shutdown` resolves and the drain
    /// completes, or until the listener stops on its own.
    pub async fn run<F>(self: Arc<Self>, listener: TcpListener, app: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr()?;
        info!(address = %address, "listen on address");

        let mut closed = self.closed.subscribe();
        let mut serving = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = closed.wait_for(|closed| *closed).await;
                })
                .await
        });

        let joined = tokio::select! {
            joined = &mut serving => {
                warn!("tcp server exited before shutdown was requested");
                self.stopping.store(true, Ordering::SeqCst);
                self.closed.send_replace(true);
                joined
            }
            _ = shutdown => {
                info!(sessions = self.counter.current(), "shutdown requested, draining");
                if !self.drain().await {
                    serving.abort();
                }
                serving.await
            }
        };

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                error!(error = %err, "tcp server exited with error");
                Err(err.into())
            }
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => Err(ConfigServerError::Io(format!("server task failed: {err}"))),
        }
    }
}

/// Admission middleware: reject while stopping, otherwise hold a session
/// for the lifetime of the request.
pub async fn admission(
    State(server): State<Arc<HttpServer>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(_session) = server.admit() else {
        warn!(uri = %request.uri(), "request rejected, server is shutting down");
        return ApiResponse::service_unavailable("server is shutting down now").into_response();
    };
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn server(drain_timeout_ms: u64) -> Arc<HttpServer> {
        Arc::new(HttpServer::new(ShutdownConfig {
            poll_interval_ms: 10,
            drain_timeout_ms,
        }))
    }

    #[test]
    fn close_fails_while_a_session_is_open() {
        let server = server(0);
        let session = server.admit().unwrap();
        assert_eq!(server.counter().current(), 1);

        let err = server.try_close().unwrap_err();
        assert!(err.to_string().contains("server shutdown failed"));
        assert_eq!(server.state(), LifecycleState::Stopping);

        drop(session);
        assert_eq!(server.counter().current(), 0);
        server.try_close().unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[test]
    fn rejected_requests_never_touch_the_counter() {
        let server = server(0);
        let held = server.admit().unwrap();
        let _ = server.try_close();

        for _ in 0..10 {
            assert!(server.admit().is_none());
        }
        assert_eq!(server.counter().current(), 1);
        drop(held);
        assert_eq!(server.counter().current(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_sessions() {
        let server = server(0);
        let session = server.admit().unwrap();

        let draining = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.drain().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(server.state(), LifecycleState::Stopping);

        drop(session);
        assert!(draining.await.unwrap());
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn drain_deadline_closes_anyway() {
        let server = server(30);
        let _stuck = server.admit().unwrap();

        assert!(!server.drain().await);
        assert_eq!(server.state(), LifecycleState::Stopped);
        assert_eq!(server.counter().current(), 1);
    }

    #[tokio::test]
    async fn run_returns_when_the_listener_stops_first() {
        let server = server(0);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                server
                    .run(listener, Router::new(), std::future::pending())
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        server.closed.send_replace(true);

        let result = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("run must not wait for a shutdown that never comes")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(server.state(), LifecycleState::Stopped);
    }
}
