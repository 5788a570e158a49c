//! Main RendezvousServer coordination.
//!
//! RendezvousServer owns the configuration and the session registry, and
//! runs the HTTP listener alongside the background sweep.

use crate::cleanup::spawn_sweep_task;
use crate::config::Config;
use crate::error::Result;
use crate::http::build_router;
use crate::manager::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The rendezvous server: configuration plus the shared session registry.
#[derive(Debug)]
pub struct RendezvousServer {
    config: Config,
    manager: Arc<SessionManager>,
    started_at: Instant,
}

impl RendezvousServer {
    /// Create a server with a fresh registry.
    pub fn new(config: Config) -> Self {
        let manager = Arc::new(SessionManager::new(&config.sessions));
        Self::with_manager(config, manager)
    }

    /// Create a server around an existing registry.
    pub fn with_manager(config: Config, manager: Arc<SessionManager>) -> Self {
        Self {
            config,
            manager,
            started_at: Instant::now(),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the session registry.
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Time since the server was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Serve HTTP on `listener` until `shutdown` is cancelled.
    ///
    /// The sweep task runs for as long as the listener does.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let sweep = spawn_sweep_task(
            self.manager.clone(),
            self.config.cleanup.clone(),
            shutdown.clone(),
        );

        let local_addr = listener.local_addr()?;
        tracing::info!("Listening on {}", local_addr);

        let app = build_router(self.clone());
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .await;

        shutdown.cancel();
        if let Err(e) = sweep.await {
            tracing::error!("Sweep task ended abnormally: {}", e);
        }
        tracing::info!("Server stopped");
        result.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_types::HeaderSet;

    #[tokio::test]
    async fn server_shares_its_registry() {
        let server = RendezvousServer::new(Config::default());
        let session = server
            .manager()
            .create_session(HeaderSet::new(), HeaderSet::new());

        assert_eq!(server.manager().len(), 1);
        assert!(server.manager().get_session(&session.id()).is_ok());
        assert_eq!(server.manager().ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let server = Arc::new(RendezvousServer::new(Config::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();

        let running = tokio::spawn(server.serve(listener, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("server should stop on shutdown")
            .unwrap()
            .unwrap();
    }
}
