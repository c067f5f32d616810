//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::engine::EngineLauncher;
use crate::monitoring::MonitoringControl;
use crate::ws::ConnectionManager;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server and the `/shutdown` route
/// share.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolves once `trigger` has been called.
    pub async fn wait(mut rx: broadcast::Receiver<()>) {
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Tears services down in reverse startup order.
pub struct ShutdownSequencer {
    done: AtomicBool,
    monitoring: Option<Arc<dyn MonitoringControl>>,
    connections: ConnectionManager,
    engine: Arc<dyn EngineLauncher>,
}

impl ShutdownSequencer {
    pub fn new(
        monitoring: Option<Arc<dyn MonitoringControl>>,
        connections: ConnectionManager,
        engine: Arc<dyn EngineLauncher>,
    ) -> Self {
        Self {
            done: AtomicBool::new(false),
            monitoring,
            connections,
            engine,
        }
    }

    /// Stop monitoring, close WebSocket clients, stop the engine.
    ///
    /// Errors are logged and do not interrupt later steps. Returns false if
    /// shutdown already ran.
    pub async fn run(&self) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            tracing::debug!("Shutdown already performed");
            return false;
        }
        tracing::info!("Shutting down services");

        if let Some(monitoring) = &self.monitoring {
            match monitoring.stop_monitoring().await {
                Ok(()) => tracing::info!("Monitoring stopped"),
                Err(e) => tracing::error!(error = %e, "Failed to stop monitoring"),
            }
        }

        let closed = self.connections.close_all();
        tracing::info!(closed, "WebSocket connections closed");

        if let Err(e) = self.engine.shutdown().await {
            tracing::error!(error = %e, "Failed to stop voice engine");
        }

        tracing::info!("Shutdown complete");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::{count, SpyEngine, SpyMonitoring};

    #[tokio::test]
    async fn test_shutdown_runs_once() {
        let monitoring = Arc::new(SpyMonitoring::default());
        let engine = Arc::new(SpyEngine::ready_on(1));
        let connections = ConnectionManager::new();
        let (_id, mut rx) = connections.register();

        let sequencer = ShutdownSequencer::new(
            Some(monitoring.clone()),
            connections.clone(),
            engine.clone(),
        );

        assert!(sequencer.run().await);
        assert!(!sequencer.run().await);

        assert_eq!(count(&monitoring.stops), 1);
        assert_eq!(count(&engine.stops), 1);
        assert!(connections.is_empty());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_without_monitoring() {
        let engine = Arc::new(SpyEngine::never_ready());
        let sequencer = ShutdownSequencer::new(None, ConnectionManager::new(), engine.clone());

        assert!(sequencer.run().await);
        assert_eq!(count(&engine.stops), 1);
    }

    #[tokio::test]
    async fn test_trigger_wakes_subscribers() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(Shutdown::wait(shutdown.subscribe()));
        shutdown.trigger();
        waiter.await.unwrap();
    }
}
