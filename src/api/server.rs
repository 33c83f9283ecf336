//! API server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.
//! The mirror relay runs beside the server and stops with it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::core_state::CoreState;
use crate::mirror::relay::{spawn_relay, RelayTask};

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_task: tokio::task::JoinHandle<()>,
    relay: Option<RelayTask>,
}

impl ApiServer {
    /// Stop accepting requests, then stop the relay.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
        let _ = self.server_task.await;
        if let Some(relay) = self.relay.take() {
            relay.shutdown().await;
        }
    }
}

/// Start the API server and the mirror relay on `addr`.
pub async fn start_server_on(core: Arc<CoreState>, addr: SocketAddr) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let relay = spawn_relay(
        core.relay().clone(),
        core.config.records_db_path(),
        Duration::from_secs(core.config.relay_interval_secs),
        core.config.relay_batch,
    );

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        server_task,
        relay: Some(relay),
    })
}

/// Run until Ctrl-C.
pub async fn serve(core: Arc<CoreState>) -> Result<(), String> {
    let server = start_server_on(core.clone(), core.config.bind_addr).await?;
    println!("{} listening on http://{}", crate::config::APP_NAME, server.addr);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;
    server.shutdown().await;
    Ok(())
}
