//! HTTP server lifecycle.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ServerError;

/// Serves the application router until shut down.
///
/// `start()` binds the listener and spawns the server task; `shutdown()`
/// stops it gracefully.
pub struct WebServer {
    addr: SocketAddr,
    router: Option<Router>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WebServer {
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router: Some(router),
            local_addr: None,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Bind the listener and spawn the server.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        let addr = self.addr;
        let bind_failed = move |reason: String| ServerError::BindFailed { addr, reason };

        let Some(app) = self.router.take() else {
            return Err(bind_failed("server already started".to_string()));
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| bind_failed(e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| bind_failed(e.to_string()))?;

        tracing::info!("Listening on http://{}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("Web server shutting down");
                })
                .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        self.handle = Some(handle);
        Ok(local_addr)
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
