//! TCP listener, admission, and per-connection task spawning.

mod handler;

pub use handler::{HandlerState, SessionHandler, MAX_LINE_LENGTH};

use crate::catalog::FileCatalog;
use crate::config::RelayConfig;
use crate::error::ServerError;
use crate::protocol::SERVER_FULL;
use crate::session::{AdmissionController, NameGenerator, SessionRegistry};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after a failed `accept`, so a persistent error (e.g. EMFILE) does not
/// spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// State shared by the accept loop and every session task.
#[derive(Clone)]
pub struct RelayState {
    pub registry: SessionRegistry,
    pub admission: AdmissionController,
    pub names: Arc<NameGenerator>,
    pub catalog: FileCatalog,
}

impl RelayState {
    pub fn new(admission: AdmissionController, catalog: FileCatalog) -> Self {
        Self {
            registry: SessionRegistry::new(),
            admission,
            names: Arc::new(NameGenerator::new()),
            catalog,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            AdmissionController::new(config.max_clients),
            FileCatalog::new(config.repository.clone()),
        )
    }
}

/// Bound relay server, ready to accept connections.
pub struct RelayServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: RelayState,
}

impl RelayServer {
    /// Bind the listening socket described by `config`.
    pub async fn bind(config: &RelayConfig) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        info!(
            addr = %local_addr,
            max_clients = config.max_clients,
            repository = %config.repository.display(),
            "Relay server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            state: RelayState::from_config(config),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Accept connections until `cancel` fires.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Relay server shutting down");
                    break;
                }
                res = self.listener.accept() => {
                    if let Some((stream, peer)) = accept_or_backoff(res).await {
                        self.admit(stream, peer);
                    }
                }
            }
        }
    }

    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let Some(permit) = self.state.admission.try_acquire() else {
            warn!(peer = %peer, "Server is full. Rejecting new connection");
            tokio::spawn(reject(stream, peer));
            return;
        };

        debug!(peer = %peer, "Connection admitted");
        let _ = stream.set_nodelay(true);
        let handler = SessionHandler::new(stream, permit, self.state.clone());
        tokio::spawn(async move {
            if let Some(id) = handler.run().await {
                debug!(session = %id, peer = %peer, "Session task finished");
            }
        });
    }
}

/// Pass an accepted connection through; log and back off on failure.
async fn accept_or_backoff<T>(res: io::Result<T>) -> Option<T> {
    match res {
        Ok(accepted) => Some(accepted),
        Err(e) => {
            error!(error = %e, "Error accepting client connection");
            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            None
        }
    }
}

/// Tell a rejected peer why, then close the connection.
async fn reject(mut stream: TcpStream, peer: SocketAddr) {
    let line = format!("{SERVER_FULL}\n");
    if let Err(e) = stream.write_all(line.as_bytes()).await {
        debug!(peer = %peer, error = %e, "Could not deliver SERVER_FULL");
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn accept_failure_backs_off() {
        let started = Instant::now();
        let res: io::Result<()> = Err(io::Error::from_raw_os_error(24));
        assert!(accept_or_backoff(res).await.is_none());
        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_connection_passes_straight_through() {
        let started = Instant::now();
        assert_eq!(accept_or_backoff(Ok(7)).await, Some(7));
        assert!(started.elapsed() < ACCEPT_ERROR_BACKOFF);
    }
}
