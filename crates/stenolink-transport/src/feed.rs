//! TCP ingest for vendor feed connections

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stenolink_core::{SessionId, SessionManager};
use stenolink_protocol::Delimiters;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use crate::handler::FeedHandler;

/// TCP server accepting vendor feed connections.
///
/// Each accepted connection gets its own session ID, parser, and
/// transcript; connections are decoded independently and in parallel.
pub struct FeedServer {
    manager: Arc<SessionManager>,
    addr: SocketAddr,
    delimiters: Delimiters,
    session_counter: AtomicU64,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<crate::metrics::Metrics>>,
}

impl FeedServer {
    pub fn new(manager: Arc<SessionManager>, addr: SocketAddr) -> Self {
        Self {
            manager,
            addr,
            delimiters: Delimiters::Control,
            session_counter: AtomicU64::new(0),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the delimiter convention this feed uses
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Attach a metrics collector
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: Arc<crate::metrics::Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start the feed server
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, delimiters = ?self.delimiters, "Stenolink feed server listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    // ip() rather than the full SocketAddr: IPv6 addresses
                    // would otherwise bring brackets into the session ID.
                    let id = format!(
                        "feed:{}:{}:{}",
                        peer_addr.ip(),
                        peer_addr.port(),
                        self.session_counter.fetch_add(1, Ordering::Relaxed)
                    );
                    let session_id = match SessionId::new(&id) {
                        Ok(session_id) => session_id,
                        Err(e) => {
                            error!(error = %e, "Could not build session ID for connection");
                            continue;
                        }
                    };
                    let manager = self.manager.clone();
                    let delimiters = self.delimiters;
                    #[cfg(feature = "metrics")]
                    let metrics = self.metrics.clone();

                    tokio::spawn(async move {
                        #[cfg(feature = "metrics")]
                        if let Some(ref m) = metrics {
                            m.record_connection("feed");
                        }

                        let result =
                            Self::handle_connection(stream, session_id.clone(), manager, delimiters)
                                .await;

                        #[cfg(feature = "metrics")]
                        if let Some(ref m) = metrics {
                            m.record_disconnection("feed");
                        }

                        if let Err(e) = result {
                            error!(session = %session_id, error = %e, "Feed connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        session_id: SessionId,
        manager: Arc<SessionManager>,
        delimiters: Delimiters,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(session = %session_id, "Feed connected");

        let mut handler = FeedHandler::with_delimiters(session_id.clone(), manager, delimiters);
        let mut buf = vec![0u8; 4096];

        loop {
            match stream.read(&mut buf).await {
                Ok(0) => {
                    info!(session = %session_id, "Feed disconnected");
                    break;
                }
                Ok(n) => {
                    handler.process(&buf[..n]);
                }
                Err(e) => {
                    error!(session = %session_id, error = %e, "Read error");
                    break;
                }
            }
        }

        handler.cleanup();
        Ok(())
    }
}
