//! WebSocket fan-out to transcript viewers

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stenolink_core::manager::matches_pattern;
use stenolink_core::SessionManager;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// WebSocket server broadcasting transcript updates to viewers.
///
/// Every live event batch and every refresh batch is forwarded as a
/// distinct JSON message, so viewers can replicate the windowed splice
/// client-side.
pub struct ViewerServer {
    manager: Arc<SessionManager>,
    addr: SocketAddr,
    client_counter: AtomicU64,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<crate::metrics::Metrics>>,
}

impl ViewerServer {
    pub fn new(manager: Arc<SessionManager>, addr: SocketAddr) -> Self {
        Self {
            manager,
            addr,
            client_counter: AtomicU64::new(0),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Attach a metrics collector
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: Arc<crate::metrics::Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Start the viewer server
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Stenolink viewer server listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let client_id = format!(
                        "viewer:{}:{}",
                        peer_addr,
                        self.client_counter.fetch_add(1, Ordering::Relaxed)
                    );
                    let manager = self.manager.clone();
                    #[cfg(feature = "metrics")]
                    let metrics = self.metrics.clone();

                    tokio::spawn(async move {
                        #[cfg(feature = "metrics")]
                        if let Some(ref m) = metrics {
                            m.record_connection("viewer");
                        }

                        let result =
                            Self::handle_connection(stream, client_id.clone(), manager).await;

                        #[cfg(feature = "metrics")]
                        if let Some(ref m) = metrics {
                            m.record_disconnection("viewer");
                        }

                        if let Err(e) = result {
                            error!(client = %client_id, error = %e, "Viewer connection error");
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
        stream: TcpStream,
        client_id: String,
        manager: Arc<SessionManager>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws_stream = accept_async(stream).await?;
        let (mut write, mut read) = ws_stream.split();

        info!(client = %client_id, "Viewer connected");

        // Viewers follow every session until they send a pattern.
        let mut pattern = String::from("*");
        let mut update_rx = manager.subscribe();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            pattern = text.trim().to_string();
                            if pattern.is_empty() {
                                pattern = "*".into();
                            }
                            debug!(client = %client_id, pattern = %pattern, "Viewer subscription updated");
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!(client = %client_id, "Viewer disconnected");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types
                        }
                        Some(Err(e)) => {
                            error!(client = %client_id, error = %e, "Viewer read error");
                            break;
                        }
                    }
                }

                result = update_rx.recv() => {
                    match result {
                        Ok(update) => {
                            if !matches_pattern(update.session().as_str(), &pattern) {
                                continue;
                            }
                            let json = match serde_json::to_string(&update) {
                                Ok(json) => json,
                                Err(e) => {
                                    error!(client = %client_id, error = %e, "Update serialization failed");
                                    continue;
                                }
                            };
                            if let Err(e) = write.send(Message::Text(json)).await {
                                error!(client = %client_id, error = %e, "Viewer write error");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(client = %client_id, missed = n, "Viewer lagged behind updates");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
