//! Prometheus metrics for Stenolink
//!
//! Connection and session gauges for monitoring a running daemon, exposed
//! in Prometheus text format via HTTP.

use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Stenolink metrics collector
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Connection metrics
    pub connections_total: IntCounterVec,
    pub connections_active: IntGaugeVec,

    // Session metrics, refreshed periodically by the daemon
    pub sessions: IntGauge,
    pub viewer_subscribers: IntGauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let registry = Registry::new();

        let connections_total = IntCounterVec::new(
            Opts::new("stenolink_connections_total", "Total number of connections"),
            &["transport"],
        )
        .unwrap();

        let connections_active = IntGaugeVec::new(
            Opts::new("stenolink_connections_active", "Number of active connections"),
            &["transport"],
        )
        .unwrap();

        let sessions = IntGauge::new(
            "stenolink_sessions",
            "Number of transcript sessions in memory",
        )
        .unwrap();

        let viewer_subscribers = IntGauge::new(
            "stenolink_viewer_subscribers",
            "Number of active broadcast subscribers",
        )
        .unwrap();

        registry.register(Box::new(connections_total.clone())).unwrap();
        registry.register(Box::new(connections_active.clone())).unwrap();
        registry.register(Box::new(sessions.clone())).unwrap();
        registry.register(Box::new(viewer_subscribers.clone())).unwrap();

        Self {
            registry,
            connections_total,
            connections_active,
            sessions,
            viewer_subscribers,
        }
    }

    /// Record a new connection
    pub fn record_connection(&self, transport: &str) {
        self.connections_total.with_label_values(&[transport]).inc();
        self.connections_active.with_label_values(&[transport]).inc();
    }

    /// Record a connection closed
    pub fn record_disconnection(&self, transport: &str) {
        self.connections_active.with_label_values(&[transport]).dec();
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP server for the metrics endpoint
pub struct MetricsServer {
    metrics: Arc<Metrics>,
    addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(metrics: Arc<Metrics>, addr: SocketAddr) -> Self {
        Self { metrics, addr }
    }

    /// Run the metrics HTTP server
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Metrics server listening on http://{}/metrics", self.addr);

        loop {
            match listener.accept().await {
                Ok((mut stream, _)) => {
                    let metrics = self.metrics.clone();

                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        if let Ok(n) = stream.read(&mut buf).await {
                            if n > 0 {
                                let request = String::from_utf8_lossy(&buf[..n]);

                                // Simple HTTP request parsing
                                if request.starts_with("GET /metrics") || request.starts_with("GET / ") {
                                    let body = metrics.export();
                                    let response = format!(
                                        "HTTP/1.1 200 OK\r\n\
                                         Content-Type: text/plain; version=0.0.4; charset=utf-8\r\n\
                                         Content-Length: {}\r\n\
                                         \r\n\
                                         {}",
                                        body.len(),
                                        body
                                    );
                                    let _ = stream.write_all(response.as_bytes()).await;
                                } else if request.starts_with("GET /health") {
                                    let response = "HTTP/1.1 200 OK\r\n\
                                                   Content-Type: text/plain\r\n\
                                                   Content-Length: 2\r\n\
                                                   \r\n\
                                                   OK";
                                    let _ = stream.write_all(response.as_bytes()).await;
                                } else {
                                    let response = "HTTP/1.1 404 Not Found\r\n\
                                                   Content-Length: 0\r\n\
                                                   \r\n";
                                    let _ = stream.write_all(response.as_bytes()).await;
                                }
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept metrics connection");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_counters() {
        let metrics = Metrics::new();
        metrics.record_connection("feed");
        metrics.record_connection("viewer");
        metrics.record_disconnection("viewer");

        let export = metrics.export();
        assert!(export.contains("stenolink_connections_total"));
        assert!(export.contains("stenolink_connections_active"));
    }
}
