//! Stenolink Transport Layer
//!
//! Provides network transport for Stenolink:
//! - Feed: TCP ingest for vendor feed connections
//! - Viewer: WebSocket fan-out of transcript updates
//! - Metrics: Prometheus metrics (optional feature)

#[cfg(feature = "feed")]
pub mod feed;
pub mod handler;
#[cfg(feature = "metrics")]
pub mod metrics;
#[cfg(feature = "viewer")]
pub mod viewer;

#[cfg(feature = "feed")]
pub use feed::FeedServer;
pub use handler::FeedHandler;
#[cfg(feature = "metrics")]
pub use metrics::{Metrics, MetricsServer};
#[cfg(feature = "viewer")]
pub use viewer::ViewerServer;
