//! Prometheus metrics for the game server.
//!
//! Exposes a scrape endpoint in Prometheus text format. Metrics cover the
//! gateway (connections, frames) and the game layer (rooms, rounds).

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with its own HTTP listener.
/// Metrics become available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

/// A WebSocket connection opened.
pub fn connection_opened() {
    metrics::gauge!("lp_connections_active").increment(1.0);
    metrics::counter!("lp_connections_total").increment(1);
}

/// A WebSocket connection closed.
pub fn connection_closed() {
    metrics::gauge!("lp_connections_active").decrement(1.0);
}

/// An inbound frame was handled, labeled by its type tag.
pub fn frame_handled(kind: &str) {
    metrics::counter!("lp_frames_total", "type" => kind.to_string()).increment(1);
}

/// An inbound frame was rejected by the rate limiter.
pub fn frame_rate_limited() {
    metrics::counter!("lp_frames_rate_limited_total").increment(1);
}

/// Current number of live rooms.
pub fn rooms_active(count: usize) {
    metrics::gauge!("lp_rooms_active").set(count as f64);
}
