//! Process-wide counters exposed over `/metrics` in Prometheus text exposition
//! format (spec.md §11 ambient observability).

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::State;
use axum::response::IntoResponse;

use crate::server::AppState;

/// Connection and gameplay counters for one room process.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub disconnections_total: AtomicU64,
    pub moves_finalized_total: AtomicU64,
    pub engine_rejections_total: AtomicU64,
    pub games_completed_total: AtomicU64,
    pub votes_started_total: AtomicU64,
    pub kicks_total: AtomicU64,
    pub websocket_errors_total: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connect(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        let _ = self.connections_active.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |current| current.checked_sub(1),
        );
        self.disconnections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_finalized(&self) {
        self.moves_finalized_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_engine_rejection(&self) {
        self.engine_rejections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_game_completed(&self) {
        self.games_completed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vote_started(&self) {
        self.votes_started_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_kick(&self) {
        self.kicks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_websocket_error(&self) {
        self.websocket_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Render every counter as Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut buf = String::new();
        counter(
            &mut buf,
            "teamchess_connections_total",
            "Total websocket connections accepted",
            self.connections_total.load(Ordering::Relaxed),
        );
        gauge(
            &mut buf,
            "teamchess_connections_active",
            "Currently connected sockets",
            self.connections_active.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_disconnections_total",
            "Total websocket disconnections",
            self.disconnections_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_moves_finalized_total",
            "Total turns finalized by the analysis engine",
            self.moves_finalized_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_engine_rejections_total",
            "Total finalization attempts the engine could not complete",
            self.engine_rejections_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_games_completed_total",
            "Total games that reached a terminal outcome",
            self.games_completed_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_votes_started_total",
            "Total team/kick/reset votes started",
            self.votes_started_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_kicks_total",
            "Total players removed by a successful kick vote",
            self.kicks_total.load(Ordering::Relaxed),
        );
        counter(
            &mut buf,
            "teamchess_websocket_errors_total",
            "Total websocket-level send/receive errors",
            self.websocket_errors_total.load(Ordering::Relaxed),
        );
        buf
    }
}

fn write_metric(buf: &mut String, name: &str, help: &str, metric_type: &str, value: u64) {
    let _ = writeln!(buf, "# HELP {name} {help}");
    let _ = writeln!(buf, "# TYPE {name} {metric_type}");
    let _ = writeln!(buf, "{name} {value}");
}

fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
    write_metric(buf, name, help, "counter", value);
}

fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
    write_metric(buf, name, help, "gauge", value);
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.render_prometheus()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_then_disconnect_nets_to_zero_active() {
        let metrics = ServerMetrics::new();
        metrics.record_connect();
        metrics.record_connect();
        metrics.record_disconnect();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.connections_total.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn disconnect_below_zero_does_not_underflow() {
        let metrics = ServerMetrics::new();
        metrics.record_disconnect();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.disconnections_total.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn render_prometheus_includes_every_counter() {
        let metrics = ServerMetrics::new();
        metrics.record_connect();
        let text = metrics.render_prometheus();
        assert!(text.contains("teamchess_connections_total 1"));
        assert!(text.contains("# TYPE teamchess_connections_active gauge"));
    }
}
