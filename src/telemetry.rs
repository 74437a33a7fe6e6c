// src/telemetry.rs
//! Prometheus exporter for the `metrics` facade, plus gauges describing the
//! loaded configuration.

use axum::{http::header, response::IntoResponse, routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::AppConfig;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish `cfg` as gauges.
    /// Fails if a recorder is already installed.
    pub fn init(cfg: &AppConfig) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        record_config(cfg);
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let body = handle.render();
                async move { ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response() }
            }),
        )
    }
}

fn record_config(cfg: &AppConfig) {
    describe_gauge!("news_cache_ttl_secs", "Absolute cache TTL in seconds.");
    describe_gauge!("news_sources_configured", "Sources in the registry.");
    describe_gauge!(
        "news_default_window_days",
        "Date window used when a request gives none."
    );
    describe_gauge!("news_fetch_timeout_secs", "Per-source fetch timeout.");

    gauge!("news_cache_ttl_secs").set(cfg.cache_ttl_secs as f64);
    gauge!("news_sources_configured").set(cfg.sources.len() as f64);
    gauge!("news_default_window_days").set(f64::from(cfg.default_window_days));
    gauge!("news_fetch_timeout_secs").set(cfg.fetch_timeout_secs as f64);
}
