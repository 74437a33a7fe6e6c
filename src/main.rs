//! AI news aggregator: binary entrypoint.
//! Boots the Axum HTTP server over the aggregation pipeline.

use ai_news_aggregator::{app, telemetry::Metrics, AppConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` drives the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_news_aggregator=info,ingest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::load_default()?;
    tracing::info!(
        sources = cfg.sources.len(),
        ttl_secs = cfg.cache_ttl_secs,
        per_source = cfg.per_source_limit,
        total = cfg.total_limit,
        "config loaded"
    );

    let metrics = Metrics::init(&cfg)?;
    let router = app(&cfg)?.merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
