// src/api.rs
//! JSON adapter for the presentation layer.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::aggregator::NewsAggregator;
use crate::error::AggregatorError;
use crate::ingest::types::{NewsItem, SourceWarning};
use crate::stats::SourceCount;

pub const CACHE_HEADER: &str = "x-news-cache";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<NewsAggregator>,
    pub default_window_days: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sources", get(list_sources))
        .route("/news", get(news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Every client error is a 400 with `{"error": "..."}`.
enum ApiError {
    Request(AggregatorError),
    Params(QueryRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let msg = match self {
            ApiError::Request(e) => e.to_string(),
            ApiError::Params(r) => r.body_text(),
        };
        let body = serde_json::json!({ "error": msg });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[derive(serde::Serialize)]
struct SourceOut {
    name: String,
    url: String,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceOut>> {
    let out = state
        .aggregator
        .registry()
        .list_sources()
        .iter()
        .map(|s| SourceOut {
            name: s.name.clone(),
            url: s.url.clone(),
        })
        .collect();
    Json(out)
}

#[derive(serde::Deserialize)]
struct NewsParams {
    /// Comma-separated source names; absent = every registered source.
    #[serde(default)]
    sources: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    days: Option<i64>,
}

#[derive(serde::Serialize)]
struct ItemOut {
    title: String,
    summary: String,
    link: String,
    source: String,
    published_at: Option<DateTime<Utc>>,
    date: String,
}

impl From<NewsItem> for ItemOut {
    fn from(it: NewsItem) -> Self {
        let date = it.display_date();
        Self {
            title: it.title,
            summary: it.summary,
            link: it.link,
            source: it.source,
            published_at: it.published_at,
            date,
        }
    }
}

#[derive(serde::Serialize)]
struct NewsOut {
    items: Vec<ItemOut>,
    stats: Vec<SourceCount>,
    total: usize,
    warnings: Vec<SourceWarning>,
    fetched_at: DateTime<Utc>,
}

async fn news(
    State(state): State<AppState>,
    params: Result<Query<NewsParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(p) = params.map_err(ApiError::Params)?;
    let selected: Vec<String> = match p.sources.as_deref() {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => state.aggregator.registry().names(),
    };
    let days = p
        .days
        .unwrap_or_else(|| i64::from(state.default_window_days));

    let digest = state
        .aggregator
        .news(&selected, p.q.as_deref(), days)
        .await
        .map_err(ApiError::Request)?;

    let status = digest.cache;
    let body = NewsOut {
        items: digest.items.into_iter().map(ItemOut::from).collect(),
        stats: digest.stats,
        total: digest.total,
        warnings: digest.warnings,
        fetched_at: digest.fetched_at,
    };

    let mut resp = Json(body).into_response();
    resp.headers_mut().insert(
        HeaderName::from_static(CACHE_HEADER),
        HeaderValue::from_static(status.as_str()),
    );
    Ok(resp)
}
