//! Route handlers and router assembly

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::state::AppState;
use crate::types::{ApiLogEntry, LogsMeta, LogsQuery, LogsResponse};

/// Build the complete API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health).options(preflight))
        .route("/api/logs", get(logs).options(preflight))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// CORS for the separate browser front-end: any origin, GET and OPTIONS
/// only, Content-Type allowed
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Liveness probe
async fn health() -> &'static str {
    "Sloggo backend is running"
}

/// Non-preflight OPTIONS requests get an immediate 200
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

/// Filtered/paginated logs plus facets and the severity chart.
///
/// The three store sub-queries run concurrently and share this request's
/// cancellation: a dropped client aborts all of them.
async fn logs(
    State(state): State<AppState>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogsResponse>> {
    let request_start = Instant::now();

    let query = params.to_log_query(Utc::now());
    let cursor = query.cursor;
    let filter = query.filter.clone();

    let queries_start = Instant::now();
    let (page, facets, chart_data) = tokio::try_join!(
        state.store.query_logs(&query),
        state.store.query_facets(&filter),
        state.store.query_chart(cursor, &filter),
    )?;

    if state.debug {
        tracing::debug!(
            elapsed_ms = queries_start.elapsed().as_millis() as u64,
            rows = page.entries.len(),
            "store sub-queries complete"
        );
    }

    let next_cursor = page.entries.last().map(|e| e.timestamp.timestamp_millis());
    let prev_cursor = page.entries.first().map(|e| e.timestamp.timestamp_millis());

    let response = LogsResponse {
        data: page.entries.into_iter().map(ApiLogEntry::from).collect(),
        meta: LogsMeta {
            total_row_count: page.total_count,
            filter_row_count: page.filtered_count,
            chart_data,
            facets,
            metadata: serde_json::Map::new(),
        },
        next_cursor,
        prev_cursor,
    };

    if state.debug {
        tracing::debug!(
            elapsed_ms = request_start.elapsed().as_millis() as u64,
            "logs request complete"
        );
    }

    Ok(Json(response))
}
