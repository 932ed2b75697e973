//! Sloggo API
//!
//! HTTP read surface for the collector, built on Axum.
//!
//! # Endpoints
//!
//! - `GET /api/health` - liveness probe
//! - `GET /api/logs` - filtered/paginated logs, facets and the severity
//!   chart in one response
//!
//! The logs endpoint fans its three store sub-queries out concurrently and
//! joins them before responding; a client disconnect cancels all three
//! together. CORS is wide open (`*`) for the separate browser front-end.

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::AppState;
pub use types::{ApiLogEntry, LogsMeta, LogsQuery, LogsResponse};
