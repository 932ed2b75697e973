//! Request parameters and response bodies for the logs endpoint

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use sloggo_protocol::LogEntry;
use sloggo_store::{
    ChartDataPoint, Direction, FacetMetadata, FilterCondition, LogFilter, LogQuery, SortField,
    SortOrder,
};

/// Default page size
const DEFAULT_PAGE_SIZE: usize = 50;

/// Clock-skew allowance on the pagination cursor
fn cursor_skew() -> Duration {
    Duration::minutes(1)
}

/// Raw query parameters of `GET /api/logs`.
///
/// Everything arrives as strings and is parsed leniently: implausible
/// values fall back to their defaults rather than failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogsQuery {
    /// Page size, int > 0 (default 50)
    pub size: Option<String>,

    /// Pagination boundary, epoch milliseconds (default now)
    pub cursor: Option<String>,

    /// `next` | `prev` (default `next`)
    pub direction: Option<String>,

    pub hostname: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,

    /// Comma-separated facility numbers
    pub facility: Option<String>,

    /// Comma-separated severity numbers
    pub severity: Option<String>,

    /// `min-max` priority range
    pub priority: Option<String>,

    /// `startMs-endMs` absolute range
    pub timestamp: Option<String>,

    /// `field.asc` | `field.desc` (default `timestamp.desc`)
    pub sort: Option<String>,
}

impl LogsQuery {
    /// Translate the raw parameters into a store query.
    ///
    /// The cursor is clamped to `now + 1 min` for clock-skew tolerance.
    pub fn to_log_query(&self, now: DateTime<Utc>) -> LogQuery {
        let limit = self
            .size
            .as_deref()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let max_cursor = now + cursor_skew();
        let cursor = self
            .cursor
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|ts| ts.min(max_cursor))
            .unwrap_or(max_cursor);

        let direction = Direction::parse(self.direction.as_deref().unwrap_or("next"));

        let (sort_field, sort_order) = parse_sort(self.sort.as_deref());

        LogQuery {
            filter: self.to_filter(),
            cursor,
            direction,
            sort_field,
            sort_order,
            limit,
        }
    }

    fn to_filter(&self) -> LogFilter {
        let mut filter = LogFilter::new();

        if let Some(values) = self.severity.as_deref().map(parse_int_set)
            && !values.is_empty()
        {
            filter = filter.with(FilterCondition::Severity(values));
        }
        if let Some(values) = self.facility.as_deref().map(parse_int_set)
            && !values.is_empty()
        {
            filter = filter.with(FilterCondition::Facility(values));
        }

        if let Some(value) = non_empty(&self.hostname) {
            filter = filter.with(FilterCondition::Hostname(value));
        }
        if let Some(value) = non_empty(&self.app_name) {
            filter = filter.with(FilterCondition::AppName(value));
        }
        if let Some(value) = non_empty(&self.proc_id) {
            filter = filter.with(FilterCondition::ProcId(value));
        }
        if let Some(value) = non_empty(&self.msg_id) {
            filter = filter.with(FilterCondition::MsgId(value));
        }

        if let Some((min, max)) = self.priority.as_deref().and_then(parse_range) {
            if let Ok(min) = u8::try_from(min) {
                filter = filter.with(FilterCondition::PriorityMin(min));
            }
            if let Ok(max) = u8::try_from(max) {
                filter = filter.with(FilterCondition::PriorityMax(max));
            }
        }

        if let Some((start_ms, end_ms)) = self.timestamp.as_deref().and_then(parse_range)
            && let (Some(start), Some(end)) = (
                Utc.timestamp_millis_opt(start_ms).single(),
                Utc.timestamp_millis_opt(end_ms).single(),
            )
        {
            filter = filter
                .with(FilterCondition::StartDate(start))
                .with(FilterCondition::EndDate(end));
        }

        filter
    }
}

/// Parse `field.asc` / `field.desc`; defaults to `timestamp.desc`
fn parse_sort(sort: Option<&str>) -> (SortField, SortOrder) {
    match sort.and_then(|s| s.split_once('.')) {
        Some((field, order)) => (SortField::parse(field), SortOrder::parse(order)),
        None => (SortField::default(), SortOrder::default()),
    }
}

/// Parse a comma-separated integer set, skipping unparseable items
fn parse_int_set(s: &str) -> Vec<u8> {
    s.split(',').filter_map(|v| v.trim().parse().ok()).collect()
}

/// Parse a `min-max` integer pair
fn parse_range(s: &str) -> Option<(i64, i64)> {
    let (lo, hi) = s.split_once('-')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

/// A log entry as serialized on the wire
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLogEntry {
    pub id: i64,
    pub facility: u8,
    pub severity: u8,
    pub version: u16,
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub app_name: String,
    pub proc_id: String,
    pub msg_id: String,
    pub message: String,

    /// Canonical structured data, absent when the entry carries none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

impl From<LogEntry> for ApiLogEntry {
    fn from(entry: LogEntry) -> Self {
        let structured_data = if entry.has_structured_data() {
            match serde_json::from_str(&entry.structured_data) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(
                        row_id = entry.row_id,
                        error = %e,
                        "stored structured data is not valid JSON"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            id: entry.row_id,
            facility: entry.facility,
            severity: entry.severity,
            version: entry.version,
            timestamp: entry.timestamp,
            hostname: entry.hostname,
            app_name: entry.app_name,
            proc_id: entry.proc_id,
            msg_id: entry.msg_id,
            message: entry.message,
            structured_data,
        }
    }
}

/// Metadata block of the logs response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsMeta {
    pub total_row_count: i64,
    pub filter_row_count: i64,
    pub chart_data: Vec<ChartDataPoint>,
    pub facets: BTreeMap<String, FacetMetadata>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Body of `GET /api/logs`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub data: Vec<ApiLogEntry>,
    pub meta: LogsMeta,
    /// Epoch milliseconds of the last returned entry; null on an empty page
    pub next_cursor: Option<i64>,
    /// Epoch milliseconds of the first returned entry; null on an empty page
    pub prev_cursor: Option<i64>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
