//! SQLite-backed log store
//!
//! # Connection layout
//!
//! One physical database, two pools:
//!
//! - **writer** - a single connection; appends are serialized here so the
//!   WAL never sees competing writers
//! - **readers** - up to 5 read-only connections (2 kept idle) serving the
//!   query endpoints
//!
//! WAL journalling with `synchronous=NORMAL`: a hard power loss may drop
//! the most recent commits. Timestamps are stored as epoch nanoseconds.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};

use sloggo_protocol::LogEntry;

use crate::Result;
use crate::StoreError;
use crate::query::{
    ChartBucket, Direction, FilterCondition, LogFilter, LogQuery, MAX_PAGE_SIZE, SqlArg,
    build_where, ts_nanos,
};

/// Reader pool size
const MAX_READERS: u32 = 5;

/// Reader connections kept idle
const MIN_READERS: u32 = 2;

/// Writer page cache, KiB (negative cache_size pragma means KiB)
const WRITER_CACHE_KIB: i64 = 8 * 1024;

/// Per-reader page cache, KiB
const READER_CACHE_KIB: i64 = 4 * 1024;

/// Read-side memory map limit, bytes
const MMAP_SIZE: i64 = 128 * 1024 * 1024;

/// WAL auto-checkpoint threshold in pages (~16 MiB at the 4 KiB page size)
const WAL_AUTOCHECKPOINT_PAGES: i64 = 4096;

const SELECT_COLUMNS: &str =
    "id, facility, severity, version, timestamp, hostname, app_name, procid, msgid, structured_data, msg";

/// One count per severity per time bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    /// Bucket start, epoch milliseconds
    pub timestamp: i64,
    pub debug: i64,
    pub info: i64,
    pub notice: i64,
    pub warning: i64,
    pub error: i64,
    pub critical: i64,
    pub alert: i64,
    pub emergency: i64,
}

/// A facet value: integer for severity/facility, text for string fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Int(i64),
    Text(String),
}

/// One row of a facet distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRow {
    pub value: FacetValue,
    pub total: i64,
}

/// Per-field value distribution for UI filter widgets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetMetadata {
    pub rows: Vec<FacetRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// A page of query results with its counts
#[derive(Debug, Clone)]
pub struct LogPage {
    /// Matching entries, already ordered for the caller (descending time
    /// even when paginating backwards)
    pub entries: Vec<LogEntry>,
    /// Rows in the store, unfiltered
    pub total_count: i64,
    /// Rows matching the filter (cursor excluded)
    pub filtered_count: i64,
}

/// The embedded log store
#[derive(Debug, Clone)]
pub struct LogStore {
    writer: SqlitePool,
    readers: SqlitePool,
}

impl LogStore {
    /// Open (creating if necessary) the database at `path` and initialize
    /// the schema. The writer pool is established first so the readers
    /// always find the database in WAL mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let writer_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("cache_size", format!("-{WRITER_CACHE_KIB}"))
            .pragma("temp_store", "MEMORY")
            .pragma("wal_autocheckpoint", WAL_AUTOCHECKPOINT_PAGES.to_string());

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(writer_options)
            .await?;

        init_schema(&writer).await?;

        let reader_options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("cache_size", format!("-{READER_CACHE_KIB}"))
            .pragma("temp_store", "MEMORY")
            .pragma("mmap_size", MMAP_SIZE.to_string());

        let readers = SqlitePoolOptions::new()
            .max_connections(MAX_READERS)
            .min_connections(MIN_READERS)
            .connect_with(reader_options)
            .await?;

        tracing::info!(path = %path.display(), "log store opened");

        Ok(Self { writer, readers })
    }

    /// Append a batch of entries in one transaction, preserving submission
    /// order. Any row error aborts the whole batch.
    pub async fn append_batch(&self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.writer.begin().await?;

        for entry in entries {
            sqlx::query(
                "INSERT INTO logs (facility, severity, version, timestamp, hostname, app_name, procid, msgid, structured_data, msg) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(entry.facility as i64)
            .bind(entry.severity as i64)
            .bind(entry.version as i64)
            .bind(ts_nanos(entry.timestamp))
            .bind(entry.hostname.as_str())
            .bind(entry.app_name.as_str())
            .bind(entry.proc_id.as_str())
            .bind(entry.msg_id.as_str())
            .bind(entry.structured_data.as_str())
            .bind(entry.message.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete all entries older than `cutoff`; returns the number removed
    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM logs WHERE timestamp < ?")
            .bind(ts_nanos(cutoff))
            .execute(&self.writer)
            .await?;
        Ok(result.rows_affected())
    }

    /// Run a filtered, cursor-paginated query.
    ///
    /// When paginating backwards the sort order is flipped for the scan and
    /// the page reversed afterwards, so callers always receive rows in the
    /// requested order with the page adjacent to the cursor.
    pub async fn query_logs(&self, params: &LogQuery) -> Result<LogPage> {
        let limit = params.limit.clamp(1, MAX_PAGE_SIZE);

        let (where_sql, args) = build_where(
            &params.filter,
            Some((params.cursor, params.direction)),
        );
        let scan_order = match params.direction {
            Direction::Next => params.sort_order,
            Direction::Prev => params.sort_order.flipped(),
        };
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM logs{where_sql} ORDER BY {} {} LIMIT {limit}",
            params.sort_field.sql_expr(),
            scan_order.as_sql(),
        );

        let rows = bind_args(sqlx::query(&sql), &args)
            .fetch_all(&self.readers)
            .await?;
        let mut entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>>>()?;
        if params.direction == Direction::Prev {
            entries.reverse();
        }

        let total_count = self.count_where("", &[]).await?;
        let (filter_sql, filter_args) = build_where(&params.filter, None);
        let filtered_count = self.count_where(&filter_sql, &filter_args).await?;

        Ok(LogPage {
            entries,
            total_count,
            filtered_count,
        })
    }

    /// Compute facet distributions for `severity` and `facility`.
    ///
    /// The two facets run concurrently on separate reader connections.
    /// Date-range conditions are stripped from the filter first.
    pub async fn query_facets(
        &self,
        filter: &LogFilter,
    ) -> Result<BTreeMap<String, FacetMetadata>> {
        let facet_filter = filter.without_time_range();

        let (severity, facility) = tokio::join!(
            self.facet_counts("severity", &facet_filter),
            self.facet_counts("facility", &facet_filter),
        );

        let mut facets = BTreeMap::new();
        facets.insert(
            "severity".to_string(),
            FacetMetadata {
                rows: severity?,
                ..Default::default()
            },
        );
        facets.insert(
            "facility".to_string(),
            FacetMetadata {
                rows: facility?,
                ..Default::default()
            },
        );
        Ok(facets)
    }

    /// Severity time-series for the chart.
    ///
    /// Without an explicit date range in the filter, the window is the 24
    /// hours up to the cursor, extended to the next hour boundary. The
    /// bucket unit follows the span (hour/day/week/month).
    pub async fn query_chart(
        &self,
        cursor: DateTime<Utc>,
        filter: &LogFilter,
    ) -> Result<Vec<ChartDataPoint>> {
        let (start, end) = match filter.time_range() {
            (Some(start), Some(end)) => (start, end),
            _ => {
                let hour = cursor.timestamp().div_euclid(3600) * 3600;
                let end = Utc
                    .timestamp_opt(hour + 3600, 0)
                    .single()
                    .unwrap_or(cursor);
                (cursor - Duration::hours(24), end)
            }
        };

        let bucket = ChartBucket::for_span(end - start);

        let mut chart_filter = filter.without_time_range();
        chart_filter.conditions.push(FilterCondition::StartDate(start));
        chart_filter.conditions.push(FilterCondition::EndDate(end));

        let (where_sql, args) = build_where(&chart_filter, None);
        let sql = format!(
            "SELECT {} AS ts, \
             SUM(CASE WHEN severity = 7 THEN 1 ELSE 0 END) AS debug, \
             SUM(CASE WHEN severity = 6 THEN 1 ELSE 0 END) AS info, \
             SUM(CASE WHEN severity = 5 THEN 1 ELSE 0 END) AS notice, \
             SUM(CASE WHEN severity = 4 THEN 1 ELSE 0 END) AS warning, \
             SUM(CASE WHEN severity = 3 THEN 1 ELSE 0 END) AS error, \
             SUM(CASE WHEN severity = 2 THEN 1 ELSE 0 END) AS critical, \
             SUM(CASE WHEN severity = 1 THEN 1 ELSE 0 END) AS alert, \
             SUM(CASE WHEN severity = 0 THEN 1 ELSE 0 END) AS emergency \
             FROM logs{where_sql} GROUP BY ts ORDER BY ts ASC",
            bucket.sql_expr(),
        );

        let rows = bind_args(sqlx::query(&sql), &args)
            .fetch_all(&self.readers)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ChartDataPoint {
                    timestamp: row.try_get("ts")?,
                    debug: row.try_get("debug")?,
                    info: row.try_get("info")?,
                    notice: row.try_get("notice")?,
                    warning: row.try_get("warning")?,
                    error: row.try_get("error")?,
                    critical: row.try_get("critical")?,
                    alert: row.try_get("alert")?,
                    emergency: row.try_get("emergency")?,
                })
            })
            .collect()
    }

    async fn facet_counts(&self, column: &str, filter: &LogFilter) -> Result<Vec<FacetRow>> {
        let (where_sql, args) = build_where(filter, None);
        let sql = format!(
            "SELECT {column} AS value, COUNT(*) AS total FROM logs{where_sql} GROUP BY {column}",
        );

        let rows = bind_args(sqlx::query(&sql), &args)
            .fetch_all(&self.readers)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(FacetRow {
                    value: FacetValue::Int(row.try_get("value")?),
                    total: row.try_get("total")?,
                })
            })
            .collect()
    }

    async fn count_where(&self, where_sql: &str, args: &[SqlArg]) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM logs{where_sql}");
        let row = bind_args(sqlx::query(&sql), args)
            .fetch_one(&self.readers)
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Close both pools (flushes the WAL checkpoint on the writer)
    pub async fn close(&self) {
        self.readers.close().await;
        self.writer.close().await;
    }
}

async fn init_schema(writer: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            facility INTEGER NOT NULL,
            severity INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            timestamp INTEGER NOT NULL,
            hostname TEXT NOT NULL DEFAULT '-',
            app_name TEXT NOT NULL DEFAULT '-',
            procid TEXT NOT NULL DEFAULT '-',
            msgid TEXT NOT NULL DEFAULT '-',
            structured_data TEXT NOT NULL DEFAULT '-',
            msg TEXT NOT NULL DEFAULT ''
        )",
    )
    .execute(writer)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs (timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_logs_severity_ts ON logs (severity, timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_logs_facility_ts ON logs (facility, timestamp DESC)",
        "CREATE INDEX IF NOT EXISTS idx_logs_facets ON logs (severity, facility, hostname, procid, app_name, msgid)",
    ] {
        sqlx::query(index).execute(writer).await?;
    }

    Ok(())
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_args<'q>(mut query: SqliteQuery<'q>, args: &'q [SqlArg]) -> SqliteQuery<'q> {
    for arg in args {
        query = match arg {
            SqlArg::Int(value) => query.bind(*value),
            SqlArg::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

fn entry_from_row(row: &SqliteRow) -> Result<LogEntry> {
    Ok(LogEntry {
        row_id: row.try_get("id")?,
        facility: row.try_get::<i64, _>("facility")? as u8,
        severity: row.try_get::<i64, _>("severity")? as u8,
        version: row.try_get::<i64, _>("version")? as u16,
        timestamp: Utc.timestamp_nanos(row.try_get::<i64, _>("timestamp")?),
        hostname: row.try_get("hostname")?,
        app_name: row.try_get("app_name")?,
        proc_id: row.try_get("procid")?,
        msg_id: row.try_get("msgid")?,
        structured_data: row.try_get("structured_data")?,
        message: row.try_get("msg")?,
    })
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
