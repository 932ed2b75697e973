//! Filter conditions, WHERE-clause construction and chart bucketing
//!
//! Filters are a closed set of typed variants; the translation into SQL is
//! total, so there is no string-keyed filter bag to down-cast at runtime.
//!
//! Cursor semantics: pagination uses strict inequality on the boundary
//! timestamp (`<` for `next`, `>` for `prev`) so a row is never returned
//! twice while new entries keep arriving.

use chrono::{DateTime, Duration, Utc};

/// Upper bound for a single page of results
pub const MAX_PAGE_SIZE: usize = 1000;

/// A single typed filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// `severity IN (...)`
    Severity(Vec<u8>),
    /// `facility IN (...)`
    Facility(Vec<u8>),
    /// Exact hostname match
    Hostname(String),
    /// Exact application name match
    AppName(String),
    /// Exact process id match
    ProcId(String),
    /// Exact message id match
    MsgId(String),
    /// `facility * 8 + severity >= n` (inclusive)
    PriorityMin(u8),
    /// `facility * 8 + severity <= n` (inclusive)
    PriorityMax(u8),
    /// `timestamp >= t` (inclusive)
    StartDate(DateTime<Utc>),
    /// `timestamp <= t` (inclusive)
    EndDate(DateTime<Utc>),
}

/// A set of filter conditions combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub conditions: Vec<FilterCondition>,
}

impl LogFilter {
    /// Empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition
    pub fn with(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// True when no conditions are set
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Copy of this filter with `StartDate`/`EndDate` removed.
    ///
    /// Facets represent total-store state, so live-mode facets must not
    /// shrink as the time window advances.
    pub fn without_time_range(&self) -> Self {
        Self {
            conditions: self
                .conditions
                .iter()
                .filter(|c| {
                    !matches!(
                        c,
                        FilterCondition::StartDate(_) | FilterCondition::EndDate(_)
                    )
                })
                .cloned()
                .collect(),
        }
    }

    /// The explicit time range, if both bounds are present
    pub fn time_range(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let mut start = None;
        let mut end = None;
        for condition in &self.conditions {
            match condition {
                FilterCondition::StartDate(ts) => start = Some(*ts),
                FilterCondition::EndDate(ts) => end = Some(*ts),
                _ => {}
            }
        }
        (start, end)
    }
}

/// Pagination direction for cursor queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Older rows: `timestamp < cursor`
    #[default]
    Next,
    /// Newer rows: `timestamp > cursor`
    Prev,
}

impl Direction {
    /// Parse a direction parameter; anything unrecognized means `Next`
    pub fn parse(s: &str) -> Self {
        match s {
            "prev" => Self::Prev,
            _ => Self::Next,
        }
    }
}

/// Allow-listed sort fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Timestamp,
    Severity,
    Facility,
    /// Combined `facility * 8 + severity`
    Priority,
    Hostname,
    AppName,
}

impl SortField {
    /// Parse a sort field; unknown fields fall back to `Timestamp`
    pub fn parse(s: &str) -> Self {
        match s {
            "severity" => Self::Severity,
            "facility" => Self::Facility,
            "priority" => Self::Priority,
            "hostname" => Self::Hostname,
            "app_name" | "appname" => Self::AppName,
            _ => Self::Timestamp,
        }
    }

    /// SQL expression to sort by
    pub const fn sql_expr(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Severity => "severity",
            Self::Facility => "facility",
            Self::Priority => "facility * 8 + severity",
            Self::Hostname => "hostname",
            Self::AppName => "app_name",
        }
    }
}

/// Sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a sort order; anything unrecognized means `Desc`
    pub fn parse(s: &str) -> Self {
        match s {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }

    /// The opposite order (used when paginating backwards)
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A complete log query: filter, cursor, sort and page size
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub filter: LogFilter,
    /// Pagination boundary; rows strictly beyond it are returned
    pub cursor: DateTime<Utc>,
    pub direction: Direction,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    /// Page size, clamped to `1..=MAX_PAGE_SIZE`
    pub limit: usize,
}

impl LogQuery {
    /// Query with default sort (timestamp DESC) from a filter and cursor
    pub fn new(filter: LogFilter, cursor: DateTime<Utc>, direction: Direction, limit: usize) -> Self {
        Self {
            filter,
            cursor,
            direction,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            limit,
        }
    }
}

/// A bound SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Int(i64),
    Text(String),
}

/// Build the WHERE clause (including the leading ` WHERE `, or empty) and
/// its parameter list for a filter plus optional pagination cursor.
pub(crate) fn build_where(
    filter: &LogFilter,
    cursor: Option<(DateTime<Utc>, Direction)>,
) -> (String, Vec<SqlArg>) {
    let mut conditions = Vec::with_capacity(filter.conditions.len() + 1);
    let mut args = Vec::new();

    for condition in &filter.conditions {
        match condition {
            FilterCondition::Severity(values) if !values.is_empty() => {
                conditions.push(format!("severity IN ({})", placeholders(values.len())));
                args.extend(values.iter().map(|v| SqlArg::Int(*v as i64)));
            }
            FilterCondition::Facility(values) if !values.is_empty() => {
                conditions.push(format!("facility IN ({})", placeholders(values.len())));
                args.extend(values.iter().map(|v| SqlArg::Int(*v as i64)));
            }
            FilterCondition::Severity(_) | FilterCondition::Facility(_) => {}
            FilterCondition::Hostname(value) => {
                conditions.push("hostname = ?".to_string());
                args.push(SqlArg::Text(value.clone()));
            }
            FilterCondition::AppName(value) => {
                conditions.push("app_name = ?".to_string());
                args.push(SqlArg::Text(value.clone()));
            }
            FilterCondition::ProcId(value) => {
                conditions.push("procid = ?".to_string());
                args.push(SqlArg::Text(value.clone()));
            }
            FilterCondition::MsgId(value) => {
                conditions.push("msgid = ?".to_string());
                args.push(SqlArg::Text(value.clone()));
            }
            FilterCondition::PriorityMin(value) => {
                conditions.push("facility * 8 + severity >= ?".to_string());
                args.push(SqlArg::Int(*value as i64));
            }
            FilterCondition::PriorityMax(value) => {
                conditions.push("facility * 8 + severity <= ?".to_string());
                args.push(SqlArg::Int(*value as i64));
            }
            FilterCondition::StartDate(ts) => {
                conditions.push("timestamp >= ?".to_string());
                args.push(SqlArg::Int(ts_nanos(*ts)));
            }
            FilterCondition::EndDate(ts) => {
                conditions.push("timestamp <= ?".to_string());
                args.push(SqlArg::Int(ts_nanos(*ts)));
            }
        }
    }

    if let Some((cursor, direction)) = cursor {
        let clause = match direction {
            Direction::Next => "timestamp < ?",
            Direction::Prev => "timestamp > ?",
        };
        conditions.push(clause.to_string());
        args.push(SqlArg::Int(ts_nanos(cursor)));
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), args)
    }
}

fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

/// Chart bucketing unit, chosen by the total span of the time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartBucket {
    /// Up to 3 days: at most 72 points
    Hour,
    /// Up to 3 weeks: at most 21 points
    Day,
    /// Up to ~6 months: at most 26 points
    Week,
    /// Anything longer
    Month,
}

impl ChartBucket {
    /// Choose the bucket unit for a time span
    pub fn for_span(span: Duration) -> Self {
        if span <= Duration::days(3) {
            Self::Hour
        } else if span <= Duration::days(21) {
            Self::Day
        } else if span <= Duration::days(180) {
            Self::Week
        } else {
            Self::Month
        }
    }

    /// SQL expression producing the bucket start in epoch milliseconds.
    ///
    /// `timestamp` is stored as epoch nanoseconds; weeks start on Monday
    /// (epoch day 0 is a Thursday, hence the +3/-3 shift).
    pub const fn sql_expr(self) -> &'static str {
        match self {
            Self::Hour => "(timestamp / 3600000000000) * 3600000",
            Self::Day => "(timestamp / 86400000000000) * 86400000",
            Self::Week => "((timestamp / 86400000000000 + 3) / 7 * 7 - 3) * 86400000",
            Self::Month => {
                "CAST(strftime('%s', datetime(timestamp / 1000000000, 'unixepoch', 'start of month')) AS INTEGER) * 1000"
            }
        }
    }
}

/// Timestamp to the epoch-nanosecond storage representation.
/// Instants past the i64 range (year 2262) clamp to the maximum.
#[inline]
pub(crate) fn ts_nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;
