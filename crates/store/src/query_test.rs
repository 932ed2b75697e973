//! Tests for filter translation and chart bucketing

use chrono::{Duration, TimeZone, Utc};

use crate::query::{
    ChartBucket, Direction, FilterCondition, LogFilter, SortField, SortOrder, SqlArg, build_where,
};

#[test]
fn test_empty_filter_no_clause() {
    let (sql, args) = build_where(&LogFilter::new(), None);
    assert_eq!(sql, "");
    assert!(args.is_empty());
}

#[test]
fn test_severity_set() {
    let filter = LogFilter::new().with(FilterCondition::Severity(vec![3, 4, 5]));
    let (sql, args) = build_where(&filter, None);

    assert_eq!(sql, " WHERE severity IN (?,?,?)");
    assert_eq!(
        args,
        vec![SqlArg::Int(3), SqlArg::Int(4), SqlArg::Int(5)]
    );
}

#[test]
fn test_empty_sets_are_skipped() {
    let filter = LogFilter::new()
        .with(FilterCondition::Severity(vec![]))
        .with(FilterCondition::Facility(vec![]));
    let (sql, args) = build_where(&filter, None);

    assert_eq!(sql, "");
    assert!(args.is_empty());
}

#[test]
fn test_exact_string_matches() {
    let filter = LogFilter::new()
        .with(FilterCondition::Hostname("web1".into()))
        .with(FilterCondition::AppName("nginx".into()))
        .with(FilterCondition::ProcId("42".into()))
        .with(FilterCondition::MsgId("ID9".into()));
    let (sql, args) = build_where(&filter, None);

    assert_eq!(
        sql,
        " WHERE hostname = ? AND app_name = ? AND procid = ? AND msgid = ?"
    );
    assert_eq!(args.len(), 4);
    assert_eq!(args[0], SqlArg::Text("web1".into()));
}

#[test]
fn test_priority_bounds_inclusive() {
    let filter = LogFilter::new()
        .with(FilterCondition::PriorityMin(8))
        .with(FilterCondition::PriorityMax(63));
    let (sql, args) = build_where(&filter, None);

    assert_eq!(
        sql,
        " WHERE facility * 8 + severity >= ? AND facility * 8 + severity <= ?"
    );
    assert_eq!(args, vec![SqlArg::Int(8), SqlArg::Int(63)]);
}

#[test]
fn test_date_range_uses_nanoseconds() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let filter = LogFilter::new()
        .with(FilterCondition::StartDate(start))
        .with(FilterCondition::EndDate(end));
    let (sql, args) = build_where(&filter, None);

    assert_eq!(sql, " WHERE timestamp >= ? AND timestamp <= ?");
    assert_eq!(
        args,
        vec![
            SqlArg::Int(start.timestamp_nanos_opt().unwrap()),
            SqlArg::Int(end.timestamp_nanos_opt().unwrap()),
        ]
    );
}

#[test]
fn test_cursor_strict_inequality() {
    let cursor = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let (sql, args) = build_where(&LogFilter::new(), Some((cursor, Direction::Next)));
    assert_eq!(sql, " WHERE timestamp < ?");
    assert_eq!(args, vec![SqlArg::Int(cursor.timestamp_nanos_opt().unwrap())]);

    let (sql, _) = build_where(&LogFilter::new(), Some((cursor, Direction::Prev)));
    assert_eq!(sql, " WHERE timestamp > ?");
}

#[test]
fn test_conditions_joined_with_and() {
    let cursor = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let filter = LogFilter::new()
        .with(FilterCondition::Severity(vec![6]))
        .with(FilterCondition::Hostname("h".into()));
    let (sql, args) = build_where(&filter, Some((cursor, Direction::Next)));

    assert_eq!(
        sql,
        " WHERE severity IN (?) AND hostname = ? AND timestamp < ?"
    );
    assert_eq!(args.len(), 3);
}

#[test]
fn test_without_time_range() {
    let filter = LogFilter::new()
        .with(FilterCondition::Severity(vec![1]))
        .with(FilterCondition::StartDate(Utc::now()))
        .with(FilterCondition::EndDate(Utc::now()));

    let stripped = filter.without_time_range();
    assert_eq!(stripped.conditions.len(), 1);
    assert!(matches!(
        stripped.conditions[0],
        FilterCondition::Severity(_)
    ));
    assert_eq!(stripped.time_range(), (None, None));
}

#[test]
fn test_time_range_extraction() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let filter = LogFilter::new()
        .with(FilterCondition::StartDate(start))
        .with(FilterCondition::EndDate(end));

    assert_eq!(filter.time_range(), (Some(start), Some(end)));
    assert_eq!(LogFilter::new().time_range(), (None, None));
}

#[test]
fn test_direction_parse() {
    assert_eq!(Direction::parse("prev"), Direction::Prev);
    assert_eq!(Direction::parse("next"), Direction::Next);
    assert_eq!(Direction::parse("sideways"), Direction::Next);
}

#[test]
fn test_sort_field_allow_list() {
    assert_eq!(SortField::parse("timestamp"), SortField::Timestamp);
    assert_eq!(SortField::parse("severity"), SortField::Severity);
    assert_eq!(SortField::parse("facility"), SortField::Facility);
    assert_eq!(SortField::parse("priority"), SortField::Priority);
    assert_eq!(SortField::parse("hostname"), SortField::Hostname);
    assert_eq!(SortField::parse("app_name"), SortField::AppName);
    assert_eq!(SortField::parse("appname"), SortField::AppName);
    // Unknown fields fall back to timestamp, never into the SQL string
    assert_eq!(SortField::parse("msg; DROP TABLE logs"), SortField::Timestamp);
}

#[test]
fn test_sort_expressions() {
    assert_eq!(SortField::Priority.sql_expr(), "facility * 8 + severity");
    assert_eq!(SortField::AppName.sql_expr(), "app_name");
}

#[test]
fn test_sort_order() {
    assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
    assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
    assert_eq!(SortOrder::parse(""), SortOrder::Desc);
    assert_eq!(SortOrder::Asc.flipped(), SortOrder::Desc);
    assert_eq!(SortOrder::Desc.flipped(), SortOrder::Asc);
}

#[test]
fn test_bucket_ladder() {
    assert_eq!(ChartBucket::for_span(Duration::hours(24)), ChartBucket::Hour);
    assert_eq!(ChartBucket::for_span(Duration::days(3)), ChartBucket::Hour);
    assert_eq!(
        ChartBucket::for_span(Duration::days(3) + Duration::seconds(1)),
        ChartBucket::Day
    );
    assert_eq!(ChartBucket::for_span(Duration::days(21)), ChartBucket::Day);
    assert_eq!(
        ChartBucket::for_span(Duration::days(22)),
        ChartBucket::Week
    );
    assert_eq!(ChartBucket::for_span(Duration::days(180)), ChartBucket::Week);
    assert_eq!(
        ChartBucket::for_span(Duration::days(181)),
        ChartBucket::Month
    );
}
