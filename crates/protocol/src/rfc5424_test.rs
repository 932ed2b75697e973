//! Tests for the RFC 5424 parser

use chrono::{TimeZone, Utc};

use crate::entry::NIL_VALUE;
use crate::error::ParseError;
use crate::rfc5424::{parse, parse_strict};

#[test]
fn test_basic_message() {
    let entry =
        parse("<13>1 2023-10-01T12:34:56Z example-host example-app 1234 5678 - Test log message")
            .unwrap();

    assert_eq!(entry.facility, 1);
    assert_eq!(entry.severity, 5);
    assert_eq!(entry.version, 1);
    assert_eq!(
        entry.timestamp,
        Utc.with_ymd_and_hms(2023, 10, 1, 12, 34, 56).unwrap()
    );
    assert_eq!(entry.hostname, "example-host");
    assert_eq!(entry.app_name, "example-app");
    assert_eq!(entry.proc_id, "1234");
    assert_eq!(entry.msg_id, "5678");
    assert_eq!(entry.structured_data, NIL_VALUE);
    assert_eq!(entry.message, "Test log message");
}

#[test]
fn test_structured_data_canonical_json() {
    let entry = parse(
        "<165>1 2023-10-01T12:34:56Z host1 app1 2345 ID01 [exampleSDID@32473 iut=\"3\" eventSource=\"Application\"] Message with structured data",
    )
    .unwrap();

    assert_eq!(entry.facility, 20);
    assert_eq!(entry.severity, 5);
    assert_eq!(
        entry.structured_data,
        r#"{"exampleSDID@32473":{"eventSource":"Application","iut":"3"}}"#
    );
    assert_eq!(entry.message, "Message with structured data");
}

#[test]
fn test_multiple_sd_elements() {
    let entry = parse(
        "<34>1 2023-01-01T00:00:00Z h a p m [first x=\"1\"][second y=\"2\" z=\"3\"] msg",
    )
    .unwrap();

    assert_eq!(
        entry.structured_data,
        r#"{"first":{"x":"1"},"second":{"y":"2","z":"3"}}"#
    );
    assert_eq!(entry.message, "msg");
}

#[test]
fn test_sd_escapes() {
    let entry = parse(
        r#"<34>1 2023-01-01T00:00:00Z h a p m [e k="a\"b\\c\]d"] msg"#,
    )
    .unwrap();

    assert_eq!(entry.structured_data, r#"{"e":{"k":"a\"b\\c]d"}}"#);
}

#[test]
fn test_sd_unknown_escape_kept_literally() {
    let entry = parse(r#"<34>1 2023-01-01T00:00:00Z h a p m [e k="a\nb"] m"#).unwrap();

    assert_eq!(entry.structured_data, r#"{"e":{"k":"a\\nb"}}"#);
}

#[test]
fn test_sd_value_may_contain_spaces_and_brackets() {
    let entry = parse(r#"<34>1 2023-01-01T00:00:00Z h a p m [e k="hello [world]"] m"#).unwrap();

    assert_eq!(entry.structured_data, r#"{"e":{"k":"hello [world]"}}"#);
}

#[test]
fn test_nil_timestamp_substitutes_now() {
    let before = Utc::now();
    let entry = parse("<13>1 - host app 1 2 - msg").unwrap();
    let after = Utc::now();

    assert!(entry.timestamp >= before && entry.timestamp <= after);
}

#[test]
fn test_nil_header_fields() {
    let entry = parse("<13>1 2023-10-01T12:34:56Z - - - - - msg").unwrap();

    assert_eq!(entry.hostname, NIL_VALUE);
    assert_eq!(entry.app_name, NIL_VALUE);
    assert_eq!(entry.proc_id, NIL_VALUE);
    assert_eq!(entry.msg_id, NIL_VALUE);
}

#[test]
fn test_empty_message() {
    let entry = parse("<13>1 2023-10-01T12:34:56Z host app 1 2 -").unwrap();
    assert_eq!(entry.message, "");

    let entry = parse("<13>1 2023-10-01T12:34:56Z host app 1 2 - ").unwrap();
    assert_eq!(entry.message, "");
}

#[test]
fn test_message_with_embedded_newlines() {
    let entry = parse("<13>1 2023-10-01T12:34:56Z host app 1 2 - line one\nline two").unwrap();
    assert_eq!(entry.message, "line one\nline two");
}

#[test]
fn test_bom_stripped_from_message() {
    let entry = parse("<13>1 2023-10-01T12:34:56Z host app 1 2 - \u{feff}msg").unwrap();
    assert_eq!(entry.message, "msg");
}

#[test]
fn test_fractional_seconds_and_offset() {
    let entry = parse("<13>1 2023-10-01T14:34:56.003+02:00 host app 1 2 - msg").unwrap();

    assert_eq!(
        entry.timestamp,
        Utc.with_ymd_and_hms(2023, 10, 1, 12, 34, 56).unwrap()
            + chrono::Duration::milliseconds(3)
    );
}

#[test]
fn test_best_effort_defaults_for_missing_tail() {
    let entry = parse("<13>1 2023-10-01T12:34:56Z host").unwrap();

    assert_eq!(entry.hostname, "host");
    assert_eq!(entry.app_name, NIL_VALUE);
    assert_eq!(entry.proc_id, NIL_VALUE);
    assert_eq!(entry.msg_id, NIL_VALUE);
    assert_eq!(entry.structured_data, NIL_VALUE);
    assert_eq!(entry.message, "");
}

#[test]
fn test_best_effort_missing_version() {
    // No version digit after PRI: best-effort defaults to 1 but the
    // BSD-style timestamp still fails, so the line is not silently accepted
    assert!(parse("<34>Oct 11 22:14:15 mymachine su: hello").is_err());
}

#[test]
fn test_strict_requires_all_fields() {
    assert!(matches!(
        parse_strict("<13>1 2023-10-01T12:34:56Z host"),
        Err(ParseError::MissingField(_))
    ));
    assert!(matches!(
        parse_strict("<13>x 2023-10-01T12:34:56Z h a p m - msg"),
        Err(ParseError::MalformedVersion(_))
    ));
    assert!(parse_strict("<13>1 2023-10-01T12:34:56Z h a p m - msg").is_ok());
}

#[test]
fn test_malformed_pri() {
    assert!(matches!(parse("no pri at all"), Err(ParseError::MalformedPri)));
    assert!(matches!(parse("<>1 - h a p m - x"), Err(ParseError::MalformedPri)));
    assert!(matches!(parse("<abc>1 - h a p m - x"), Err(ParseError::MalformedPri)));
    assert!(matches!(parse("<1234>1 - h a p m - x"), Err(ParseError::MalformedPri)));
}

#[test]
fn test_priority_out_of_range() {
    assert!(matches!(
        parse("<192>1 - h a p m - x"),
        Err(ParseError::PriorityOutOfRange(192))
    ));
    // 191 is the highest encodable priority
    let entry = parse("<191>1 - h a p m - x").unwrap();
    assert_eq!(entry.facility, 23);
    assert_eq!(entry.severity, 7);
}

#[test]
fn test_version_zero_rejected() {
    assert!(matches!(
        parse("<13>0 2023-10-01T12:34:56Z h a p m - x"),
        Err(ParseError::MalformedVersion(_))
    ));
}

#[test]
fn test_malformed_timestamp() {
    assert!(matches!(
        parse("<13>1 2023-13-99T99:99:99Z h a p m - x"),
        Err(ParseError::MalformedTimestamp(_))
    ));
}

#[test]
fn test_malformed_structured_data() {
    assert!(parse("<13>1 - h a p m [e k=unquoted] x").is_err());
    assert!(parse("<13>1 - h a p m [e k=\"unterminated x").is_err());
    assert!(parse("<13>1 - h a p m [] x").is_err());
    assert!(parse("<13>1 - h a p m not-sd x").is_err());
}

#[test]
fn test_priority_split_invariant() {
    for pri in 0..=191u16 {
        let entry = parse(&format!("<{pri}>1 - h a p m - x")).unwrap();
        assert_eq!(entry.facility as u16, pri / 8);
        assert_eq!(entry.severity as u16, pri % 8);
        assert_eq!(entry.priority(), pri);
    }
}
