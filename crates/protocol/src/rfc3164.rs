//! RFC 3164 (BSD syslog) parser
//!
//! Wire shape:
//!
//! ```text
//! <PRI>MMM DD HH:MM:SS HOSTNAME TAG[PID]: MESSAGE
//! ```
//!
//! The timestamp carries no year; the current year is assumed, rolling back
//! one year when the month would land more than a month in the future (so
//! December logs received in January are not dated eleven months ahead).

use chrono::{DateTime, Datelike, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::Result;
use crate::entry::{LogEntry, MAX_PRIORITY, NIL_VALUE, split_priority};
use crate::error::ParseError;

// Example: <34>Oct 11 22:14:15 mymachine su[123]: 'su root' failed
static RFC3164_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^<(?P<pri>\d{1,3})>(?P<mon>[A-Z][a-z]{2})\s+(?P<day>\d{1,2})\s+(?P<time>\d{2}:\d{2}:\d{2})\s+(?P<host>\S+)\s+(?P<tag>[A-Za-z0-9_./-]+)(?:\[(?P<pid>[^\]]+)\])?:\s*(?P<msg>.*)$",
    )
    .expect("RFC 3164 regex must compile")
});

/// Parse a BSD-syslog line into a [`LogEntry`]
pub fn parse(input: &str) -> Result<LogEntry> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let caps = RFC3164_RE.captures(input).ok_or(ParseError::NotRfc3164)?;

    let pri: u16 = caps["pri"].parse().map_err(|_| ParseError::MalformedPri)?;
    if pri > MAX_PRIORITY {
        return Err(ParseError::PriorityOutOfRange(pri));
    }
    let (facility, severity) = split_priority(pri);

    let timestamp = parse_timestamp(&caps["mon"], &caps["day"], &caps["time"])?;

    let hostname = caps["host"].to_string();
    let app_name = caps["tag"].to_string();
    let proc_id = caps
        .name("pid")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NIL_VALUE.to_string());
    let message = caps["msg"].to_string();

    Ok(LogEntry {
        row_id: 0,
        facility,
        severity,
        version: 1,
        timestamp,
        hostname,
        app_name,
        proc_id,
        msg_id: NIL_VALUE.to_string(),
        structured_data: NIL_VALUE.to_string(),
        message,
    })
}

/// Resolve `MMM DD HH:MM:SS` against the current year
fn parse_timestamp(mon: &str, day_str: &str, time: &str) -> Result<DateTime<Utc>> {
    let malformed = || ParseError::MalformedTimestamp(format!("{mon} {day_str} {time}"));

    let month = month_number(mon).ok_or_else(malformed)?;
    let day: u32 = day_str.parse().map_err(|_| malformed())?;

    let mut hms = time.split(':').map(str::parse::<u32>);
    let (hour, minute, second) = match (hms.next(), hms.next(), hms.next()) {
        (Some(Ok(h)), Some(Ok(m)), Some(Ok(s))) => (h, m, s),
        _ => return Err(malformed()),
    };

    let now = Utc::now();
    let mut year = now.year();
    // Year-boundary handling: a month more than one ahead of the current one
    // belongs to the previous year (December logs received in January).
    if month > now.month() + 1 {
        year -= 1;
    }

    match Utc.with_ymd_and_hms(year, month, day, hour, minute, second) {
        chrono::LocalResult::Single(ts) => Ok(ts),
        _ => Err(malformed()),
    }
}

fn month_number(mon: &str) -> Option<u32> {
    let n = match mon {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
#[path = "rfc3164_test.rs"]
mod rfc3164_test;
