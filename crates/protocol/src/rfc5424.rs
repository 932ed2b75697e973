//! RFC 5424 (IETF syslog) parser
//!
//! Wire shape:
//!
//! ```text
//! <PRI>VER TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA [SP MSG]
//! ```
//!
//! Two modes:
//!
//! - [`parse`] - best-effort: recoverable absences become defaults
//!   (`-`, now, version 1)
//! - [`parse_strict`] - every header field must be present
//!
//! Structured data is converted to its canonical JSON form
//! `{"sd-id":{"k":"v"}}` at parse time so the read path never re-tokenizes
//! the raw elements. The NIL token `-` is kept verbatim.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::Result;
use crate::entry::{LogEntry, MAX_PRIORITY, NIL_VALUE, split_priority};
use crate::error::ParseError;

/// Parse a message in best-effort mode
pub fn parse(input: &str) -> Result<LogEntry> {
    parse_with_mode(input, true)
}

/// Parse a message in strict mode (all seven header fields required)
pub fn parse_strict(input: &str) -> Result<LogEntry> {
    parse_with_mode(input, false)
}

fn parse_with_mode(input: &str, best_effort: bool) -> Result<LogEntry> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    // PRI
    let rest = input.strip_prefix('<').ok_or(ParseError::MalformedPri)?;
    let close = rest.find('>').ok_or(ParseError::MalformedPri)?;
    let pri_str = &rest[..close];
    if pri_str.is_empty() || pri_str.len() > 3 || !pri_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::MalformedPri);
    }
    let pri: u16 = pri_str.parse().map_err(|_| ParseError::MalformedPri)?;
    if pri > MAX_PRIORITY {
        return Err(ParseError::PriorityOutOfRange(pri));
    }
    let (facility, severity) = split_priority(pri);
    let mut rest = &rest[close + 1..];

    let version = parse_version(&mut rest, best_effort)?;

    // TIMESTAMP
    let timestamp = match next_token(&mut rest) {
        Some("-") => Utc::now(),
        Some("") | None if best_effort => Utc::now(),
        Some("") | None => return Err(ParseError::MissingField("timestamp")),
        Some(token) => DateTime::parse_from_rfc3339(token)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| ParseError::MalformedTimestamp(token.to_string()))?,
    };

    let hostname = header_field(next_token(&mut rest), "hostname", best_effort)?;
    let app_name = header_field(next_token(&mut rest), "app name", best_effort)?;
    let proc_id = header_field(next_token(&mut rest), "proc id", best_effort)?;
    let msg_id = header_field(next_token(&mut rest), "msg id", best_effort)?;

    // STRUCTURED-DATA
    let structured_data = if rest.is_empty() {
        if !best_effort {
            return Err(ParseError::MissingField("structured data"));
        }
        NIL_VALUE.to_string()
    } else {
        rest = rest
            .strip_prefix(' ')
            .ok_or_else(|| sd_err("expected space before structured data"))?;
        if let Some(after) = rest.strip_prefix('-') {
            if !(after.is_empty() || after.starts_with(' ')) {
                return Err(sd_err("unexpected bytes after NIL token"));
            }
            rest = after;
            NIL_VALUE.to_string()
        } else if rest.starts_with('[') {
            parse_structured_data(&mut rest)?
        } else {
            return Err(sd_err("expected '-' or '['"));
        }
    };

    // MSG: everything after one separating space, optional BOM stripped
    let message = if rest.is_empty() {
        String::new()
    } else {
        let msg = rest
            .strip_prefix(' ')
            .ok_or_else(|| sd_err("unexpected bytes after structured data"))?;
        msg.strip_prefix('\u{feff}').unwrap_or(msg).to_string()
    };

    Ok(LogEntry {
        row_id: 0,
        facility,
        severity,
        version,
        timestamp,
        hostname,
        app_name,
        proc_id,
        msg_id,
        structured_data,
        message,
    })
}

/// Parse the VERSION field, leaving `rest` positioned at the following space
fn parse_version(rest: &mut &str, best_effort: bool) -> Result<u16> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        if best_effort {
            return Ok(1);
        }
        return Err(ParseError::MalformedVersion(head(rest)));
    }

    let token = &rest[..digits];
    let after = &rest[digits..];
    if !(after.is_empty() || after.starts_with(' ')) {
        return Err(ParseError::MalformedVersion(head(rest)));
    }

    let version: u16 = token
        .parse()
        .map_err(|_| ParseError::MalformedVersion(token.to_string()))?;
    if version == 0 {
        return Err(ParseError::MalformedVersion(token.to_string()));
    }

    *rest = after;
    Ok(version)
}

/// Take the next space-delimited header token, consuming its leading space
fn next_token<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let s = rest.strip_prefix(' ')?;
    match s.find(' ') {
        Some(pos) => {
            *rest = &s[pos..];
            Some(&s[..pos])
        }
        None => {
            *rest = "";
            Some(s)
        }
    }
}

/// Resolve a header token: NIL and empty become `-`, absence errors in strict mode
fn header_field(token: Option<&str>, name: &'static str, best_effort: bool) -> Result<String> {
    match token {
        Some("") | None if !best_effort => Err(ParseError::MissingField(name)),
        Some("") | None => Ok(NIL_VALUE.to_string()),
        Some(token) => Ok(token.to_string()),
    }
}

/// Parse one or more `[sd-id k="v" ...]` elements into canonical JSON
fn parse_structured_data(rest: &mut &str) -> Result<String> {
    let mut elements: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut s = *rest;

    while let Some(body) = s.strip_prefix('[') {
        s = body;

        let id_end = s
            .find([' ', ']'])
            .ok_or_else(|| sd_err("unterminated element"))?;
        let sd_id = &s[..id_end];
        if sd_id.is_empty() {
            return Err(sd_err("empty sd-id"));
        }
        s = &s[id_end..];

        let params = elements.entry(sd_id.to_string()).or_default();

        loop {
            if let Some(after) = s.strip_prefix(']') {
                s = after;
                break;
            }
            s = s
                .strip_prefix(' ')
                .ok_or_else(|| sd_err("expected space between parameters"))?;

            let eq = s
                .find('=')
                .ok_or_else(|| sd_err("parameter missing '='"))?;
            let key = &s[..eq];
            if key.is_empty() || key.contains([' ', ']', '"']) {
                return Err(sd_err("malformed parameter name"));
            }
            s = &s[eq + 1..];

            s = s
                .strip_prefix('"')
                .ok_or_else(|| sd_err("parameter value must be quoted"))?;
            let (value, after) = read_quoted_value(s)?;
            s = after;

            params.insert(key.to_string(), value);
        }
    }

    *rest = s;

    serde_json::to_string(&elements).map_err(|e| sd_err(&e.to_string()))
}

/// Read a quoted parameter value, resolving the `\"`, `\\` and `\]` escapes.
/// Unknown escapes are kept literally.
fn read_quoted_value(s: &str) -> Result<(String, &str)> {
    let mut value = String::new();
    let mut chars = s.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &s[i + 1..])),
            '\\' => match chars.next() {
                Some((_, esc @ ('"' | '\\' | ']'))) => value.push(esc),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => return Err(sd_err("unterminated escape")),
            },
            _ => value.push(c),
        }
    }

    Err(sd_err("unterminated quoted value"))
}

fn sd_err(msg: &str) -> ParseError {
    ParseError::MalformedStructuredData(msg.to_string())
}

/// First few bytes of the remaining input, for error context
fn head(s: &str) -> String {
    s.chars().take(16).collect()
}

#[cfg(test)]
#[path = "rfc5424_test.rs"]
mod rfc5424_test;
