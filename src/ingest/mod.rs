//! Bulk ingestion validation and normalization.
//!
//! Takes an ordered batch of raw record submissions, validates and normalizes
//! each one, and reports errors per 1-based line across the whole batch. The
//! batch is all-or-nothing: a single bad line rejects everything. Strict
//! fail-fast semantics suit trusted internal ingestion; there is no partial
//! retry or dead-letter path.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Disposition, NewCallRecord};

/// Maximum length of the src/dst identifiers, in characters.
const IDENTIFIER_MAX_LEN: usize = 64;

/// One raw record as submitted. Fields are kept as loose JSON values so that
/// numeric strings ("30") and numbers (30) are both accepted, the way the
/// upstream PBX exports mix them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCallRecord {
    pub calldate: Option<Value>,
    pub src: Option<Value>,
    pub dst: Option<Value>,
    pub duration: Option<Value>,
    pub billsec: Option<Value>,
    pub disposition: Option<Value>,
}

/// Validation failures for a single line, 1-based.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub errors: Vec<String>,
}

/// Validate and normalize an entire batch. Returns the constructed records
/// only when every line is valid; otherwise the full error list, one entry
/// per invalid line.
pub fn validate_batch(
    records: &[RawCallRecord],
    server_tz: FixedOffset,
) -> Result<Vec<NewCallRecord>, Vec<LineError>> {
    let mut errors = Vec::new();
    let mut validated = Vec::with_capacity(records.len());

    for (idx, rec) in records.iter().enumerate() {
        let line = idx + 1;
        match validate_record(rec, server_tz) {
            Ok(record) => validated.push(record),
            Err(line_errors) => errors.push(LineError {
                line,
                errors: line_errors,
            }),
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

fn validate_record(
    rec: &RawCallRecord,
    server_tz: FixedOffset,
) -> Result<NewCallRecord, Vec<String>> {
    let mut line_errors = Vec::new();

    let calldate = match string_value(rec.calldate.as_ref()) {
        None => {
            line_errors.push("calldate is empty".to_string());
            None
        }
        Some(raw) => match parse_calldate(&raw, server_tz) {
            Some(dt) => Some(dt),
            None => {
                line_errors.push("invalid calldate format".to_string());
                None
            }
        },
    };

    let src = validate_identifier("src", rec.src.as_ref(), &mut line_errors);
    let dst = validate_identifier("dst", rec.dst.as_ref(), &mut line_errors);

    let duration = validate_seconds("duration", rec.duration.as_ref(), &mut line_errors);
    let billsec = validate_seconds("billsec", rec.billsec.as_ref(), &mut line_errors);

    let disposition = match string_value(rec.disposition.as_ref()) {
        None => {
            line_errors.push("disposition is empty".to_string());
            None
        }
        // Normalization never fails; only emptiness does.
        Some(raw) => Some(Disposition::normalize(&raw)),
    };

    match (calldate, src, dst, duration, billsec, disposition) {
        (Some(calldate), Some(src), Some(dst), Some(duration), Some(billsec), Some(disposition))
            if line_errors.is_empty() =>
        {
            Ok(NewCallRecord {
                calldate,
                src,
                dst,
                duration,
                billsec,
                disposition,
                answered: disposition.answered(),
            })
        }
        _ => Err(line_errors),
    }
}

fn validate_identifier(
    field: &str,
    value: Option<&Value>,
    line_errors: &mut Vec<String>,
) -> Option<String> {
    match string_value(value) {
        None => {
            line_errors.push(format!("{field} is empty"));
            None
        }
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            if trimmed.chars().count() > IDENTIFIER_MAX_LEN {
                line_errors.push(format!("{field} is too long"));
                None
            } else {
                Some(trimmed)
            }
        }
    }
}

fn validate_seconds(
    field: &str,
    value: Option<&Value>,
    line_errors: &mut Vec<String>,
) -> Option<i64> {
    match integer_value(value) {
        None => {
            line_errors.push(format!("{field} must be an integer"));
            None
        }
        Some(n) if n < 0 => {
            line_errors.push(format!("{field} < 0"));
            None
        }
        Some(n) => Some(n),
    }
}

/// Coerce a loose JSON value to a non-empty string. Numbers are rendered the
/// way they appear in the payload; null, missing, empty and non-scalar values
/// are all "empty".
fn string_value(value: Option<&Value>) -> Option<String> {
    let coerced = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if coerced.trim().is_empty() {
        None
    } else {
        Some(coerced)
    }
}

/// Coerce a loose JSON value to an integer, accepting numeric strings.
fn integer_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a calldate string. Accepts RFC 3339 / ISO-8601 with an explicit
/// offset, and naive date-times with either `T` or a space as the separator
/// (the space is treated as the ISO separator). Naive values are interpreted
/// in the server's configured timezone.
fn parse_calldate(raw: &str, server_tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    let normalized = raw.replace(' ', "T");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt);
    }

    // Seconds are optional in ISO-8601; minutes precision is still valid.
    let naive = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M"))
        .ok()?;
    server_tz.from_local_datetime(&naive).single()
}
