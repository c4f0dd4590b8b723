//! Defensive coercion of loosely-typed upstream JSON.
//!
//! Every aggregation in the workspace goes through these helpers so that one
//! policy decides what counts as a number, a day, or an identifier. None of
//! them fail: anything unrecognised becomes `None` (or `0` for counts).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

/// Magnitude above which a numeric timestamp is read as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e11;

// ── Numbers ───────────────────────────────────────────────────────────────────

/// Coerce a JSON value into a finite `f64`.
///
/// * JSON number      → its value.
/// * numeric string   → parsed after trimming whitespace.
/// * anything else, `NaN` or infinities → `None`.
pub fn safe_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Coerce a JSON value into a non-negative integer count.
///
/// Fractions are truncated; negative and invalid values become `0`.
pub fn safe_count(value: &Value) -> u64 {
    match safe_number(value) {
        Some(n) if n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Coerce a JSON value into a non-empty identifier string.
///
/// Numbers are stringified so that `{"user_id": 7}` and `{"user_id": "7"}`
/// compare equal downstream.
pub fn safe_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Return the first of `keys` present on `obj` with a non-null value.
pub fn first_present<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|v| !v.is_null())
}

/// Read a nested JSON object that may arrive either inline or encoded as a
/// JSON string. Parse failures yield `None`.
pub fn embedded_object(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => Some(parsed),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "ignoring unparseable embedded JSON");
                None
            }
        },
        _ => None,
    }
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Normalise a date-like JSON value to a calendar day.
///
/// * `"2024-01-05"` and `"2024-01-05T23:10:00Z"` → the day before the `T`.
/// * Other timestamp strings (`"2024-01-05 08:00:00"`, RFC 2822) → their date.
/// * JSON numbers → Unix timestamps in seconds, or milliseconds when large
///   enough to be a browser date value.
pub fn safe_date_key(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            if !raw.is_finite() {
                return None;
            }
            let dt = if raw.abs() >= MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(raw.trunc() as i64)
            } else {
                DateTime::from_timestamp(raw.trunc() as i64, 0)
            }?;
            Some(dt.date_naive())
        }
        _ => None,
    }
}

/// Render a day as its canonical `YYYY-MM-DD` bucket key.
pub fn format_date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    let day_part = s.split('T').next().unwrap_or(s);
    if let Ok(day) = NaiveDate::parse_from_str(day_part, "%Y-%m-%d") {
        return Some(day);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.date());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(day);
    }

    debug!("could not normalise date value \"{}\"", s);
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
