//! Extended JSON wrappers used by the document store export format.
//!
//! 64-bit integers arrive as `{"$numberLong": "3107509212"}`, object ids as
//! `{"$oid": "..."}`, dates as `{"$date": ...}`. Relaxed exports write plain
//! numbers instead; both forms are accepted everywhere.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::DecodeErrorKind;
use crate::schema::ObjectId;

/// JSON type name used in error messages
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "real",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Single-key wrapper object like `{"$numberLong": "..."}`
fn wrapper<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if map.len() == 1 {
        map.get(key)
    } else {
        None
    }
}

fn wrapped_text<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| wrapper(map, key))
        .and_then(Value::as_str)
}

fn wrong_type(expected: &'static str, value: &Value) -> DecodeErrorKind {
    DecodeErrorKind::WrongType {
        expected,
        found: kind_name(value),
    }
}

/// Parse a signed 64-bit integer, plain or `$numberLong`/`$numberInt` wrapped
pub fn parse_i64(value: &Value) -> Result<i64, DecodeErrorKind> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(DecodeErrorKind::OutOfRange(n.to_string())),
            }
        }
        Value::Object(map) => match wrapped_text(map, &["$numberLong", "$numberInt"]) {
            Some(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| DecodeErrorKind::InvalidNumber(text.to_string())),
            None => Err(wrong_type("integer", value)),
        },
        other => Err(wrong_type("integer", other)),
    }
}

/// Parse an unsigned 64-bit integer without going through `f64`
pub fn parse_u64(value: &Value) -> Result<u64, DecodeErrorKind> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Ok(u);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => Ok(f as u64),
                _ => Err(DecodeErrorKind::OutOfRange(n.to_string())),
            }
        }
        Value::Object(map) => match wrapped_text(map, &["$numberLong", "$numberInt"]) {
            Some(text) => {
                let text = text.trim();
                match text.parse::<u64>() {
                    Ok(u) => Ok(u),
                    Err(_) if text.parse::<i64>().is_ok() => {
                        Err(DecodeErrorKind::OutOfRange(text.to_string()))
                    }
                    Err(_) => Err(DecodeErrorKind::InvalidNumber(text.to_string())),
                }
            }
            None => Err(wrong_type("integer", value)),
        },
        other => Err(wrong_type("integer", other)),
    }
}

/// Parse a float, plain or wrapped in any numeric marker
pub fn parse_f64(value: &Value) -> Result<f64, DecodeErrorKind> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DecodeErrorKind::InvalidNumber(n.to_string())),
        Value::Object(map) => {
            match wrapped_text(map, &["$numberDouble", "$numberLong", "$numberInt", "$numberDecimal"]) {
                Some(text) => match text.trim() {
                    "Infinity" => Ok(f64::INFINITY),
                    "-Infinity" => Ok(f64::NEG_INFINITY),
                    "NaN" => Ok(f64::NAN),
                    t => t
                        .parse::<f64>()
                        .map_err(|_| DecodeErrorKind::InvalidNumber(text.to_string())),
                },
                None => Err(wrong_type("number", value)),
            }
        }
        other => Err(wrong_type("number", other)),
    }
}

/// Parse `{"$oid": "..."}` or a bare 24 hex digit string
pub fn parse_object_id(value: &Value) -> Result<ObjectId, DecodeErrorKind> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => match wrapper(map, "$oid").and_then(Value::as_str) {
            Some(s) => s,
            None => return Err(wrong_type("object id", value)),
        },
        other => return Err(wrong_type("object id", other)),
    };
    ObjectId::parse(text.trim()).ok_or_else(|| DecodeErrorKind::InvalidObjectId(text.to_string()))
}

/// Parse a timestamp.
///
/// Accepts `{"$date": "<RFC 3339>"}`, `{"$date": {"$numberLong": "<ms>"}}`,
/// `{"$date": <ms>}` and plain strings in RFC 3339 or
/// `YYYY-MM-DD HH:MM:SS[+HH[MM]]` form. Strings without an offset are UTC.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DecodeErrorKind> {
    match value {
        Value::String(s) => parse_timestamp_text(s),
        Value::Object(map) => match wrapper(map, "$date") {
            Some(Value::String(s)) => parse_timestamp_text(s),
            Some(inner @ (Value::Number(_) | Value::Object(_))) => {
                let millis = parse_i64(inner)?;
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| DecodeErrorKind::InvalidTimestamp(millis.to_string()))
            }
            _ => Err(wrong_type("timestamp", value)),
        },
        other => Err(wrong_type("timestamp", other)),
    }
}

fn parse_timestamp_text(text: &str) -> Result<DateTime<Utc>, DecodeErrorKind> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    Err(DecodeErrorKind::InvalidTimestamp(text.to_string()))
}
