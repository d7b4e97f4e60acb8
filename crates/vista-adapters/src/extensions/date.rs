//! Date and time filters, backed by `chrono`.
//!
//! Dates are accepted as unix timestamps, RFC 3339 strings,
//! `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`. Values with an offset are
//! converted to local time.

use std::fmt::Write;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use vista_core::prelude::*;

use super::str_arg;

const DEFAULT_FORMAT: &str = "%e %B %Y";

/// Units for `duration`, largest first.
const UNITS: [(&str, u64); 6] = [
    ("y", 365 * 86_400),
    ("w", 7 * 86_400),
    ("d", 86_400),
    ("h", 3_600),
    ("m", 60),
    ("s", 1),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DateExtension;

impl Extension for DateExtension {
    fn name(&self) -> &'static str {
        "date"
    }

    fn exports(&self) -> Vec<Export> {
        vec![
            Export::filter("localdate", ViewFunction::new(localdate)),
            Export::filter("duration", ViewFunction::new(duration)),
            Export::filter("age", ViewFunction::new(age)),
        ]
    }
}

fn parse(value: &Value, filter: &str) -> Result<NaiveDateTime, FunctionError> {
    let invalid = || FunctionError::new(format!("{filter}: unable to parse date '{value}'"));

    match value {
        Value::Number(n) => {
            let secs = n.as_i64().ok_or_else(invalid)?;
            let utc = DateTime::from_timestamp(secs, 0).ok_or_else(invalid)?;
            Ok(utc.with_timezone(&Local).naive_local())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Local).naive_local());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Ok(dt);
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Format a date with a strftime pattern (default `%e %B %Y`).
fn localdate(args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.require(0, "value")?;
    if value.is_null() {
        return Ok(Value::Null);
    }

    let date = parse(value, "localdate")?;
    let format = str_arg(args, 1, "format", DEFAULT_FORMAT)?;

    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| FunctionError::new(format!("localdate: invalid format '{format}'")))?;

    Ok(Value::String(out.trim().to_string()))
}

/// Seconds as `1h 5m 3s`, skipping zero units.
fn duration(args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.require(0, "value")?;
    if value.is_null() {
        return Ok(Value::Null);
    }

    let mut seconds = value
        .as_f64()
        .filter(|s| *s >= 0.0)
        .map(|s| s.round() as u64)
        .ok_or_else(|| FunctionError::new("duration: expected a positive number of seconds"))?;
    let separator = str_arg(args, 1, "separator", " ")?;

    let mut parts = Vec::new();
    for (unit, size) in UNITS {
        let count = seconds / size;
        if count > 0 {
            parts.push(format!("{count}{unit}"));
            seconds %= size;
        }
    }

    if parts.is_empty() {
        parts.push("0s".to_string());
    }

    Ok(Value::String(parts.join(separator)))
}

/// Whole years between a date and today (or `at`).
fn age(args: &Arguments) -> Result<Value, FunctionError> {
    let value = args.require(0, "value")?;
    if value.is_null() {
        return Ok(Value::Null);
    }

    let born = parse(value, "age")?.date();
    let at = match args.get(1, "at") {
        Some(at) if !at.is_null() => parse(at, "age")?.date(),
        _ => Local::now().date_naive(),
    };

    let mut years = at.year() - born.year();
    if (at.month(), at.day()) < (born.month(), born.day()) {
        years -= 1;
    }

    Ok(Value::from(years))
}
