//! Shared utility functions for the townhall service

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::ApiError;

/// Parse an environment variable into a type implementing FromStr, with a default fallback
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Current UTC time as RFC 3339 with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trimmed value of a text field, `None` when absent or blank
pub fn non_blank(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numeric field sent either as a JSON number or a numeric string
pub fn coerce_f64(value: &Option<Value>) -> Option<f64> {
    let parsed = match value.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Integer field sent either as a JSON number or a numeric string
pub fn coerce_i64(value: &Option<Value>) -> Option<i64> {
    match value.as_ref()? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD` or RFC 3339 and stores it as RFC 3339 UTC
pub fn normalize_meeting_date(raw: &str) -> Result<String, ApiError> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .map_err(|_| {
            ApiError::validation(format!(
                "Invalid date '{}'. Use YYYY-MM-DD or an RFC 3339 timestamp",
                raw
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(&Some("  Budget ".into())), Some("Budget".into()));
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        assert_eq!(coerce_f64(&Some(json!(12.5))), Some(12.5));
        assert_eq!(coerce_f64(&Some(json!("8500000"))), Some(8_500_000.0));
        assert_eq!(coerce_f64(&Some(json!("abc"))), None);
        assert_eq!(coerce_f64(&Some(json!(null))), None);
        assert_eq!(coerce_i64(&Some(json!("2024"))), Some(2024));
        assert_eq!(coerce_i64(&Some(json!(3))), Some(3));
        assert_eq!(coerce_i64(&Some(json!(1.5))), None);
        assert_eq!(coerce_i64(&None), None);
    }

    #[test]
    fn meeting_dates_normalize_to_utc() {
        assert_eq!(
            normalize_meeting_date("2024-02-15").unwrap(),
            "2024-02-15T00:00:00.000Z"
        );
        assert_eq!(
            normalize_meeting_date("2024-02-15T19:00:00-05:00").unwrap(),
            "2024-02-16T00:00:00.000Z"
        );
        assert!(normalize_meeting_date("next tuesday").is_err());
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let a = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_timestamp();
        assert!(a < b);
    }
}
