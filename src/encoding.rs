use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use crate::types::Decimal;

/// Format a timestamp as ISO-8601 UTC with a `Z` suffix.
///
/// Milliseconds are only written when the sub-second part is non-zero.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    let precision = if dt.timestamp_subsec_nanos() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Millis
    };
    dt.to_rfc3339_opts(precision, true)
}

/// Parse an ISO-8601 timestamp. Offsets are normalised to UTC and a missing
/// offset is read as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse an `xsd:decimal`, keeping its digits.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    text.trim().parse().ok()
}

pub(crate) fn decimal_to_json(value: Decimal) -> JsonValue {
    JsonValue::from(value.value())
}

/// Read a decimal from a JSON number or a numeric string. Strings keep
/// every digit; numbers have already been through `f64`.
pub(crate) fn json_to_decimal(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().and_then(|v| Decimal::try_from(v).ok()),
        },
        JsonValue::String(s) => parse_decimal(s),
        _ => None,
    }
}
