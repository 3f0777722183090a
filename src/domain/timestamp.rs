//! Date normalization for the many shapes a date-like field can take.
//!
//! Documents reach this service from the database driver, from the REST
//! export of the old document store (`{"timestampValue": "..."}`), from
//! client SDK dumps (`{"seconds": .., "nanoseconds": ..}`) and as plain
//! strings typed into forms. Everything funnels through [`normalize_timestamp`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, offset};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Brasília time, used for dates shown to people.
pub const BRASILIA_OFFSET: UtcOffset = offset!(-3);

/// A database timestamp: seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimestamp {
    #[serde(alias = "_seconds")]
    pub seconds: i64,
    #[serde(default, alias = "_nanoseconds")]
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    pub fn from_date(date: OffsetDateTime) -> Self {
        Self {
            seconds: date.unix_timestamp(),
            nanoseconds: date.nanosecond(),
        }
    }

    /// `None` when the instant is outside the representable range.
    pub fn to_date(&self) -> Option<OffsetDateTime> {
        let nanos = i128::from(self.seconds) * 1_000_000_000 + i128::from(self.nanoseconds);
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}

/// Every recognised shape of a date-like value.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampValue {
    Date(OffsetDateTime),
    Stored(StoreTimestamp),
    Envelope(String),
    Text(String),
    Unrecognized(Value),
}

impl TimestampValue {
    /// Classify an arbitrary JSON value. Never fails.
    pub fn from_json(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if let Some(Value::String(raw)) = map.get("timestampValue") {
                return TimestampValue::Envelope(raw.clone());
            }
            if map.contains_key("seconds") || map.contains_key("_seconds") {
                if let Ok(ts) = serde_json::from_value::<StoreTimestamp>(value.clone()) {
                    return TimestampValue::Stored(ts);
                }
            }
        }

        match value {
            Value::String(s) => TimestampValue::Text(s),
            other => TimestampValue::Unrecognized(other),
        }
    }
}

impl From<OffsetDateTime> for TimestampValue {
    fn from(date: OffsetDateTime) -> Self {
        TimestampValue::Date(date)
    }
}

impl<'de> Deserialize<'de> for TimestampValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(TimestampValue::from_json)
    }
}

/// Coerce a date-like value into a single canonical date.
///
/// Malformed or absent input yields `None`; this never panics or errors.
pub fn normalize_timestamp(value: &TimestampValue) -> Option<OffsetDateTime> {
    match value {
        TimestampValue::Date(date) => Some(*date),
        TimestampValue::Stored(ts) => ts.to_date(),
        TimestampValue::Envelope(raw) => parse_date_string(raw),
        TimestampValue::Text(s) => parse_date_string(s),
        TimestampValue::Unrecognized(_) => None,
    }
}

/// Parse the string forms dates arrive in: RFC 3339, the `datetime-local`
/// input form and a bare date. Forms without an offset are taken as UTC.
pub fn parse_date_string(input: &str) -> Option<OffsetDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = OffsetDateTime::parse(input, &Rfc3339) {
        return Some(date);
    }

    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(date) = PrimitiveDateTime::parse(input, with_seconds) {
        return Some(date.assume_utc());
    }
    let with_minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    if let Ok(date) = PrimitiveDateTime::parse(input, with_minutes) {
        return Some(date.assume_utc());
    }

    Date::parse(input, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Format as `dd/MM/yyyy HH:mm` in Brasília time.
pub fn format_brazilian_datetime(value: OffsetDateTime) -> String {
    let format = format_description!("[day]/[month]/[year] [hour]:[minute]");
    value
        .to_offset(BRASILIA_OFFSET)
        .format(format)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_native_date_is_identity() {
        let d = datetime!(2025-03-10 14:30:00.5 UTC);
        assert_eq!(normalize_timestamp(&TimestampValue::Date(d)), Some(d));
    }

    #[test]
    fn test_stored_timestamp() {
        let value = TimestampValue::from_json(json!({ "seconds": 1735689600, "nanoseconds": 0 }));
        assert_eq!(normalize_timestamp(&value), Some(datetime!(2025-01-01 0:00 UTC)));

        let admin_sdk = TimestampValue::from_json(json!({ "_seconds": 1735689600, "_nanoseconds": 500 }));
        assert_eq!(
            normalize_timestamp(&admin_sdk),
            Some(datetime!(2025-01-01 0:00:00.000000500 UTC))
        );
    }

    #[test]
    fn test_stored_timestamp_out_of_range() {
        let ts = StoreTimestamp { seconds: i64::MAX, nanoseconds: 0 };
        assert_eq!(normalize_timestamp(&TimestampValue::Stored(ts)), None);
    }

    #[test]
    fn test_envelope() {
        let value = TimestampValue::from_json(json!({ "timestampValue": "2025-01-01T00:00:00Z" }));
        assert_eq!(
            normalize_timestamp(&value),
            parse_date_string("2025-01-01T00:00:00Z")
        );
        assert!(normalize_timestamp(&value).is_some());

        let broken = TimestampValue::from_json(json!({ "timestampValue": "garbage" }));
        assert_eq!(normalize_timestamp(&broken), None);
    }

    #[test]
    fn test_malformed_inputs_are_none() {
        for value in [
            json!(null),
            json!({}),
            json!("not a date"),
            json!(""),
            json!(42),
            json!([1, 2]),
            json!({ "timestampValue": 7 }),
            json!({ "seconds": "soon" }),
        ] {
            let ts = TimestampValue::from_json(value.clone());
            assert_eq!(normalize_timestamp(&ts), None, "{} should normalize to none", value);
        }
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(
            parse_date_string("2025-06-01T10:30:00-03:00"),
            Some(datetime!(2025-06-01 13:30 UTC))
        );
        assert_eq!(
            parse_date_string("2025-06-01T10:30"),
            Some(datetime!(2025-06-01 10:30 UTC))
        );
        assert_eq!(
            parse_date_string("2025-06-01T10:30:15"),
            Some(datetime!(2025-06-01 10:30:15 UTC))
        );
        assert_eq!(parse_date_string("2025-06-01"), Some(datetime!(2025-06-01 0:00 UTC)));
        assert_eq!(parse_date_string("2025-13-01"), None);
    }

    #[test]
    fn test_deserialize_never_fails() {
        #[derive(Deserialize)]
        struct Doc {
            when: TimestampValue,
        }

        let doc: Doc = serde_json::from_value(json!({ "when": { "weird": true } })).unwrap();
        assert_eq!(normalize_timestamp(&doc.when), None);

        let doc: Doc = serde_json::from_value(json!({ "when": "2025-01-01T00:00:00Z" })).unwrap();
        assert!(normalize_timestamp(&doc.when).is_some());
    }

    #[test]
    fn test_brazilian_display() {
        assert_eq!(format_brazilian_datetime(datetime!(2025-06-01 13:30 UTC)), "01/06/2025 10:30");
        assert_eq!(format_brazilian_datetime(datetime!(2025-01-01 2:00 UTC)), "31/12/2024 23:00");
    }
}
