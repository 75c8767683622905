//! Scalar field values used by filters, updates and row decoding.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{Display, Formatter};

/// UTC timestamp in epoch milliseconds.
pub type EpochMs = i64;

/// Milliseconds in one hour.
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> EpochMs {
    Utc::now().timestamp_millis()
}

/// Formats epoch milliseconds as RFC 3339 (`2025-01-01T00:00:00.000Z`).
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn format_epoch_ms(value: EpochMs) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parses an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_rfc3339(value: &str) -> Option<EpochMs> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc).timestamp_millis())
}

/// A single field value as stored in a catalog column.
///
/// Absent and `null` optional fields are the same state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Text(String),
    Timestamp(EpochMs),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<EpochMs> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Timestamp(value) => match format_epoch_ms(*value) {
                Some(text) => write!(f, "{text}"),
                None => write!(f, "{value}ms"),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_epoch_ms, parse_rfc3339, Value};

    #[test]
    fn rfc3339_parse_and_format_agree() {
        let parsed = parse_rfc3339("2025-01-01T00:00:00Z").expect("valid timestamp");
        assert_eq!(parsed, 1_735_689_600_000);
        assert_eq!(
            format_epoch_ms(parsed).as_deref(),
            Some("2025-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn parse_rfc3339_rejects_garbage() {
        assert_eq!(parse_rfc3339("yesterday"), None);
    }

    #[test]
    fn optional_text_converts_to_null() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(
            Value::from(Some("x".to_string())),
            Value::Text("x".to_string())
        );
    }
}
