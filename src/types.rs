use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// A single database value, usable both as a bound parameter and as a
/// queried cell.
///
/// ```rust
/// use sqlite_dispatch::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The stored boolean, accepting the engine's 0/1 integer encoding.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            _ => None,
        }
    }

    /// The stored timestamp, parsing text cells in the formats the engine
    /// round-trips (`YYYY-MM-DD HH:MM:SS`, optionally with fractional
    /// seconds).
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(dt) => Some(*dt),
            Self::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_integer_encoding() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
        assert_eq!(RowValues::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn timestamp_parses_text_cells() {
        let plain = RowValues::Text("2024-01-02 03:04:05".into());
        let fractional = RowValues::Text("2024-01-02 03:04:05.250".into());
        assert!(plain.as_timestamp().is_some());
        assert_eq!(
            fractional.as_timestamp().map(|dt| dt.and_utc().timestamp_subsec_millis()),
            Some(250)
        );
        assert_eq!(RowValues::Int(5).as_timestamp(), None);
    }

    #[test]
    fn accessors_reject_other_variants() {
        assert_eq!(RowValues::Text("x".into()).as_int(), None);
        assert_eq!(RowValues::Int(1).as_text(), None);
        assert!(RowValues::Null.is_null());
    }
}
