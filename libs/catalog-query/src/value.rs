use std::cmp::Ordering;
use std::fmt;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::schema::FieldKind;

/// A typed field value, read from a record or coerced from a query string.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(Uuid),
    DateTime(OffsetDateTime),
}

impl Value {
    /// Coerce a raw query-string value into `kind`.
    ///
    /// Returns `None` when the text does not parse as that kind. Strings are
    /// taken verbatim; every other kind is trimmed first.
    #[must_use]
    pub fn coerce(kind: FieldKind, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match kind {
            FieldKind::String => Some(Value::String(raw.to_owned())),
            FieldKind::I64 => trimmed.parse().ok().map(Value::I64),
            FieldKind::F64 => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::F64),
            FieldKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            FieldKind::Uuid => Uuid::parse_str(trimmed).ok().map(Value::Uuid),
            FieldKind::DateTime => OffsetDateTime::parse(trimmed, &Rfc3339)
                .ok()
                .map(Value::DateTime),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual form used by substring matching; `None` for `Null`.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::I64(i) => Some(i.to_string()),
            Value::F64(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Uuid(u) => Some(u.to_string()),
            Value::DateTime(dt) => dt.format(&Rfc3339).ok(),
        }
    }

    /// Compare two values of compatible kinds. Integers and floats compare
    /// numerically; any other kind mismatch (and `Null`) is incomparable.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
            (Value::F64(a), Value::F64(b)) => a.partial_cmp(b),
            (Value::I64(a), Value::F64(b)) => (*a as f64).partial_cmp(b),
            (Value::F64(a), Value::I64(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting: `Null` sorts after every value,
    /// incomparable pairs are treated as equal so the sort stays stable.
    #[must_use]
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::I64(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Value::Null, Value::I64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
