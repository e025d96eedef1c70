use std::borrow::Cow;

use time::{Date, Duration, PrimitiveDateTime};

/// A single cell value produced by the row cursor.
///
/// Borrowed text points into the cursor's current row buffer and is only valid
/// until the cursor advances; use [`Value::into_owned`] to keep it longer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// 64-bit floating point number.
    Number(f64),
    /// Text converted from the file's character set.
    Text(Cow<'a, str>),
    /// SAS date (days since 1960-01-01).
    Date(Date),
    /// SAS datetime (seconds since 1960-01-01T00:00:00).
    DateTime(PrimitiveDateTime),
    /// SAS time (seconds since midnight).
    Time(Duration),
    /// Missing numeric or blank text.
    Missing(MissingValue),
}

impl Value<'_> {
    #[must_use]
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Number(v) => Value::Number(v),
            Value::Text(s) => Value::Text(Cow::Owned(s.into_owned())),
            Value::Date(d) => Value::Date(d),
            Value::DateTime(dt) => Value::DateTime(dt),
            Value::Time(duration) => Value::Time(duration),
            Value::Missing(missing) => Value::Missing(missing),
        }
    }

    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Value::Missing(_))
    }
}

/// Variants of missing values encountered in SAS datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingValue {
    /// System missing, `.` in SAS, or a blank character value.
    System,
    /// Special missing tagged with `_` or a letter `A`-`Z`.
    Tagged(char),
}
