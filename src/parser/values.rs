use std::borrow::Cow;

use encoding_rs::Encoding;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

use crate::error::{Error, Result, Section};
use crate::metadata::{Column, ColumnType, Endianness};
use crate::value::{MissingValue, Value};

use super::encoding::decode_text;

const SECONDS_PER_DAY: f64 = 86_400.0;
/// Beyond this magnitude no calendar value is representable.
const MAX_ABS_SECONDS: f64 = 1.0e12;

/// A decoded numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    Number(f64),
    Missing(MissingValue),
}

/// Widens a numeric field of 1 to 8 bytes into the bits of an IEEE double.
///
/// Stored bytes are the high-order bytes of the double; the dropped
/// low-order bytes are zero.
#[must_use]
pub fn numeric_bits(slice: &[u8], order: Endianness) -> u64 {
    let mut buf = [0u8; 8];
    let len = slice.len().min(8);
    match order {
        Endianness::Little => {
            buf[8 - len..].copy_from_slice(&slice[..len]);
            u64::from_le_bytes(buf)
        }
        Endianness::Big => {
            buf[..len].copy_from_slice(&slice[..len]);
            u64::from_be_bytes(buf)
        }
    }
}

#[must_use]
pub const fn numeric_bits_is_missing(raw: u64) -> bool {
    const EXP_MASK: u64 = 0x7FF0_0000_0000_0000;
    const FRACTION_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;
    (raw & EXP_MASK) == EXP_MASK && (raw & FRACTION_MASK) != 0
}

/// Missing-value kind encoded in the NaN payload.
#[must_use]
pub const fn decode_missing_from_bits(raw: u64) -> MissingValue {
    let tag_byte = !(((raw >> 40) & 0xFF) as u8);
    match tag_byte {
        0 => MissingValue::Tagged('_'),
        2..=27 => MissingValue::Tagged((b'A' + (tag_byte - 2)) as char),
        _ => MissingValue::System,
    }
}

#[must_use]
pub fn decode_numeric(slice: &[u8], order: Endianness) -> NumericCell {
    if slice.is_empty() {
        return NumericCell::Missing(MissingValue::System);
    }
    let raw = numeric_bits(slice, order);
    if numeric_bits_is_missing(raw) {
        NumericCell::Missing(decode_missing_from_bits(raw))
    } else {
        NumericCell::Number(f64::from_bits(raw))
    }
}

fn sas_epoch_date() -> Option<Date> {
    Date::from_calendar_date(1960, Month::January, 1).ok()
}

fn bounded_duration(seconds: f64) -> Option<Duration> {
    (seconds.is_finite() && seconds.abs() < MAX_ABS_SECONDS).then(|| Duration::seconds_f64(seconds))
}

/// Whole days since 1960-01-01.
#[must_use]
pub fn sas_days_to_date(days: f64) -> Option<Date> {
    let duration = bounded_duration(days.floor() * SECONDS_PER_DAY)?;
    sas_epoch_date()?.checked_add(duration)
}

/// Fractional seconds since 1960-01-01T00:00:00.
#[must_use]
pub fn sas_seconds_to_datetime(seconds: f64) -> Option<PrimitiveDateTime> {
    let duration = bounded_duration(seconds)?;
    PrimitiveDateTime::new(sas_epoch_date()?, Time::MIDNIGHT).checked_add(duration)
}

/// Fractional seconds since midnight.
#[must_use]
pub fn sas_seconds_to_time(seconds: f64) -> Option<Duration> {
    bounded_duration(seconds)
}

/// Decoder bound to one column's byte range within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueReader {
    pub kind: ColumnType,
    offset: usize,
    length: usize,
}

impl ValueReader {
    /// Binds a reader to `column`, checking that it fits a row of
    /// `row_length` bytes.
    ///
    /// # Errors
    ///
    /// Fails when the column overruns the row or a numeric column is wider
    /// than 8 bytes.
    pub fn bind(column: &Column, row_length: usize) -> Result<Self> {
        let section = Section::Column {
            index: column.index,
        };
        if column.offset.checked_add(column.length).is_none_or(|end| end > row_length) {
            return Err(Error::corrupted(
                section,
                format!(
                    "bytes {}..{} exceed row length {row_length}",
                    column.offset,
                    column.offset.saturating_add(column.length)
                ),
            ));
        }
        if column.kind.is_numeric() && !(1..=8).contains(&column.length) {
            return Err(Error::corrupted(
                section,
                format!("numeric width {} outside 1..=8", column.length),
            ));
        }
        Ok(Self {
            kind: column.kind,
            offset: column.offset,
            length: column.length,
        })
    }

    fn slice<'r>(&self, row: &'r [u8]) -> &'r [u8] {
        &row[self.offset..self.offset + self.length]
    }

    /// The numeric cell; callers check the column is numeric-backed.
    #[must_use]
    pub fn numeric(&self, row: &[u8], order: Endianness) -> NumericCell {
        decode_numeric(self.slice(row), order)
    }

    /// Raw double, NaN for any missing value.
    #[must_use]
    pub fn number(&self, row: &[u8], order: Endianness) -> f64 {
        f64::from_bits(numeric_bits(self.slice(row), order))
    }

    #[must_use]
    pub fn text<'r>(&self, row: &'r [u8], encoding: &'static Encoding) -> Option<Cow<'r, str>> {
        decode_text(self.slice(row), encoding)
    }

    /// Typed value for the column's declared kind.
    #[must_use]
    pub fn value<'r>(&self, row: &'r [u8], order: Endianness, encoding: &'static Encoding) -> Value<'r> {
        if self.kind == ColumnType::Character {
            return self
                .text(row, encoding)
                .map_or(Value::Missing(MissingValue::System), Value::Text);
        }
        let number = match self.numeric(row, order) {
            NumericCell::Missing(missing) => return Value::Missing(missing),
            NumericCell::Number(number) => number,
        };
        let converted = match self.kind {
            ColumnType::Date => sas_days_to_date(number).map(Value::Date),
            ColumnType::DateTime => sas_seconds_to_datetime(number).map(Value::DateTime),
            ColumnType::Time => sas_seconds_to_time(number).map(Value::Time),
            ColumnType::Numeric | ColumnType::Character => None,
        };
        converted.unwrap_or(Value::Number(number))
    }
}
