//! Forward-only row cursor over packed or compressed row storage.

pub mod compression;
mod compressed;
mod packed;

use std::borrow::Cow;

use time::{Date, Duration, PrimitiveDateTime};

use crate::error::{Error, Result, Section};
use crate::metadata::{Column, ColumnType};
use crate::value::Value;

use super::document::Document;
use super::values::{
    NumericCell, ValueReader, sas_days_to_date, sas_seconds_to_datetime, sas_seconds_to_time,
};
use super::window::{ByteSource, PageWindow};

pub use compressed::CompressedRows;
pub use packed::PackedRows;

/// One way of laying rows out in the file.
pub trait RowStrategy {
    /// Fills `row` with the next stored row.
    ///
    /// Returns `false` once the file holds no further rows.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, structural corruption and malformed compressed
    /// payloads.
    fn fill_next<S: ByteSource>(
        &mut self,
        window: &mut PageWindow<S>,
        document: &Document,
        row: &mut [u8],
    ) -> Result<bool>;

    /// Whether the row just filled is marked deleted. No on-disk marker is
    /// decoded yet, so every row is live.
    fn is_deleted(&self, _row: &[u8]) -> bool {
        false
    }
}

/// The strategy selected by the file's compression id.
#[derive(Debug)]
pub enum RowLayout {
    Packed(PackedRows),
    Compressed(CompressedRows),
}

impl RowLayout {
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] when the compression id is not recognised.
    pub fn for_document(document: &Document) -> Result<Self> {
        Ok(match document.row_codec()? {
            None => Self::Packed(PackedRows::new()),
            Some(codec) => Self::Compressed(CompressedRows::new(codec, document.last_meta)),
        })
    }
}

impl RowStrategy for RowLayout {
    fn fill_next<S: ByteSource>(
        &mut self,
        window: &mut PageWindow<S>,
        document: &Document,
        row: &mut [u8],
    ) -> Result<bool> {
        match self {
            Self::Packed(rows) => rows.fill_next(window, document, row),
            Self::Compressed(rows) => rows.fill_next(window, document, row),
        }
    }

    fn is_deleted(&self, row: &[u8]) -> bool {
        match self {
            Self::Packed(rows) => rows.is_deleted(row),
            Self::Compressed(rows) => rows.is_deleted(row),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    BeforeFirst,
    At(u64),
    Exhausted,
}

/// Row window applied on top of the stored rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowWindow {
    pub skip: u64,
    pub max: Option<u64>,
}

/// Forward-only cursor over the rows of one file.
///
/// The cursor owns a single row buffer that is overwritten by every call to
/// [`RowCursor::next`]; borrowed text returned by the getters is only valid
/// until then.
pub struct RowCursor<'a, S> {
    window: &'a mut PageWindow<S>,
    document: &'a Document,
    columns: Vec<Column>,
    readers: Vec<ValueReader>,
    rows: RowLayout,
    row: Vec<u8>,
    state: CursorState,
    decoded: u64,
    yielded: u64,
    limits: RowWindow,
}

impl<'a, S: ByteSource> RowCursor<'a, S> {
    /// Binds a cursor to an assembled document.
    ///
    /// # Errors
    ///
    /// Fails when the compression id is unsupported or a column does not fit
    /// the declared row length.
    pub fn new(
        window: &'a mut PageWindow<S>,
        document: &'a Document,
        limits: RowWindow,
    ) -> Result<Self> {
        let rows = RowLayout::for_document(document)?;
        let row_length = document.row_size.row_length;
        let columns = document.columns()?;
        let readers = columns
            .iter()
            .map(|column| ValueReader::bind(column, row_length))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            window,
            document,
            columns,
            readers,
            rows,
            row: vec![0u8; row_length],
            state: CursorState::BeforeFirst,
            decoded: 0,
            yielded: 0,
            limits,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Total rows the file declares, before the row window is applied.
    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.document.row_size.row_count
    }

    /// Advances to the next live row inside the row window.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, corrupted pages or compressed payloads, and when
    /// the pages run out before the declared row count is reached.
    pub fn next(&mut self) -> Result<bool> {
        if self.state == CursorState::Exhausted {
            return Ok(false);
        }
        loop {
            let row_count = self.row_count();
            let at_limit = self.limits.max.is_some_and(|max| self.yielded >= max);
            if self.decoded >= row_count || at_limit {
                self.state = CursorState::Exhausted;
                return Ok(false);
            }
            if !self
                .rows
                .fill_next(self.window, self.document, &mut self.row)?
            {
                self.state = CursorState::Exhausted;
                return Err(Error::corrupted(
                    Section::Row {
                        index: self.decoded,
                    },
                    format!("row storage ended after {} of {row_count} rows", self.decoded),
                ));
            }
            let index = self.decoded;
            self.decoded += 1;
            if self.rows.is_deleted(&self.row) || index < self.limits.skip {
                continue;
            }
            self.yielded += 1;
            self.state = CursorState::At(index);
            return Ok(true);
        }
    }

    /// Zero-based index of the current row among the stored rows.
    #[must_use]
    pub const fn row_index(&self) -> Option<u64> {
        match self.state {
            CursorState::At(index) => Some(index),
            CursorState::BeforeFirst | CursorState::Exhausted => None,
        }
    }

    /// Bytes of the current row.
    #[must_use]
    pub fn raw_row(&self) -> Option<&[u8]> {
        self.row_index().map(|_| self.row.as_slice())
    }

    fn current(&self) -> Result<&[u8]> {
        self.raw_row().ok_or(Error::NotPositioned)
    }

    fn reader(&self, column: usize) -> Result<&ValueReader> {
        self.readers.get(column).ok_or(Error::ColumnIndex {
            index: column,
            count: self.readers.len(),
        })
    }

    fn expect_kind(&self, column: usize, expected: ColumnType) -> Result<(&ValueReader, &[u8])> {
        let reader = self.reader(column)?;
        let matches = match expected {
            ColumnType::Numeric => reader.kind.is_numeric(),
            other => reader.kind == other,
        };
        if !matches {
            return Err(Error::TypeMismatch {
                column,
                expected,
                actual: reader.kind,
            });
        }
        Ok((reader, self.current()?))
    }

    fn numeric_cell(&self, column: usize, expected: ColumnType) -> Result<Option<f64>> {
        let (reader, row) = self.expect_kind(column, expected)?;
        Ok(match reader.numeric(row, self.document.header.endianness) {
            NumericCell::Number(number) => Some(number),
            NumericCell::Missing(_) => None,
        })
    }

    /// The stored double of any numeric-backed column; NaN when missing.
    ///
    /// # Errors
    ///
    /// Fails for character columns, bad indices and an unpositioned cursor.
    pub fn number(&self, column: usize) -> Result<f64> {
        let (reader, row) = self.expect_kind(column, ColumnType::Numeric)?;
        Ok(reader.number(row, self.document.header.endianness))
    }

    /// Text of a character column; `None` when blank.
    ///
    /// # Errors
    ///
    /// Fails for numeric columns, bad indices and an unpositioned cursor.
    pub fn text(&self, column: usize) -> Result<Option<Cow<'_, str>>> {
        let (reader, row) = self.expect_kind(column, ColumnType::Character)?;
        Ok(reader.text(row, self.document.encoding))
    }

    /// # Errors
    ///
    /// Fails unless the column is a date column and the cursor is positioned.
    pub fn date(&self, column: usize) -> Result<Option<Date>> {
        Ok(self
            .numeric_cell(column, ColumnType::Date)?
            .and_then(sas_days_to_date))
    }

    /// # Errors
    ///
    /// Fails unless the column is a datetime column and the cursor is
    /// positioned.
    pub fn date_time(&self, column: usize) -> Result<Option<PrimitiveDateTime>> {
        Ok(self
            .numeric_cell(column, ColumnType::DateTime)?
            .and_then(sas_seconds_to_datetime))
    }

    /// # Errors
    ///
    /// Fails unless the column is a time column and the cursor is positioned.
    pub fn time(&self, column: usize) -> Result<Option<Duration>> {
        Ok(self
            .numeric_cell(column, ColumnType::Time)?
            .and_then(sas_seconds_to_time))
    }

    /// Typed value for the column's declared kind.
    ///
    /// # Errors
    ///
    /// Fails for bad indices and an unpositioned cursor.
    pub fn value(&self, column: usize) -> Result<Value<'_>> {
        let reader = self.reader(column)?;
        let row = self.current()?;
        Ok(reader.value(row, self.document.header.endianness, self.document.encoding))
    }

    /// Every value of the current row, in column order.
    ///
    /// # Errors
    ///
    /// Fails when the cursor is not positioned on a row.
    pub fn values(&self) -> Result<Vec<Value<'_>>> {
        let row = self.current()?;
        let order = self.document.header.endianness;
        Ok(self
            .readers
            .iter()
            .map(|reader| reader.value(row, order, self.document.encoding))
            .collect())
    }
}
