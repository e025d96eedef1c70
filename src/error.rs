use std::borrow::Cow;
use std::fmt;
use std::io;

use crate::metadata::ColumnType;
use crate::parser::SubHeaderLocation;

/// Result type used across the SAS7BDAT reader.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type surfaced by the reader.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure while reading from the underlying byte source.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A typed read reached past the end of a byte view.
    #[error("read of {len} bytes at offset {offset} exceeds view of {available} bytes")]
    OutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// Failure to resolve or apply a character encoding.
    #[error("encoding conversion from {encoding} failed: {details}")]
    Encoding {
        encoding: Cow<'static, str>,
        details: Cow<'static, str>,
    },

    /// The file appears to be corrupt or inconsistent while processing a section.
    #[error("corrupted SAS file while processing {section}: {details}")]
    Corrupted {
        section: Section,
        details: Cow<'static, str>,
    },

    /// A descriptor appeared a different number of times than the schema requires.
    #[error("expected {expected} {descriptor} entries, found {actual}")]
    Cardinality {
        descriptor: &'static str,
        expected: usize,
        actual: usize,
    },

    /// SAS features that the reader does not decode.
    #[error("unsupported SAS feature: {feature}")]
    Unsupported { feature: Cow<'static, str> },

    /// Metadata could not be interpreted according to expectations.
    #[error("invalid SAS metadata: {details}")]
    InvalidMetadata { details: Cow<'static, str> },

    /// Column index outside the dataset's column range.
    #[error("column index {index} out of range for {count} columns")]
    ColumnIndex { index: usize, count: usize },

    /// Row accessor used before the first row or after the last one.
    #[error("row cursor is not positioned on a row")]
    NotPositioned,

    /// Accessor does not match the column's declared type.
    #[error("column {column} is {actual}, not {expected}")]
    TypeMismatch {
        column: usize,
        expected: ColumnType,
        actual: ColumnType,
    },
}

impl Error {
    pub(crate) fn corrupted(section: Section, details: impl Into<Cow<'static, str>>) -> Self {
        Self::Corrupted {
            section,
            details: details.into(),
        }
    }
}

/// Logical section of the parser used for diagnostic reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Header,
    Page { index: u64 },
    Subheader { location: SubHeaderLocation },
    Row { index: u64 },
    Column { index: u32 },
    Decompression { page_index: u64 },
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "file header"),
            Self::Page { index } => write!(f, "page {index}"),
            Self::Subheader { location } => write!(
                f,
                "subheader {} on page {}",
                location.slot, location.page
            ),
            Self::Row { index } => write!(f, "row {index}"),
            Self::Column { index } => write!(f, "column {index}"),
            Self::Decompression { page_index } => {
                write!(f, "page {page_index} during decompression")
            }
        }
    }
}
