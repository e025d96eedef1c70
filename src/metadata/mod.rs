use std::fmt;

use time::PrimitiveDateTime;

/// Dataset-level schema exposed to higher layers.
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    pub name: Option<String>,
    pub label: Option<String>,
    pub file_type: Option<String>,
    pub row_count: u64,
    pub timestamps: DatasetTimestamps,
    pub release: Option<String>,
    pub version: Option<SasVersion>,
    pub vendor: Vendor,
    pub host: Option<String>,
    pub os_name: Option<String>,
    pub encoding: &'static str,
    pub endianness: Endianness,
    pub compression: Compression,
    pub columns: Vec<Column>,
    pub column_list: Vec<i16>,
}

impl DatasetMetadata {
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Looks a column up by its trimmed name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        let name = name.trim_end();
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Dataset creation and modification times.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetTimestamps {
    pub created: Option<PrimitiveDateTime>,
    pub modified: Option<PrimitiveDateTime>,
}

/// SAS version components extracted from the release string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SasVersion {
    pub major: u16,
    pub minor: u16,
    pub revision: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Sas,
    StatTransfer,
}

/// Row compression mode reported for the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    Rle,
    Rdc,
    Unknown(String),
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Rle => f.write_str("rle"),
            Self::Rdc => f.write_str("rdc"),
            Self::Unknown(id) => write!(f, "unknown ({id})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Little => "little",
            Self::Big => "big",
        }
    }
}

/// One column of the dataset, in physical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub index: u32,
    pub name: String,
    pub kind: ColumnType,
    pub offset: usize,
    pub length: usize,
    pub format: Option<Format>,
    pub label: Option<String>,
}

/// Logical type of a column.
///
/// `Date`, `DateTime` and `Time` columns are stored as numerics and typed from
/// their format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Character,
    Numeric,
    Date,
    DateTime,
    Time,
}

impl ColumnType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Character)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub name: String,
    pub width: u16,
    pub precision: u16,
}

/// Where a marker must appear in a normalised format name.
#[derive(Clone, Copy)]
enum Marker {
    Anywhere(&'static str),
    Prefix(&'static str),
    Suffix(&'static str),
}

impl Marker {
    fn matches(self, name: &str) -> bool {
        match self {
            Self::Anywhere(part) => name.contains(part),
            Self::Prefix(part) => name.starts_with(part),
            Self::Suffix(part) => name.ends_with(part),
        }
    }
}

/// Calendar kinds in match order: datetime names also contain `TIME` or
/// `DATE`, so they are tried first.
const CALENDAR_FORMATS: [(ColumnType, &[Marker]); 3] = [
    (
        ColumnType::DateTime,
        &[
            Marker::Anywhere("DATETIME"),
            Marker::Suffix("DT"),
            Marker::Prefix("E8601DT"),
            Marker::Prefix("B8601DT"),
        ],
    ),
    (
        ColumnType::Time,
        &[
            Marker::Anywhere("TIME"),
            Marker::Suffix("TM"),
            Marker::Prefix("E8601TM"),
        ],
    ),
    (
        ColumnType::Date,
        &[
            Marker::Anywhere("DATE"),
            Marker::Anywhere("YY"),
            Marker::Anywhere("MON"),
            Marker::Anywhere("WEEK"),
            Marker::Anywhere("YEAR"),
            Marker::Anywhere("MINGUO"),
            Marker::Suffix("DA"),
            Marker::Prefix("E8601DA"),
            Marker::Prefix("B8601DA"),
        ],
    ),
];

impl Format {
    /// Kind of a numeric column carrying this format.
    #[must_use]
    pub fn numeric_type(&self) -> ColumnType {
        let name = self.name.trim().trim_matches('.').to_ascii_uppercase();
        if name.is_empty() {
            return ColumnType::Numeric;
        }
        CALENDAR_FORMATS
            .iter()
            .find(|(_, markers)| markers.iter().any(|marker| marker.matches(&name)))
            .map_or(ColumnType::Numeric, |(kind, _)| *kind)
    }
}
