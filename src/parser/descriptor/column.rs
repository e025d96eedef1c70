use crate::error::{Error, Result, Section};
use crate::parser::byteview::ByteView;
use crate::parser::classify::{Classified, WireCode};
use crate::parser::header::Layout;
use crate::parser::page::SubHeaderLocation;

use super::{Signature, StringRef, check_remainder, ensure_len};

const NAME_ENTRY_LEN: usize = 8;

/// Entries start after the signature and an 8-byte preamble.
const fn entries_start(layout: Layout) -> usize {
    layout.int_len() + 8
}

/// Number of fixed-width entries in a name or attribute subheader.
const fn entry_count(len: usize, layout: Layout, entry_len: usize) -> usize {
    len.saturating_sub(2 * layout.int_len() + 12) / entry_len
}

fn ensure_entries(
    payload: ByteView<'_>,
    layout: Layout,
    entries: usize,
    entry_len: usize,
    location: SubHeaderLocation,
    signature: Signature,
) -> Result<()> {
    let required = entries_start(layout) + entries * entry_len;
    if payload.len() < required {
        return Err(Error::corrupted(
            Section::Subheader { location },
            format!(
                "{} subheader truncated: {entries} entries need {required} bytes, found {}",
                signature.as_str(),
                payload.len()
            ),
        ));
    }
    Ok(())
}

/// Column name references, one per column in this fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColNames {
    pub location: SubHeaderLocation,
    pub names: Vec<StringRef>,
}

impl ColNames {
    /// # Errors
    ///
    /// Fails on a remainder mismatch or when entries run past the payload.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        check_remainder(payload, layout, location, Signature::ColName)?;
        let count = entry_count(payload.len(), layout, NAME_ENTRY_LEN);
        ensure_entries(payload, layout, count, NAME_ENTRY_LEN, location, Signature::ColName)?;
        let start = entries_start(layout);
        let names = (0..count)
            .map(|idx| StringRef::read(payload, start + idx * NAME_ENTRY_LEN))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { location, names })
    }
}

/// Physical storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Numeric,
    Character,
}

impl WireCode for StorageType {
    type Raw = u8;

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Numeric),
            2 => Some(Self::Character),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Self::Numeric => 1,
            Self::Character => 2,
        }
    }
}

/// Placement and storage class of one column within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAttr {
    pub offset: usize,
    pub length: usize,
    pub storage: Classified<StorageType>,
}

/// Column attributes, one per column in this fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColAttrs {
    pub location: SubHeaderLocation,
    pub attrs: Vec<ColumnAttr>,
}

impl ColAttrs {
    /// # Errors
    ///
    /// Fails on a remainder mismatch or when entries run past the payload.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        check_remainder(payload, layout, location, Signature::ColAttr)?;
        let int_len = layout.int_len();
        let entry_len = int_len + 8;
        let count = entry_count(payload.len(), layout, entry_len);
        ensure_entries(payload, layout, count, entry_len, location, Signature::ColAttr)?;
        let start = entries_start(layout);
        let attrs = (0..count)
            .map(|idx| {
                let entry = start + idx * entry_len;
                Ok(ColumnAttr {
                    offset: payload.usize_at(entry, int_len)?,
                    length: payload.u32_at(entry + int_len)? as usize,
                    storage: Classified::classify(payload.u8_at(entry + int_len + 6)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { location, attrs })
    }
}

/// Format and label of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColLabs {
    pub location: SubHeaderLocation,
    pub format: StringRef,
    pub label: StringRef,
    pub width: u16,
    pub precision: u16,
}

impl ColLabs {
    /// # Errors
    ///
    /// Fails when the payload is shorter than the label reference.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        let int_len = layout.int_len();
        let label_offset = 3 * int_len + 28;
        ensure_len(payload, label_offset + StringRef::LEN, location, Signature::ColLabs)?;
        Ok(Self {
            location,
            width: payload.u16_at(2 * int_len + 8)?,
            precision: payload.u16_at(2 * int_len + 10)?,
            format: StringRef::read(payload, 3 * int_len + 22)?,
            label: StringRef::read(payload, label_offset)?,
        })
    }
}
