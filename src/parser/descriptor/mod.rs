//! Schema fragments decoded from plain subheader payloads.

mod column;
mod row_index;
mod row_size;
mod text;

pub use column::{ColAttrs, ColLabs, ColNames, ColumnAttr, StorageType};
pub use row_index::RowIndex;
pub use row_size::RowSize;
pub use text::{ColText, raw_bytes, resolve};

use crate::error::{Error, Result, Section};

use super::byteview::ByteView;
use super::classify::{Classified, WireCode};
use super::header::Layout;
use super::page::SubHeaderLocation;

const SIG_ROW_SIZE: u32 = 0xF7F7_F7F7;
const SIG_COL_SIZE: u32 = 0xF6F6_F6F6;
const SIG_SUBH_CNT: u32 = 0xFFFF_FC00;
const SIG_COL_TEXT: u32 = 0xFFFF_FFFD;
const SIG_COL_ATTR: u32 = 0xFFFF_FFFC;
const SIG_COL_NAME: u32 = 0xFFFF_FFFF;
const SIG_COL_LABS: u32 = 0xFFFF_FBFE;
const SIG_COL_LIST: u32 = 0xFFFF_FFFE;

/// Filler seen beside the row/column size words in 64-bit files.
const SIG_64_FILLER: u32 = 0xFFFF_FBFE;

/// Descriptor type named by a subheader's leading signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    RowSize,
    ColSize,
    SubhCnt,
    ColText,
    ColAttr,
    ColName,
    ColLabs,
    ColList,
}

impl Signature {
    const ALL: [Self; 8] = [
        Self::RowSize,
        Self::ColSize,
        Self::SubhCnt,
        Self::ColText,
        Self::ColAttr,
        Self::ColName,
        Self::ColLabs,
        Self::ColList,
    ];

    const fn word(self) -> u32 {
        match self {
            Self::RowSize => SIG_ROW_SIZE,
            Self::ColSize => SIG_COL_SIZE,
            Self::SubhCnt => SIG_SUBH_CNT,
            Self::ColText => SIG_COL_TEXT,
            Self::ColAttr => SIG_COL_ATTR,
            Self::ColName => SIG_COL_NAME,
            Self::ColLabs => SIG_COL_LABS,
            Self::ColList => SIG_COL_LIST,
        }
    }

    fn from_word(word: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|signature| signature.word() == word)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RowSize => "ROW_SIZE",
            Self::ColSize => "COL_SIZE",
            Self::SubhCnt => "SUBH_CNT",
            Self::ColText => "COL_TEXT",
            Self::ColAttr => "COL_ATTR",
            Self::ColName => "COL_NAME",
            Self::ColLabs => "COL_LABS",
            Self::ColList => "COL_LIST",
        }
    }

    /// Reads and classifies the signature at the start of `payload`.
    ///
    /// Returns `None` when the payload is shorter than a signature.
    #[must_use]
    pub fn read(payload: ByteView<'_>, layout: Layout) -> Option<Classified<Self>> {
        let raw = payload.uint_at(0, layout.signature_len()).ok()?;
        if !layout.is_u64 {
            return Some(Classified::classify(raw));
        }
        Some(Self::from_wide(raw).map_or(Classified::Unknown(raw), Classified::Known))
    }

    /// Classifies the 8-byte signature of a 64-bit file.
    ///
    /// Only the row and column size words may sit beside a zero or filler
    /// half; every other signature needs an all-ones high half.
    fn from_wide(raw: u64) -> Option<Self> {
        let high = (raw >> 32) as u32;
        let low = raw as u32;
        if high == u32::MAX {
            return Self::from_word(low)
                .filter(|signature| !matches!(signature, Self::RowSize | Self::ColSize));
        }
        for (word, other) in [(low, high), (high, low)] {
            if (other == 0 || other == SIG_64_FILLER)
                && let Some(signature @ (Self::RowSize | Self::ColSize)) = Self::from_word(word)
            {
                return Some(signature);
            }
        }
        None
    }
}

impl WireCode for Signature {
    /// The signature bytes read in file order, zero-extended in 32-bit files.
    type Raw = u64;

    fn from_raw(raw: u64) -> Option<Self> {
        u32::try_from(raw).map_or_else(|_| Self::from_wide(raw), Self::from_word)
    }

    fn raw(self) -> u64 {
        u64::from(self.word())
    }
}

/// Indirect string: (text block, offset, length) into the column-text blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringRef {
    pub block: u16,
    pub offset: u16,
    pub length: u16,
}

impl StringRef {
    pub const LEN: usize = 6;

    /// Reads a reference at `offset` of `view`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the reference leaves the view.
    pub fn read(view: ByteView<'_>, offset: usize) -> Result<Self> {
        Ok(Self {
            block: view.u16_at(offset)?,
            offset: view.u16_at(offset + 2)?,
            length: view.u16_at(offset + 4)?,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Column count descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColSize {
    pub location: SubHeaderLocation,
    pub count: usize,
}

impl ColSize {
    /// # Errors
    ///
    /// Fails when the payload is too short for the count field.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        let int_len = layout.int_len();
        ensure_len(payload, 2 * int_len, location, Signature::ColSize)?;
        Ok(Self {
            location,
            count: payload.usize_at(int_len, int_len)?,
        })
    }
}

/// Subheader-count marker; only its location is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubhCnt {
    pub location: SubHeaderLocation,
}

const COL_LIST_HEADER_LEN: usize = 30;
const COL_LIST_COUNT_OFFSET: usize = 18;

/// Optional column display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColList {
    pub location: SubHeaderLocation,
    pub values: Vec<i16>,
}

impl ColList {
    /// Parses a column list. 64-bit lists are not decoded and come back empty.
    ///
    /// # Errors
    ///
    /// Fails when the declared list runs past the payload.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        if layout.is_u64 {
            return Ok(Self {
                location,
                values: Vec::new(),
            });
        }
        ensure_len(payload, COL_LIST_HEADER_LEN, location, Signature::ColList)?;
        let count = usize::from(payload.u16_at(COL_LIST_COUNT_OFFSET)?);
        ensure_len(
            payload,
            COL_LIST_HEADER_LEN + count * 2,
            location,
            Signature::ColList,
        )?;
        let values = (0..count)
            .map(|idx| payload.i16_at(COL_LIST_HEADER_LEN + idx * 2))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { location, values })
    }
}

/// One decoded schema fragment.
#[derive(Debug, Clone)]
pub enum Descriptor {
    RowSize(RowSize),
    ColSize(ColSize),
    SubhCnt(SubhCnt),
    ColText(ColText),
    ColAttr(ColAttrs),
    ColName(ColNames),
    ColLabs(ColLabs),
    ColList(ColList),
}

impl Descriptor {
    /// Decodes the payload of a plain subheader with a recognised signature.
    ///
    /// # Errors
    ///
    /// Fails when the payload is too short or internally inconsistent for
    /// its descriptor type.
    pub fn parse(
        signature: Signature,
        payload: ByteView<'_>,
        layout: Layout,
        location: SubHeaderLocation,
    ) -> Result<Self> {
        Ok(match signature {
            Signature::RowSize => Self::RowSize(RowSize::parse(payload, layout, location)?),
            Signature::ColSize => Self::ColSize(ColSize::parse(payload, layout, location)?),
            Signature::SubhCnt => Self::SubhCnt(SubhCnt { location }),
            Signature::ColText => Self::ColText(ColText::parse(payload, layout, location)?),
            Signature::ColAttr => Self::ColAttr(ColAttrs::parse(payload, layout, location)?),
            Signature::ColName => Self::ColName(ColNames::parse(payload, layout, location)?),
            Signature::ColLabs => Self::ColLabs(ColLabs::parse(payload, layout, location)?),
            Signature::ColList => Self::ColList(ColList::parse(payload, layout, location)?),
        })
    }

    #[must_use]
    pub const fn signature(&self) -> Signature {
        match self {
            Self::RowSize(_) => Signature::RowSize,
            Self::ColSize(_) => Signature::ColSize,
            Self::SubhCnt(_) => Signature::SubhCnt,
            Self::ColText(_) => Signature::ColText,
            Self::ColAttr(_) => Signature::ColAttr,
            Self::ColName(_) => Signature::ColName,
            Self::ColLabs(_) => Signature::ColLabs,
            Self::ColList(_) => Signature::ColList,
        }
    }
}

fn ensure_len(
    payload: ByteView<'_>,
    required: usize,
    location: SubHeaderLocation,
    signature: Signature,
) -> Result<()> {
    if payload.len() < required {
        return Err(Error::corrupted(
            Section::Subheader { location },
            format!(
                "{} subheader has {} bytes, needs at least {required}",
                signature.as_str(),
                payload.len()
            ),
        ));
    }
    Ok(())
}

/// Checks the u16 remainder word that follows the signature in text, name
/// and attribute subheaders.
fn check_remainder(
    payload: ByteView<'_>,
    layout: Layout,
    location: SubHeaderLocation,
    signature: Signature,
) -> Result<()> {
    let sig_len = layout.signature_len();
    let base = 4 + 2 * sig_len;
    ensure_len(payload, base, location, signature)?;
    let remainder = payload.u16_at(sig_len)?;
    let expected = payload.len() - base;
    if usize::from(remainder) != expected {
        return Err(Error::corrupted(
            Section::Subheader { location },
            format!(
                "{} remainder {remainder} does not match payload remainder {expected}",
                signature.as_str()
            ),
        ));
    }
    Ok(())
}
