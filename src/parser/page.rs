use std::fmt;

use crate::error::{Error, Result, Section};

use super::byteview::ByteView;
use super::classify::{Classified, WireCode};
use super::header::Layout;

/// Flag bit carried in the page type word, masked off before classification.
pub const PAGE_FLAG_MASK: u16 = 0x0080;

const BLOCK_COUNT_OFFSET: usize = 2;
const SUBHEADER_COUNT_OFFSET: usize = 4;

/// Role of a page, from the type word at the page-bit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Meta,
    Data,
    Mix,
    Amd,
    Metc,
    Index,
}

impl WireCode for PageType {
    type Raw = u16;

    fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0x0000 => Some(Self::Meta),
            0x0100 => Some(Self::Data),
            0x0200 => Some(Self::Mix),
            0x0400 => Some(Self::Amd),
            0x4000 => Some(Self::Metc),
            0x9000 => Some(Self::Index),
            _ => None,
        }
    }

    fn raw(self) -> u16 {
        match self {
            Self::Meta => 0x0000,
            Self::Data => 0x0100,
            Self::Mix => 0x0200,
            Self::Amd => 0x0400,
            Self::Metc => 0x4000,
            Self::Index => 0x9000,
        }
    }
}

impl PageType {
    /// Whether pages of this type hold a subheader pointer table.
    #[must_use]
    pub const fn carries_subheaders(self) -> bool {
        matches!(self, Self::Meta | Self::Mix | Self::Amd)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Meta => "META",
            Self::Data => "DATA",
            Self::Mix => "MIX",
            Self::Amd => "AMD",
            Self::Metc => "METC",
            Self::Index => "INDEX",
        }
    }
}

/// Fixed leading region of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub index: u64,
    pub page_type: Classified<PageType>,
    /// Type word as stored, flag bits included.
    pub raw_type: u16,
    pub block_count: u16,
    pub subheader_count: u16,
    /// Offset of the subheader pointer array within the page.
    pub pointers_offset: usize,
}

impl PageHeader {
    /// Parses the header of page `index` from its loaded bytes.
    ///
    /// # Errors
    ///
    /// Fails when the page is too short to hold the header.
    pub fn parse(page: ByteView<'_>, index: u64, layout: Layout) -> Result<Self> {
        let base = layout.page_bit_offset();
        if page.len() < layout.page_header_len() {
            return Err(Error::corrupted(
                Section::Page { index },
                format!(
                    "page of {} bytes cannot hold a {}-byte page header",
                    page.len(),
                    layout.page_header_len()
                ),
            ));
        }
        let raw_type = page.u16_at(base)?;
        Ok(Self {
            index,
            page_type: Classified::classify(raw_type & !PAGE_FLAG_MASK),
            raw_type,
            block_count: page.u16_at(base + BLOCK_COUNT_OFFSET)?,
            subheader_count: page.u16_at(base + SUBHEADER_COUNT_OFFSET)?,
            pointers_offset: layout.page_header_len(),
        })
    }

    #[must_use]
    pub fn known_type(&self) -> Option<PageType> {
        self.page_type.known()
    }

    #[must_use]
    pub fn carries_subheaders(&self) -> bool {
        self.known_type().is_some_and(PageType::carries_subheaders)
    }

    /// Whether the flag bit is set in the stored type word.
    #[must_use]
    pub const fn is_flagged(&self) -> bool {
        self.raw_type & PAGE_FLAG_MASK != 0
    }

    /// First byte after the subheader pointer array.
    #[must_use]
    pub const fn pointers_end(&self, layout: Layout) -> usize {
        self.pointers_offset + self.subheader_count as usize * layout.pointer_len()
    }
}

/// Compound (page, slot) key of a subheader; ordered page-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SubHeaderLocation {
    pub page: u64,
    pub slot: u16,
}

impl SubHeaderLocation {
    #[must_use]
    pub const fn new(page: u64, slot: u16) -> Self {
        Self { page, slot }
    }

    /// The following slot on the same page.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            page: self.page,
            slot: self.slot.saturating_add(1),
        }
    }
}

impl fmt::Display for SubHeaderLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.slot)
    }
}

/// Storage format byte of a subheader pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubHeaderFormat {
    Plain,
    Truncated,
    Compressed,
}

impl WireCode for SubHeaderFormat {
    type Raw = u8;

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Plain),
            1 => Some(Self::Truncated),
            4 => Some(Self::Compressed),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::Truncated => 1,
            Self::Compressed => 4,
        }
    }
}

const POINTER_KIND_DATA: u8 = 1;

/// Placement of one subheader within its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubHeaderPointer {
    pub location: SubHeaderLocation,
    pub offset: usize,
    pub length: usize,
    pub format: Classified<SubHeaderFormat>,
    /// Kind byte marks the payload as row data.
    pub is_data: bool,
}

impl SubHeaderPointer {
    /// Parses the pointer in `slot` of `header`'s page.
    ///
    /// # Errors
    ///
    /// Fails when the pointer lies outside the page.
    pub fn parse(
        page: ByteView<'_>,
        header: &PageHeader,
        slot: u16,
        layout: Layout,
    ) -> Result<Self> {
        let location = SubHeaderLocation::new(header.index, slot);
        let int_len = layout.int_len();
        let start = header.pointers_offset + usize::from(slot) * layout.pointer_len();
        let pointer = page.slice(start, layout.pointer_len()).map_err(|_| {
            Error::corrupted(
                Section::Subheader { location },
                format!("pointer table entry at {start} exceeds page of {} bytes", page.len()),
            )
        })?;
        Ok(Self {
            location,
            offset: pointer.usize_at(0, int_len)?,
            length: pointer.usize_at(int_len, int_len)?,
            format: Classified::classify(pointer.u8_at(2 * int_len)?),
            is_data: pointer.u8_at(2 * int_len + 1)? == POINTER_KIND_DATA,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.format == Classified::Known(SubHeaderFormat::Plain)
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.format == Classified::Known(SubHeaderFormat::Truncated)
    }

    /// The payload bytes, or `None` when the pointer is empty or truncated
    /// past the end of the page.
    ///
    /// # Errors
    ///
    /// Fails when a non-empty, non-truncated payload leaves the page.
    pub fn payload<'a>(&self, page: ByteView<'a>) -> Result<Option<ByteView<'a>>> {
        if self.is_empty() {
            return Ok(None);
        }
        match page.slice(self.offset, self.length) {
            Ok(view) => Ok(Some(view)),
            Err(_) if self.is_truncated() => Ok(None),
            Err(_) => Err(Error::corrupted(
                Section::Subheader {
                    location: self.location,
                },
                format!(
                    "payload {}..{} exceeds page of {} bytes",
                    self.offset,
                    self.offset.saturating_add(self.length),
                    page.len()
                ),
            )),
        }
    }
}
