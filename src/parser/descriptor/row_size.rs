use crate::error::Result;
use crate::parser::byteview::ByteView;
use crate::parser::header::Layout;
use crate::parser::page::SubHeaderLocation;

use super::{Signature, StringRef, ensure_len};

const LABEL_REF_FROM_END: usize = 130;
const COMPRESSION_REF_FROM_END: usize = 118;

/// Row geometry and dataset-level references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSize {
    pub location: SubHeaderLocation,
    pub row_length: usize,
    pub row_count: u64,
    pub col_count_p1: u64,
    pub col_count_p2: u64,
    /// Rows that fit on a mixed page.
    pub mix_page_rows: u64,
    pub lcs: u16,
    pub lcp: u16,
    pub label: StringRef,
    pub compression: StringRef,
}

impl RowSize {
    const fn offsets(layout: Layout) -> (usize, usize) {
        if layout.is_u64 { (682, 706) } else { (354, 378) }
    }

    /// # Errors
    ///
    /// Fails when the payload is too short to hold every field.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        let int_len = layout.int_len();
        let (lcs_offset, lcp_offset) = Self::offsets(layout);
        ensure_len(payload, lcp_offset + 2, location, Signature::RowSize)?;
        let len = payload.len();
        Ok(Self {
            location,
            row_length: payload.usize_at(5 * int_len, int_len)?,
            row_count: payload.uint_at(6 * int_len, int_len)?,
            col_count_p1: payload.uint_at(9 * int_len, int_len)?,
            col_count_p2: payload.uint_at(10 * int_len, int_len)?,
            mix_page_rows: payload.uint_at(15 * int_len, int_len)?,
            lcs: payload.u16_at(lcs_offset)?,
            lcp: payload.u16_at(lcp_offset)?,
            label: StringRef::read(payload, len - LABEL_REF_FROM_END)?,
            compression: StringRef::read(payload, len - COMPRESSION_REF_FROM_END)?,
        })
    }

    /// Highest text block referenced by this descriptor, if any.
    #[must_use]
    pub fn max_text_block(&self) -> Option<u16> {
        [self.label, self.compression]
            .into_iter()
            .filter(|string| !string.is_empty())
            .map(|string| string.block)
            .max()
    }
}
