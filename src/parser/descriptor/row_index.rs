use crate::error::{Error, Result, Section};
use crate::parser::byteview::ByteView;
use crate::parser::header::Layout;
use crate::parser::page::{PageHeader, SubHeaderLocation};

/// Row-index record from an INDEX page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowIndex {
    /// Page and record slot this entry was read from.
    pub source: SubHeaderLocation,
    pub row_number: u64,
    /// Location of the last physical row the entry covers.
    pub last_row: SubHeaderLocation,
}

impl RowIndex {
    /// Reads record `slot` of an INDEX page.
    ///
    /// Records are pointer-sized and start at the pointer array offset.
    ///
    /// # Errors
    ///
    /// Fails when the record lies outside the page.
    pub fn parse(page: ByteView<'_>, header: &PageHeader, slot: u16, layout: Layout) -> Result<Self> {
        let source = SubHeaderLocation::new(header.index, slot);
        let int_len = layout.int_len();
        let start = header.pointers_offset + usize::from(slot) * layout.pointer_len();
        let record = page.slice(start, layout.pointer_len()).map_err(|_| {
            Error::corrupted(
                Section::Page {
                    index: header.index,
                },
                format!("row index record {slot} exceeds page of {} bytes", page.len()),
            )
        })?;
        Ok(Self {
            source,
            row_number: record.uint_at(0, int_len)?,
            last_row: SubHeaderLocation::new(
                record.uint_at(int_len, int_len)?,
                record.u16_at(2 * int_len)?,
            ),
        })
    }
}
