use crate::error::{Error, Result, Section};
use crate::parser::classify::Classified;
use crate::parser::document::Document;
use crate::parser::header::Layout;
use crate::parser::page::{PageHeader, PageType};
use crate::parser::window::{ByteSource, PageWindow};

use super::RowStrategy;

/// Rows of the current page, stored back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RowRegion {
    page: u64,
    start: usize,
    rows: usize,
    next: usize,
}

/// Uncompressed rows laid out on DATA and MIX pages.
#[derive(Debug, Default)]
pub struct PackedRows {
    next_page: u64,
    region: Option<RowRegion>,
}

impl PackedRows {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_page: 0,
            region: None,
        }
    }
}

/// Locates the row region of a DATA or MIX page.
fn row_region(
    header: &PageHeader,
    layout: Layout,
    row_length: usize,
    page_length: usize,
) -> Result<Option<RowRegion>> {
    let (start, rows) = match header.page_type {
        Classified::Known(PageType::Data) => {
            (layout.page_header_len(), usize::from(header.block_count))
        }
        Classified::Known(PageType::Mix) => {
            let rows = usize::from(header.block_count.saturating_sub(header.subheader_count));
            let start = header.pointers_end(layout);
            let aligned = start.next_multiple_of(8);
            // Padding is only present when the aligned region still fits.
            let start = if aligned + rows * row_length <= page_length {
                aligned
            } else {
                start
            };
            (start, rows)
        }
        _ => return Ok(None),
    };
    if start + rows * row_length > page_length {
        return Err(Error::corrupted(
            Section::Page {
                index: header.index,
            },
            format!(
                "{rows} rows of {row_length} bytes from offset {start} exceed page of {page_length} bytes"
            ),
        ));
    }
    Ok(Some(RowRegion {
        page: header.index,
        start,
        rows,
        next: 0,
    }))
}

impl RowStrategy for PackedRows {
    fn fill_next<S: ByteSource>(
        &mut self,
        window: &mut PageWindow<S>,
        document: &Document,
        row: &mut [u8],
    ) -> Result<bool> {
        let layout = document.header.layout;
        loop {
            if let Some(region) = self.region.as_mut()
                && region.next < region.rows
            {
                let offset = region.start + region.next * row.len();
                region.next += 1;
                window.load(region.page)?.copy_into(offset, row)?;
                return Ok(true);
            }
            if self.next_page >= window.page_count() {
                return Ok(false);
            }
            let index = self.next_page;
            self.next_page += 1;
            let page = window.load(index)?;
            let header = PageHeader::parse(page, index, layout)?;
            self.region = row_region(&header, layout, row.len(), page.len())?;
        }
    }
}
