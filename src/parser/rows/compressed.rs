use crate::error::{Error, Result, Section};
use crate::parser::classify::Classified;
use crate::parser::document::Document;
use crate::parser::page::{PageHeader, SubHeaderFormat, SubHeaderLocation, SubHeaderPointer};
use crate::parser::window::{ByteSource, PageWindow};

use super::RowStrategy;
use super::compression::{Codec, Decompressor};

/// What one subheader pointer holds, from the row stream's point of view.
enum Slot {
    /// Ends the row chain of the current page.
    EndOfPage,
    Skip,
    Row,
}

/// Rows stored as subheader payloads after the last schema descriptor.
#[derive(Debug)]
pub struct CompressedRows {
    codec: Codec,
    next: SubHeaderLocation,
}

impl CompressedRows {
    #[must_use]
    pub const fn new(codec: Codec, last_meta: SubHeaderLocation) -> Self {
        Self {
            codec,
            next: last_meta.next(),
        }
    }

    fn advance_page(&mut self) {
        self.next = SubHeaderLocation::new(self.next.page + 1, 0);
    }
}

/// Plain payloads are rows only when the pointer marks them as data; their
/// leading bytes may look like any descriptor signature.
fn classify_slot(pointer: &SubHeaderPointer) -> Result<Slot> {
    match pointer.format {
        Classified::Known(SubHeaderFormat::Truncated) => Ok(Slot::EndOfPage),
        _ if pointer.is_empty() => Ok(Slot::Skip),
        Classified::Known(SubHeaderFormat::Compressed) => Ok(Slot::Row),
        Classified::Known(SubHeaderFormat::Plain) if pointer.is_data => Ok(Slot::Row),
        Classified::Known(SubHeaderFormat::Plain) => Ok(Slot::Skip),
        Classified::Unknown(raw) => Err(Error::Unsupported {
            feature: format!(
                "subheader format {raw} at {} in compressed row stream",
                pointer.location
            )
            .into(),
        }),
    }
}

impl RowStrategy for CompressedRows {
    fn fill_next<S: ByteSource>(
        &mut self,
        window: &mut PageWindow<S>,
        document: &Document,
        row: &mut [u8],
    ) -> Result<bool> {
        let layout = document.header.layout;
        while self.next.page < window.page_count() {
            let location = self.next;
            let page = window.load(location.page)?;
            let header = PageHeader::parse(page, location.page, layout)?;
            if !header.carries_subheaders() || location.slot >= header.subheader_count {
                self.advance_page();
                continue;
            }
            self.next = location.next();
            let pointer = SubHeaderPointer::parse(page, &header, location.slot, layout)?;
            let payload = pointer.payload(page)?.map_or(&[][..], |view| view.as_bytes());
            match classify_slot(&pointer)? {
                Slot::EndOfPage => self.advance_page(),
                Slot::Skip => {}
                Slot::Row if payload.len() == row.len() => {
                    row.copy_from_slice(payload);
                    return Ok(true);
                }
                Slot::Row => {
                    self.codec.decompress(payload, row).map_err(|details| {
                        Error::corrupted(
                            Section::Decompression {
                                page_index: location.page,
                            },
                            format!("{details} in subheader {location}"),
                        )
                    })?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
