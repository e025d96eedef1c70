use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result, Section};

use super::byteview::ByteView;
use super::header::FileHeader;

/// Read-only random-access byte source the reader decodes from.
pub trait ByteSource {
    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails when the range cannot be read in full.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Total size of the source in bytes.
    ///
    /// # Errors
    ///
    /// Fails when the size cannot be determined.
    fn size(&mut self) -> io::Result<u64>;
}

impl<R: Read + Seek> ByteSource for R {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }

    fn size(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }
}

/// Seekable cursor holding one page of the file in a reusable buffer.
pub struct PageWindow<S> {
    source: S,
    data_offset: u64,
    buffer: Vec<u8>,
    page_count: u64,
    order: crate::metadata::Endianness,
    current: Option<u64>,
}

impl<S: ByteSource> PageWindow<S> {
    /// Creates a window sized for the pages described by `header`.
    ///
    /// # Errors
    ///
    /// Returns an error when the page length does not fit in memory on this
    /// platform.
    pub fn new(source: S, header: &FileHeader) -> Result<Self> {
        let page_length = usize::try_from(header.page_length).map_err(|_| Error::Unsupported {
            feature: "page length exceeds platform pointer width".into(),
        })?;
        Ok(Self {
            source,
            data_offset: u64::from(header.header_length),
            buffer: vec![0u8; page_length],
            page_count: header.page_count,
            order: header.endianness,
            current: None,
        })
    }

    /// Loads page `index` into the buffer unless it is already loaded.
    ///
    /// # Errors
    ///
    /// Fails when `index` is past the declared page count or the page cannot
    /// be read in full.
    pub fn load(&mut self, index: u64) -> Result<ByteView<'_>> {
        if self.current != Some(index) {
            if index >= self.page_count {
                return Err(Error::corrupted(
                    Section::Page { index },
                    format!("page index beyond declared page count {}", self.page_count),
                ));
            }
            self.current = None;
            let offset = self.data_offset + index * self.buffer.len() as u64;
            self.source
                .read_at(offset, &mut self.buffer)
                .map_err(|err| match err.kind() {
                    io::ErrorKind::UnexpectedEof => {
                        Error::corrupted(Section::Page { index }, "page truncated by end of file")
                    }
                    _ => Error::Io(err),
                })?;
            self.current = Some(index);
        }
        Ok(self.page())
    }

    /// View over the currently loaded page.
    #[must_use]
    pub fn page(&self) -> ByteView<'_> {
        ByteView::new(&self.buffer, self.order)
    }

    #[must_use]
    pub const fn current(&self) -> Option<u64> {
        self.current
    }

    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Releases the window and hands back the byte source.
    pub fn into_inner(self) -> S {
        self.source
    }
}
