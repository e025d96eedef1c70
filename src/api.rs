use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use encoding_rs::Encoding;

use crate::error::{Error, Result};
use crate::logger::log_warn;
use crate::metadata::DatasetMetadata;
use crate::parser::encoding::resolve_label;
use crate::parser::{
    ByteSource, Classified, Document, FileHeader, PageWindow, RowCursor, RowWindow, Visitor, walk,
};

/// Configures decoding and pagination for a [`SasFile`].
#[derive(Debug, Clone)]
pub struct ReadOptions {
    encoding: Option<String>,
    skip_rows: Option<u64>,
    max_rows: Option<u64>,
    early_exit: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            encoding: None,
            skip_rows: None,
            max_rows: None,
            early_exit: true,
        }
    }

    /// Decodes strings with `label` instead of the character set the header
    /// declares.
    #[must_use]
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    #[must_use]
    pub const fn with_skip_rows(mut self, count: u64) -> Self {
        self.skip_rows = Some(count);
        self
    }

    #[must_use]
    pub const fn with_max_rows(mut self, count: u64) -> Self {
        self.max_rows = Some(count);
        self
    }

    /// Stops the schema walk once every descriptor has been seen.
    #[must_use]
    pub const fn with_early_exit(mut self, enabled: bool) -> Self {
        self.early_exit = enabled;
        self
    }

    fn row_window(&self) -> RowWindow {
        RowWindow {
            skip: self.skip_rows.unwrap_or(0),
            max: self.max_rows,
        }
    }

    fn resolve_encoding(&self, header: &FileHeader) -> Result<&'static Encoding> {
        if let Some(label) = self.encoding.as_deref() {
            return resolve_label(label).ok_or_else(|| Error::Encoding {
                encoding: label.to_owned().into(),
                details: "unknown encoding label".into(),
            });
        }
        match header.charset {
            Classified::Known(charset) if !charset.has_decoder() => log_warn(&format!(
                "No decoder for character set {}; decoding as UTF-8",
                charset.name()
            )),
            Classified::Unknown(code) => log_warn(&format!(
                "Unknown character set code {code}; decoding as UTF-8"
            )),
            Classified::Known(_) => {}
        }
        Ok(header.encoding())
    }
}

/// One open SAS7BDAT file: its parsed header and assembled schema.
pub struct SasFile<S> {
    window: PageWindow<S>,
    document: Document,
    metadata: DatasetMetadata,
    options: ReadOptions,
}

impl SasFile<BufReader<File>> {
    /// Opens a SAS7BDAT file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or if the schema
    /// cannot be assembled.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ReadOptions::new())
    }

    /// Like [`SasFile::open`], with explicit options.
    ///
    /// # Errors
    ///
    /// See [`SasFile::open`].
    pub fn open_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }
}

impl<S: ByteSource> SasFile<S> {
    /// Builds a reader from any random-access byte source.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid, the encoding override is
    /// unknown, or the schema cannot be assembled.
    pub fn from_reader(mut source: S, options: ReadOptions) -> Result<Self> {
        let header = FileHeader::parse(&mut source)?;
        let encoding = options.resolve_encoding(&header)?;
        let mut window = PageWindow::new(source, &header)?;
        let document = Document::assemble(&mut window, header, encoding, options.early_exit)?;
        let metadata = document.metadata()?;
        Ok(Self {
            window,
            document,
            metadata,
            options,
        })
    }

    #[must_use]
    pub const fn header(&self) -> &FileHeader {
        &self.document.header
    }

    #[must_use]
    pub const fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Opens a row cursor at the start of the data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] for an unrecognised compression id and
    /// a format error when a column does not fit the row.
    pub fn rows(&mut self) -> Result<RowCursor<'_, S>> {
        RowCursor::new(
            &mut self.window,
            &self.document,
            self.options.row_window(),
        )
    }

    /// Walks every page of the file with `visitor`.
    ///
    /// # Errors
    ///
    /// Returns the first structural or visitor error.
    pub fn visit<V: Visitor + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        walk(&mut self.window, &self.document.header, visitor)
    }

    /// Releases the reader and hands back the byte source.
    pub fn into_inner(self) -> S {
        self.window.into_inner()
    }
}
