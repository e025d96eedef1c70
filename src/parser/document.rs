//! Single-pass assembly of the dataset schema from its descriptors.

use encoding_rs::Encoding;
use smallvec::SmallVec;

use crate::error::{Error, Result, Section};
use crate::logger::log_warn;
use crate::metadata::{
    Column, ColumnType, Compression, DatasetMetadata, DatasetTimestamps, Format, Vendor,
};

use super::classify::Classified;
use super::descriptor::{
    ColLabs, ColSize, ColText, ColumnAttr, Descriptor, RowIndex, RowSize, Signature, StorageType,
    StringRef, SubhCnt, raw_bytes, resolve as resolve_string,
};
use super::header::{FileHeader, Layout, parse_release};
use super::page::{PageHeader, SubHeaderLocation};
use super::rows::compression::Codec;
use super::walk::{Subheader, VisitResult, Visitor, walk};
use super::window::{ByteSource, PageWindow};

/// Compression ids up to this length that match no codec mean "none".
const MAX_IMPLICIT_NONE_LEN: u16 = 8;

/// The assembled, validated schema of one file.
#[derive(Debug, Clone)]
pub struct Document {
    pub header: FileHeader,
    /// Decoder for every string in the file.
    pub encoding: &'static Encoding,
    pub row_size: RowSize,
    pub col_size: ColSize,
    pub subh_cnt: SubhCnt,
    pub col_text: SmallVec<[ColText; 4]>,
    pub col_names: Vec<StringRef>,
    pub col_attrs: Vec<ColumnAttr>,
    pub col_labs: Vec<ColLabs>,
    pub col_list: Vec<i16>,
    pub row_index: Vec<RowIndex>,
    /// `None` for uncompressed rows.
    pub codec: Option<Classified<Codec>>,
    /// Last subheader that carried a schema descriptor.
    pub last_meta: SubHeaderLocation,
}

impl Document {
    /// Walks the file once and assembles its schema.
    ///
    /// With `early_exit`, the walk stops as soon as every required descriptor
    /// and every referenced text block has been seen.
    ///
    /// # Errors
    ///
    /// Fails on structural errors during the walk and on any descriptor
    /// cardinality violation.
    pub fn assemble<S: ByteSource>(
        window: &mut PageWindow<S>,
        header: FileHeader,
        encoding: &'static Encoding,
        early_exit: bool,
    ) -> Result<Self> {
        let mut assembler = Assembler::new(header.layout.is_u64, early_exit);
        walk(window, &header, &mut assembler)?;
        assembler.finish(header, encoding)
    }

    /// Resolves a string reference against the text blocks.
    ///
    /// # Errors
    ///
    /// Fails when the reference points outside the text blocks.
    pub fn resolve(&self, string: StringRef) -> Result<Option<String>> {
        Ok(resolve_string(&self.col_text, string, self.header.layout, self.encoding)?
            .map(|text| text.into_owned()))
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        match &self.codec {
            None => Compression::None,
            Some(Classified::Known(Codec::Rle)) => Compression::Rle,
            Some(Classified::Known(Codec::Rdc)) => Compression::Rdc,
            Some(Classified::Unknown(raw)) => Compression::Unknown(raw.clone()),
        }
    }

    /// The codec rows must be expanded with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] for an unrecognised compression id.
    pub fn row_codec(&self) -> Result<Option<Codec>> {
        match &self.codec {
            None => Ok(None),
            Some(Classified::Known(codec)) => Ok(Some(*codec)),
            Some(Classified::Unknown(raw)) => Err(Error::Unsupported {
                feature: format!("row compression {raw:?}").into(),
            }),
        }
    }

    /// Builds the public column list.
    ///
    /// # Errors
    ///
    /// Fails when a column has an unknown storage type or a reference that
    /// cannot be resolved.
    pub fn columns(&self) -> Result<Vec<Column>> {
        self.col_attrs
            .iter()
            .zip(&self.col_names)
            .zip(&self.col_labs)
            .enumerate()
            .map(|(idx, ((attr, name), labs))| self.column(idx, attr, *name, labs))
            .collect()
    }

    fn column(&self, idx: usize, attr: &ColumnAttr, name: StringRef, labs: &ColLabs) -> Result<Column> {
        let index = u32::try_from(idx).map_err(|_| Error::InvalidMetadata {
            details: "column index exceeds supported range".into(),
        })?;
        let format = self.resolve(labs.format)?.map(|name| Format {
            name,
            width: labs.width,
            precision: labs.precision,
        });
        let kind = match attr.storage {
            Classified::Known(StorageType::Character) => ColumnType::Character,
            Classified::Known(StorageType::Numeric) => format
                .as_ref()
                .map_or(ColumnType::Numeric, Format::numeric_type),
            Classified::Unknown(code) => {
                return Err(Error::corrupted(
                    Section::Column { index },
                    format!("unknown column type code 0x{code:02X}"),
                ));
            }
        };
        Ok(Column {
            index,
            name: self.resolve(name)?.unwrap_or_default(),
            kind,
            offset: attr.offset,
            length: attr.length,
            format,
            label: self.resolve(labs.label)?,
        })
    }

    /// Schema in its public shape.
    ///
    /// # Errors
    ///
    /// See [`Document::columns`].
    pub fn metadata(&self) -> Result<DatasetMetadata> {
        let header = &self.header;
        let release = header.release.as_deref().and_then(|release| {
            let parsed = parse_release(release);
            if parsed.is_none() {
                log_warn(&format!("Unrecognised SAS release string {release:?}"));
            }
            parsed
        });
        Ok(DatasetMetadata {
            name: header.dataset_name.clone(),
            label: self.resolve(self.row_size.label)?,
            file_type: header.file_type.clone(),
            row_count: self.row_size.row_count,
            timestamps: DatasetTimestamps {
                created: header.created_at(),
                modified: header.modified_at(),
            },
            release: header.release.clone(),
            version: release.map(|(version, _)| version),
            vendor: release.map_or(Vendor::Sas, |(_, vendor)| vendor),
            host: header.host.clone(),
            os_name: header.os_name.clone(),
            encoding: self.encoding.name(),
            endianness: header.endianness,
            compression: self.compression(),
            columns: self.columns()?,
            column_list: self.col_list.clone(),
        })
    }
}

struct Assembler {
    layout: Layout,
    early_exit: bool,
    row_size: SmallVec<[RowSize; 1]>,
    col_size: SmallVec<[ColSize; 1]>,
    subh_cnt: SmallVec<[SubhCnt; 1]>,
    col_text: SmallVec<[ColText; 4]>,
    col_names: Vec<StringRef>,
    col_attrs: Vec<ColumnAttr>,
    col_labs: Vec<ColLabs>,
    col_list: Vec<i16>,
    row_index: Vec<RowIndex>,
    last_meta: Option<SubHeaderLocation>,
    max_text_block: Option<u16>,
}

impl Assembler {
    fn new(is_u64: bool, early_exit: bool) -> Self {
        Self {
            layout: Layout { is_u64 },
            early_exit,
            row_size: SmallVec::new(),
            col_size: SmallVec::new(),
            subh_cnt: SmallVec::new(),
            col_text: SmallVec::new(),
            col_names: Vec::new(),
            col_attrs: Vec::new(),
            col_labs: Vec::new(),
            col_list: Vec::new(),
            row_index: Vec::new(),
            last_meta: None,
            max_text_block: None,
        }
    }

    fn note_block(&mut self, string: StringRef) {
        if !string.is_empty() {
            self.max_text_block = self.max_text_block.max(Some(string.block));
        }
    }

    fn add(&mut self, descriptor: Descriptor) {
        match descriptor {
            Descriptor::RowSize(row_size) => {
                self.max_text_block = self.max_text_block.max(row_size.max_text_block());
                self.row_size.push(row_size);
            }
            Descriptor::ColSize(col_size) => self.col_size.push(col_size),
            Descriptor::SubhCnt(subh_cnt) => self.subh_cnt.push(subh_cnt),
            Descriptor::ColText(text) => self.col_text.push(text),
            Descriptor::ColAttr(attrs) => self.col_attrs.extend(attrs.attrs),
            Descriptor::ColName(names) => {
                for name in &names.names {
                    self.note_block(*name);
                }
                self.col_names.extend(names.names);
            }
            Descriptor::ColLabs(labs) => {
                self.note_block(labs.format);
                self.note_block(labs.label);
                self.col_labs.push(labs);
            }
            Descriptor::ColList(list) => self.col_list.extend(list.values),
        }
    }

    /// Text blocks needed before every collected reference resolves.
    fn text_blocks_needed(&self) -> usize {
        self.max_text_block.map_or(1, |block| usize::from(block) + 1)
    }

    fn is_complete(&self) -> bool {
        let [col_size] = self.col_size.as_slice() else {
            return false;
        };
        self.row_size.len() == 1
            && self.subh_cnt.len() == 1
            && self.col_names.len() == col_size.count
            && self.col_attrs.len() == col_size.count
            && self.col_labs.len() == col_size.count
            && self.col_text.len() >= self.text_blocks_needed()
    }

    fn finish(self, header: FileHeader, encoding: &'static Encoding) -> Result<Document> {
        let row_size = exactly_one(&self.row_size, Signature::RowSize)?;
        let col_size = exactly_one(&self.col_size, Signature::ColSize)?;
        let subh_cnt = exactly_one(&self.subh_cnt, Signature::SubhCnt)?;
        if self.col_text.is_empty() {
            return Err(Error::Cardinality {
                descriptor: Signature::ColText.as_str(),
                expected: 1,
                actual: 0,
            });
        }
        for (signature, actual) in [
            (Signature::ColName, self.col_names.len()),
            (Signature::ColAttr, self.col_attrs.len()),
            (Signature::ColLabs, self.col_labs.len()),
        ] {
            if actual != col_size.count {
                return Err(Error::Cardinality {
                    descriptor: signature.as_str(),
                    expected: col_size.count,
                    actual,
                });
            }
        }

        let codec = classify_compression(&self.col_text, row_size.compression, self.layout)?;
        let last_meta = self.last_meta.unwrap_or(row_size.location);
        Ok(Document {
            header,
            encoding,
            row_size,
            col_size,
            subh_cnt,
            col_text: self.col_text,
            col_names: self.col_names,
            col_attrs: self.col_attrs,
            col_labs: self.col_labs,
            col_list: self.col_list,
            row_index: self.row_index,
            codec,
            last_meta,
        })
    }
}

fn exactly_one<T: Copy>(found: &[T], signature: Signature) -> Result<T> {
    match found {
        [one] => Ok(*one),
        _ => Err(Error::Cardinality {
            descriptor: signature.as_str(),
            expected: 1,
            actual: found.len(),
        }),
    }
}

fn classify_compression(
    blocks: &[ColText],
    string: StringRef,
    layout: Layout,
) -> Result<Option<Classified<Codec>>> {
    let Some(bytes) = raw_bytes(blocks, string, layout)? else {
        return Ok(None);
    };
    let id = String::from_utf8_lossy(bytes).trim().to_owned();
    match Classified::<Codec>::classify(id) {
        Classified::Unknown(_) if string.length <= MAX_IMPLICIT_NONE_LEN => Ok(None),
        Classified::Unknown(id) => {
            log_warn(&format!("Unrecognised row compression id {id:?}"));
            Ok(Some(Classified::Unknown(id)))
        }
        known => Ok(Some(known)),
    }
}

impl Visitor for Assembler {
    fn visit_page(&mut self, page: &PageHeader) -> Result<VisitResult> {
        if let Classified::Unknown(raw) = page.page_type {
            log_warn(&format!(
                "Skipping page {} with unknown page type 0x{raw:04X}",
                page.index
            ));
            return Ok(VisitResult::SkipSubtree);
        }
        Ok(VisitResult::Continue)
    }

    fn visit_subheader(&mut self, _page: &PageHeader, subheader: &Subheader<'_>) -> Result<VisitResult> {
        // Row payloads can start with bytes that match a signature.
        if subheader.pointer.is_data {
            return Ok(VisitResult::Continue);
        }
        let (Some(Classified::Known(signature)), Some(payload)) = (subheader.signature, subheader.payload)
        else {
            return Ok(VisitResult::Continue);
        };
        let location = subheader.pointer.location;
        self.add(Descriptor::parse(signature, payload, self.layout, location)?);
        self.last_meta = Some(location);
        if self.early_exit && self.is_complete() {
            return Ok(VisitResult::Terminate);
        }
        Ok(VisitResult::Continue)
    }

    fn visit_row_index(&mut self, _page: &PageHeader, entry: &RowIndex) -> Result<VisitResult> {
        self.row_index.push(*entry);
        Ok(VisitResult::Continue)
    }
}
