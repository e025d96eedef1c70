//! Synthetic SAS7BDAT writer shared by the integration tests.
#![allow(dead_code)]

use std::io::Cursor;

use sas7bdat_reader::value::Value;
use sas7bdat_reader::{ReadOptions, SasFile};
use serde_json::{Value as JsonValue, json};

pub const HEADER_LENGTH: usize = 1024;
pub const PAGE_LENGTH: usize = 4096;

const MAGIC: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];

const SIG_ROW_SIZE: u32 = 0xF7F7_F7F7;
const SIG_COL_SIZE: u32 = 0xF6F6_F6F6;
const SIG_SUBH_CNT: u32 = 0xFFFF_FC00;
const SIG_COL_TEXT: u32 = 0xFFFF_FFFD;
const SIG_COL_ATTR: u32 = 0xFFFF_FFFC;
const SIG_COL_NAME: u32 = 0xFFFF_FFFF;
const SIG_COL_LABS: u32 = 0xFFFF_FBFE;

const PAGE_META: u16 = 0x0000;
const PAGE_DATA: u16 = 0x0100;
const PAGE_MIX: u16 = 0x0200;
const PAGE_INDEX: u16 = 0x9000;

const FORMAT_PLAIN: u8 = 0;
const FORMAT_TRUNCATED: u8 = 1;
const FORMAT_COMPRESSED: u8 = 4;

/// Where and how rows are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Descriptors on a META page, rows on DATA pages.
    Data,
    /// Descriptors and the first rows share a MIX page.
    Mix,
    /// RLE-compressed row subheaders.
    Rle,
    /// RDC-compressed row subheaders.
    Rdc,
}

/// Deliberate schema defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    DuplicateRowSize,
    MissingColLabs,
}

#[derive(Debug, Clone)]
pub enum Cell {
    Text(&'static str),
    Num(f64),
    /// Special missing `.A`-`.Z` or `._`.
    Tagged(char),
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub numeric: bool,
    pub length: usize,
    pub format: Option<&'static str>,
    pub label: Option<&'static str>,
}

pub fn text_column(name: &'static str, length: usize) -> ColumnSpec {
    ColumnSpec {
        name,
        numeric: false,
        length,
        format: None,
        label: None,
    }
}

pub fn numeric_column(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        numeric: true,
        length: 8,
        format: None,
        label: None,
    }
}

/// Builder for a complete in-memory SAS7BDAT file.
#[derive(Debug, Clone)]
pub struct SasBuilder {
    is_u64: bool,
    big_endian: bool,
    page_length: usize,
    storage: Storage,
    fault: Fault,
    columns: Vec<ColumnSpec>,
    rows: Vec<Vec<Cell>>,
    dataset_label: Option<&'static str>,
    compression_id: Option<&'static str>,
    encoding_code: u8,
    index_page: bool,
}

struct Endian {
    big: bool,
}

impl Endian {
    fn u16(&self, buf: &mut [u8], at: usize, value: u16) {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        buf[at..at + 2].copy_from_slice(&bytes);
    }

    fn u32(&self, buf: &mut [u8], at: usize, value: u32) {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        buf[at..at + 4].copy_from_slice(&bytes);
    }

    fn u64(&self, buf: &mut [u8], at: usize, value: u64) {
        let bytes = if self.big {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        buf[at..at + 8].copy_from_slice(&bytes);
    }

    fn uint(&self, buf: &mut [u8], at: usize, width: usize, value: u64) {
        if width == 8 {
            self.u64(buf, at, value);
        } else {
            self.u32(buf, at, u32::try_from(value).expect("value fits 32 bits"));
        }
    }

    fn f64(&self, buf: &mut [u8], at: usize, value: f64) {
        self.u64(buf, at, value.to_bits());
    }

    /// Keeps the high-order `len` bytes of a double's bit pattern.
    fn truncated_double(&self, bits: u64, len: usize) -> Vec<u8> {
        if self.big {
            bits.to_be_bytes()[..len].to_vec()
        } else {
            bits.to_le_bytes()[8 - len..].to_vec()
        }
    }
}

struct Payload {
    bytes: Vec<u8>,
    format: u8,
    is_data: bool,
}

impl Payload {
    fn plain(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format: FORMAT_PLAIN,
            is_data: false,
        }
    }
}

impl SasBuilder {
    pub fn new() -> Self {
        Self {
            is_u64: false,
            big_endian: false,
            page_length: PAGE_LENGTH,
            storage: Storage::Data,
            fault: Fault::None,
            columns: Vec::new(),
            rows: Vec::new(),
            dataset_label: None,
            compression_id: None,
            encoding_code: 20,
            index_page: false,
        }
    }

    /// The two-column, three-row dataset used by most tests.
    pub fn sample() -> Self {
        Self::new()
            .column(text_column("name", 8))
            .column(numeric_column("score"))
            .row(vec![Cell::Text("abc"), Cell::Num(1.5)])
            .row(vec![Cell::Text("def"), Cell::Num(2.5)])
            .row(vec![Cell::Text("ghi"), Cell::Num(f64::NAN)])
    }

    pub const fn bit64(mut self, is_u64: bool) -> Self {
        self.is_u64 = is_u64;
        self
    }

    pub const fn big_endian(mut self, big: bool) -> Self {
        self.big_endian = big;
        self
    }

    pub const fn page_length(mut self, page_length: usize) -> Self {
        self.page_length = page_length;
        self
    }

    pub const fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub const fn fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Cell>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub const fn label(mut self, label: &'static str) -> Self {
        self.dataset_label = Some(label);
        self
    }

    /// Overrides the compression id text written to the row size descriptor.
    pub const fn compression_id(mut self, id: &'static str) -> Self {
        self.compression_id = Some(id);
        self
    }

    pub const fn encoding_code(mut self, code: u8) -> Self {
        self.encoding_code = code;
        self
    }

    /// Appends an INDEX page with one row-index record.
    pub const fn index_page(mut self, enabled: bool) -> Self {
        self.index_page = enabled;
        self
    }

    const fn int_len(&self) -> usize {
        if self.is_u64 { 8 } else { 4 }
    }

    const fn page_bit_offset(&self) -> usize {
        if self.is_u64 { 32 } else { 16 }
    }

    const fn pointer_len(&self) -> usize {
        if self.is_u64 { 24 } else { 12 }
    }

    const fn endian(&self) -> Endian {
        Endian {
            big: self.big_endian,
        }
    }

    pub fn row_length(&self) -> usize {
        self.columns.iter().map(|column| column.length).sum()
    }

    fn signature(&self, buf: &mut [u8], word: u32) {
        let endian = self.endian();
        if self.is_u64 {
            let high = if word == SIG_ROW_SIZE || word == SIG_COL_SIZE {
                0
            } else {
                u64::from(u32::MAX) << 32
            };
            endian.u64(buf, 0, high | u64::from(word));
        } else {
            endian.u32(buf, 0, word);
        }
    }

    fn encode_row(&self, cells: &[Cell]) -> Vec<u8> {
        let endian = self.endian();
        let mut row = Vec::with_capacity(self.row_length());
        for (column, cell) in self.columns.iter().zip(cells) {
            match cell {
                Cell::Text(text) => {
                    let mut bytes = text.as_bytes().to_vec();
                    bytes.resize(column.length, b' ');
                    row.extend_from_slice(&bytes);
                }
                Cell::Num(number) => {
                    row.extend(endian.truncated_double(number.to_bits(), column.length));
                }
                Cell::Tagged(tag) => {
                    let tag_byte = if *tag == '_' { 0 } else { *tag as u8 - b'A' + 2 };
                    let bits = 0xFFFF_0000_0000_0000 | (u64::from(!tag_byte) << 40);
                    row.extend(endian.truncated_double(bits, column.length));
                }
            }
        }
        row
    }

    /// Header bytes, padded to the header length.
    fn file_header(&self, page_count: usize) -> Vec<u8> {
        let endian = self.endian();
        let mut buf = vec![0u8; HEADER_LENGTH];
        buf[..32].copy_from_slice(&MAGIC);
        let pad = if self.is_u64 { 4 } else { 0 };
        buf[32] = if self.is_u64 { 0x33 } else { 0x22 };
        buf[35] = if self.is_u64 { 0x33 } else { 0x22 };
        buf[37] = u8::from(!self.big_endian);
        buf[39] = b'1';
        buf[70] = self.encoding_code;
        put_text(&mut buf, 92, 64, "SAMPLE");
        put_text(&mut buf, 156, 8, "DATA");
        endian.f64(&mut buf, 164 + pad, 86_400.0);
        endian.f64(&mut buf, 172 + pad, 172_800.0);
        endian.u32(&mut buf, 196 + pad, HEADER_LENGTH as u32);
        endian.u32(&mut buf, 200 + pad, self.page_length as u32);
        endian.uint(&mut buf, 204 + pad, self.int_len(), page_count as u64);
        let shift = pad + if self.is_u64 { 4 } else { 0 };
        put_text(&mut buf, 216 + shift, 8, "9.0401M6");
        put_text(&mut buf, 224 + shift, 16, "X64_10PRO");
        put_text(&mut buf, 240 + shift, 16, "10.0");
        put_text(&mut buf, 272 + shift, 16, "Linux");
        buf
    }

    /// Column-text block plus the references into it.
    fn text_block(&self) -> (Vec<u8>, TextRefs) {
        let int_len = self.int_len();
        let mut area = vec![0u8; 4];
        let mut push = |text: &str| -> [u16; 3] {
            let offset = area.len();
            area.extend_from_slice(text.as_bytes());
            while area.len() % 4 != 0 {
                area.push(b' ');
            }
            [0, offset as u16, text.len() as u16]
        };
        let compression = match (self.compression_id, self.storage) {
            (Some(id), _) => push(id),
            (None, Storage::Rle) => push("SASYZCRL"),
            (None, Storage::Rdc) => push("SASYZCR2"),
            (None, Storage::Data | Storage::Mix) => [0; 3],
        };
        let label = self.dataset_label.map_or([0; 3], &mut push);
        let names = self.columns.iter().map(|c| push(c.name)).collect();
        let formats = self
            .columns
            .iter()
            .map(|c| c.format.map_or([0; 3], &mut push))
            .collect();
        let labels = self
            .columns
            .iter()
            .map(|c| c.label.map_or([0; 3], &mut push))
            .collect();

        let mut payload = vec![0u8; int_len];
        payload.extend_from_slice(&area);
        self.signature(&mut payload, SIG_COL_TEXT);
        let remainder = payload.len() - (4 + 2 * int_len);
        self.endian().u16(&mut payload, int_len, remainder as u16);
        (
            payload,
            TextRefs {
                compression,
                label,
                names,
                formats,
                labels,
            },
        )
    }

    fn put_ref(&self, buf: &mut [u8], at: usize, string: [u16; 3]) {
        let endian = self.endian();
        endian.u16(buf, at, string[0]);
        endian.u16(buf, at + 2, string[1]);
        endian.u16(buf, at + 4, string[2]);
    }

    fn descriptors(&self) -> Vec<Payload> {
        let int_len = self.int_len();
        let endian = self.endian();
        let (text, refs) = self.text_block();
        let count = self.columns.len();

        let row_size_len = if self.is_u64 { 808 } else { 480 };
        let mut row_size = vec![0u8; row_size_len];
        self.signature(&mut row_size, SIG_ROW_SIZE);
        endian.uint(&mut row_size, 5 * int_len, int_len, self.row_length() as u64);
        endian.uint(&mut row_size, 6 * int_len, int_len, self.rows.len() as u64);
        endian.uint(&mut row_size, 9 * int_len, int_len, count as u64);
        endian.uint(&mut row_size, 15 * int_len, int_len, self.rows.len() as u64);
        let lcp = if self.is_u64 { 706 } else { 378 };
        endian.u16(&mut row_size, lcp, 0);
        self.put_ref(&mut row_size, row_size_len - 130, refs.label);
        self.put_ref(&mut row_size, row_size_len - 118, refs.compression);

        let mut col_size = vec![0u8; 6 * int_len];
        self.signature(&mut col_size, SIG_COL_SIZE);
        endian.uint(&mut col_size, int_len, int_len, count as u64);

        let mut subh_cnt = vec![0u8; 10 * int_len];
        self.signature(&mut subh_cnt, SIG_SUBH_CNT);

        let names_len = 2 * int_len + 12 + 8 * count;
        let mut names = vec![0u8; names_len];
        self.signature(&mut names, SIG_COL_NAME);
        endian.u16(&mut names, int_len, (names_len - (4 + 2 * int_len)) as u16);
        for (idx, name) in refs.names.iter().enumerate() {
            self.put_ref(&mut names, int_len + 8 + idx * 8, *name);
        }

        let attr_len = int_len + 8;
        let attrs_len = 2 * int_len + 12 + attr_len * count;
        let mut attrs = vec![0u8; attrs_len];
        self.signature(&mut attrs, SIG_COL_ATTR);
        endian.u16(&mut attrs, int_len, (attrs_len - (4 + 2 * int_len)) as u16);
        let mut offset = 0usize;
        for (idx, column) in self.columns.iter().enumerate() {
            let entry = int_len + 8 + idx * attr_len;
            endian.uint(&mut attrs, entry, int_len, offset as u64);
            endian.u32(&mut attrs, entry + int_len, column.length as u32);
            attrs[entry + int_len + 6] = if column.numeric { 1 } else { 2 };
            offset += column.length;
        }

        let mut payloads = vec![
            Payload::plain(row_size.clone()),
            Payload::plain(col_size),
            Payload::plain(subh_cnt),
            Payload::plain(text),
            Payload::plain(names),
            Payload::plain(attrs),
        ];
        if self.fault != Fault::MissingColLabs {
            for idx in 0..count {
                let labs_len = 3 * int_len + 40;
                let mut labs = vec![0u8; labs_len];
                self.signature(&mut labs, SIG_COL_LABS);
                self.put_ref(&mut labs, 3 * int_len + 22, refs.formats[idx]);
                self.put_ref(&mut labs, 3 * int_len + 28, refs.labels[idx]);
                payloads.push(Payload::plain(labs));
            }
        }
        if self.fault == Fault::DuplicateRowSize {
            payloads.push(Payload::plain(row_size));
        }
        payloads
    }

    fn row_payload(&self, row: Vec<u8>) -> Payload {
        let encoded = match self.storage {
            Storage::Rle => rle_encode(&row),
            Storage::Rdc => rdc_encode(&row),
            Storage::Data | Storage::Mix => unreachable!("packed rows are not subheaders"),
        };
        if encoded.len() >= row.len() {
            Payload {
                bytes: row,
                format: FORMAT_PLAIN,
                is_data: true,
            }
        } else {
            Payload {
                bytes: encoded,
                format: FORMAT_COMPRESSED,
                is_data: true,
            }
        }
    }

    /// Serialises the whole file.
    pub fn build(&self) -> Vec<u8> {
        let rows: Vec<Vec<u8>> = self.rows.iter().map(|cells| self.encode_row(cells)).collect();
        let row_length = self.row_length();
        let mut pages: Vec<Vec<u8>> = Vec::new();

        match self.storage {
            Storage::Data => {
                pages.push(self.subheader_page(PAGE_META, &self.descriptors(), false).0);
                self.data_pages(&mut pages, &rows);
            }
            Storage::Mix => {
                let descriptors = self.descriptors();
                let (mut page, used) = self.subheader_page(PAGE_MIX, &descriptors, false);
                let start = self.page_bit_offset() + 8 + descriptors.len() * self.pointer_len();
                let start = start.next_multiple_of(8);
                let lowest = used;
                let fit = (lowest - start) / row_length;
                let on_mix = fit.min(rows.len());
                for (idx, row) in rows[..on_mix].iter().enumerate() {
                    let at = start + idx * row_length;
                    page[at..at + row_length].copy_from_slice(row);
                }
                let block_count = (descriptors.len() + on_mix) as u16;
                self.endian()
                    .u16(&mut page, self.page_bit_offset() + 2, block_count);
                pages.push(page);
                self.data_pages(&mut pages, &rows[on_mix..]);
            }
            Storage::Rle | Storage::Rdc => {
                let mut payloads = self.descriptors();
                payloads.extend(rows.into_iter().map(|row| self.row_payload(row)));
                let mut remaining = &payloads[..];
                while !remaining.is_empty() {
                    let taken = self.fitting(remaining);
                    let more = taken < remaining.len();
                    pages.push(self.subheader_page(PAGE_META, &remaining[..taken], more).0);
                    remaining = &remaining[taken..];
                }
            }
        }

        if self.index_page {
            let mut page = vec![0u8; self.page_length];
            let endian = self.endian();
            let bit = self.page_bit_offset();
            endian.u16(&mut page, bit, PAGE_INDEX);
            endian.u16(&mut page, bit + 4, 1);
            let record = bit + 8;
            let int_len = self.int_len();
            endian.uint(&mut page, record, int_len, self.rows.len() as u64);
            endian.uint(&mut page, record + int_len, int_len, (pages.len() - 1) as u64);
            endian.u16(&mut page, record + 2 * int_len, 3);
            pages.push(page);
        }

        let mut file = self.file_header(pages.len());
        for page in pages {
            file.extend_from_slice(&page);
        }
        file
    }

    /// Number of leading payloads that fit one page, leaving room for a
    /// trailing truncated pointer.
    fn fitting(&self, payloads: &[Payload]) -> usize {
        let header = self.page_bit_offset() + 8;
        let mut low = self.page_length;
        for (idx, payload) in payloads.iter().enumerate() {
            let pointers_end = header + (idx + 2) * self.pointer_len();
            if low < payload.bytes.len() || low - payload.bytes.len() < pointers_end {
                assert!(idx > 0, "payload larger than a page");
                return idx;
            }
            low -= payload.bytes.len();
        }
        payloads.len()
    }

    /// A page holding `payloads` as subheaders, written from the page end
    /// downwards. Returns the page and the lowest payload offset.
    fn subheader_page(&self, page_type: u16, payloads: &[Payload], truncated_tail: bool) -> (Vec<u8>, usize) {
        let endian = self.endian();
        let int_len = self.int_len();
        let bit = self.page_bit_offset();
        let mut page = vec![0u8; self.page_length];
        let pointer_count = payloads.len() + usize::from(truncated_tail);
        endian.u16(&mut page, bit, page_type);
        endian.u16(&mut page, bit + 2, pointer_count as u16);
        endian.u16(&mut page, bit + 4, pointer_count as u16);

        let mut low = self.page_length;
        for (slot, payload) in payloads.iter().enumerate() {
            low -= payload.bytes.len();
            page[low..low + payload.bytes.len()].copy_from_slice(&payload.bytes);
            let pointer = bit + 8 + slot * self.pointer_len();
            endian.uint(&mut page, pointer, int_len, low as u64);
            endian.uint(&mut page, pointer + int_len, int_len, payload.bytes.len() as u64);
            page[pointer + 2 * int_len] = payload.format;
            page[pointer + 2 * int_len + 1] = u8::from(payload.is_data);
        }
        if truncated_tail {
            let pointer = bit + 8 + payloads.len() * self.pointer_len();
            endian.uint(&mut page, pointer, int_len, 0);
            endian.uint(&mut page, pointer + int_len, int_len, 16);
            page[pointer + 2 * int_len] = FORMAT_TRUNCATED;
            page[pointer + 2 * int_len + 1] = 1;
        }
        (page, low)
    }

    fn data_pages(&self, pages: &mut Vec<Vec<u8>>, rows: &[Vec<u8>]) {
        let row_length = self.row_length();
        let start = self.page_bit_offset() + 8;
        let per_page = (self.page_length - start) / row_length;
        for chunk in rows.chunks(per_page) {
            let mut page = vec![0u8; self.page_length];
            let endian = self.endian();
            endian.u16(&mut page, self.page_bit_offset(), PAGE_DATA);
            endian.u16(&mut page, self.page_bit_offset() + 2, chunk.len() as u16);
            for (idx, row) in chunk.iter().enumerate() {
                let at = start + idx * row_length;
                page[at..at + row_length].copy_from_slice(row);
            }
            pages.push(page);
        }
    }
}

struct TextRefs {
    compression: [u16; 3],
    label: [u16; 3],
    names: Vec<[u16; 3]>,
    formats: Vec<[u16; 3]>,
    labels: Vec<[u16; 3]>,
}

fn put_text(buf: &mut [u8], at: usize, len: usize, text: &str) {
    let field = &mut buf[at..at + len];
    field.fill(b' ');
    field[..text.len()].copy_from_slice(text.as_bytes());
}

fn run_length(bytes: &[u8], max: usize) -> usize {
    bytes
        .iter()
        .take(max)
        .take_while(|&&byte| byte == bytes[0])
        .count()
}

/// RLE token stream: fill commands for blank/`@`/zero runs, byte runs for
/// other repeats and literal copies of up to 16 bytes.
pub fn rle_encode(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut literal: Vec<u8> = Vec::new();
    let flush = |out: &mut Vec<u8>, literal: &mut Vec<u8>| {
        if !literal.is_empty() {
            out.push(0x80 | (literal.len() as u8 - 1));
            out.append(literal);
        }
    };
    let mut i = 0;
    while i < row.len() {
        let byte = row[i];
        let fill = matches!(byte, b' ' | b'@' | 0);
        let run = run_length(&row[i..], if fill { 17 } else { 18 });
        if run >= 3 {
            flush(&mut out, &mut literal);
            match byte {
                b' ' => out.push(0xE0 | (run as u8 - 2)),
                b'@' => out.push(0xD0 | (run as u8 - 2)),
                0 => out.push(0xF0 | (run as u8 - 2)),
                _ => {
                    out.push(0xC0 | (run as u8 - 3));
                    out.push(byte);
                }
            }
            i += run;
        } else {
            literal.push(byte);
            if literal.len() == 16 {
                flush(&mut out, &mut literal);
            }
            i += 1;
        }
    }
    flush(&mut out, &mut literal);
    out
}

/// RDC stream of literals and short runs (3-18 repeats).
pub fn rdc_encode(row: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < row.len() {
        let control_at = out.len();
        out.extend_from_slice(&[0, 0]);
        let mut control = 0u16;
        for bit in 0..16 {
            if i >= row.len() {
                break;
            }
            let run = run_length(&row[i..], 18);
            if run >= 3 {
                control |= 1 << (15 - bit);
                out.push(run as u8 - 3);
                out.push(row[i]);
                i += run;
            } else {
                out.push(row[i]);
                i += 1;
            }
        }
        out[control_at..control_at + 2].copy_from_slice(&control.to_be_bytes());
    }
    out
}

pub fn open(bytes: Vec<u8>) -> SasFile<Cursor<Vec<u8>>> {
    open_with(bytes, ReadOptions::new())
}

pub fn open_with(bytes: Vec<u8>, options: ReadOptions) -> SasFile<Cursor<Vec<u8>>> {
    SasFile::from_reader(Cursor::new(bytes), options).expect("synthetic file opens")
}

/// Every row of the file as JSON, for whole-table comparisons.
pub fn collect_rows(sas: &mut SasFile<Cursor<Vec<u8>>>) -> Vec<Vec<JsonValue>> {
    let mut cursor = sas.rows().expect("row cursor");
    let mut rows = Vec::new();
    while cursor.next().expect("row decodes") {
        let values = cursor.values().expect("values");
        rows.push(values.iter().map(value_to_json).collect());
    }
    rows
}

pub fn value_to_json(value: &Value<'_>) -> JsonValue {
    match value {
        Value::Number(number) => json!(number),
        Value::Text(text) => json!(text),
        Value::Date(date) => json!(date.to_string()),
        Value::DateTime(at) => json!(at.to_string()),
        Value::Time(duration) => json!(duration.as_seconds_f64()),
        Value::Missing(missing) => json!(format!("{missing:?}")),
    }
}
