use encoding_rs::{Encoding, UTF_8};
use time::PrimitiveDateTime;

use crate::error::{Error, Result, Section};
use crate::metadata::{Endianness, SasVersion, Vendor};

use super::byteview::ByteView;
use super::classify::{Classified, WireCode};
use super::encoding::CharacterSet;
use super::values::sas_seconds_to_datetime;
use super::window::ByteSource;

/// Number of header bytes needed to read every fixed field in either layout.
pub const HEADER_MIN_LEN: usize = 296;

const SAS_ALIGNMENT_OFFSET_4: u8 = 0x33;
const SAS_ENDIAN_BIG: u8 = 0x00;
const SAS_ENDIAN_LITTLE: u8 = 0x01;

const SAS7BDAT_MAGIC_NUMBER: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];

const U64_FLAG_OFFSET: usize = 32;
const PAD_FLAG_OFFSET: usize = 35;
const ENDIANNESS_OFFSET: usize = 37;
const PLATFORM_OFFSET: usize = 39;
const ENCODING_OFFSET: usize = 70;
const DATASET_NAME_OFFSET: usize = 92;
const DATASET_NAME_LEN: usize = 64;
const FILE_TYPE_OFFSET: usize = 156;
const FILE_TYPE_LEN: usize = 8;

// Shifted by the pad flag.
const CREATED_OFFSET: usize = 164;
const MODIFIED_OFFSET: usize = 172;
const HEADER_LENGTH_OFFSET: usize = 196;
const PAGE_LENGTH_OFFSET: usize = 200;
const PAGE_COUNT_OFFSET: usize = 204;

// Shifted by the pad flag and the 64-bit flag.
const RELEASE_OFFSET: usize = 216;
const RELEASE_LEN: usize = 8;
const HOST_OFFSET: usize = 224;
const OS_VERSION_OFFSET: usize = 240;
const OS_MAKER_OFFSET: usize = 256;
const OS_NAME_OFFSET: usize = 272;
const HOST_FIELD_LEN: usize = 16;

/// Whether records use 32-bit or 64-bit field widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    pub is_u64: bool,
}

impl Layout {
    pub const BIT32: Self = Self { is_u64: false };
    pub const BIT64: Self = Self { is_u64: true };

    /// Width of layout-dependent integers (offsets, lengths, counts).
    #[must_use]
    pub const fn int_len(self) -> usize {
        if self.is_u64 { 8 } else { 4 }
    }

    #[must_use]
    pub const fn signature_len(self) -> usize {
        self.int_len()
    }

    /// Offset of the page type within a page.
    #[must_use]
    pub const fn page_bit_offset(self) -> usize {
        if self.is_u64 { 32 } else { 16 }
    }

    #[must_use]
    pub const fn page_header_len(self) -> usize {
        self.page_bit_offset() + 8
    }

    #[must_use]
    pub const fn pointer_len(self) -> usize {
        if self.is_u64 { 24 } else { 12 }
    }

    /// Bytes between the start of a column-text subheader and its text block.
    #[must_use]
    pub const fn text_pad(self) -> usize {
        self.int_len()
    }
}

/// Operating-system family that wrote the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl WireCode for Platform {
    type Raw = u8;

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            b'1' => Some(Self::Unix),
            b'2' => Some(Self::Windows),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Self::Unix => b'1',
            Self::Windows => b'2',
        }
    }
}

/// The fixed file header.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub layout: Layout,
    /// Extra bytes (0 or 4) inserted before the timestamp block.
    pub pad: usize,
    pub endianness: Endianness,
    pub platform: Classified<Platform>,
    pub charset: Classified<CharacterSet>,
    pub dataset_name: Option<String>,
    pub file_type: Option<String>,
    /// Seconds since the SAS epoch.
    pub created: f64,
    /// Seconds since the SAS epoch.
    pub modified: f64,
    pub header_length: u32,
    pub page_length: u32,
    pub page_count: u64,
    pub release: Option<String>,
    pub host: Option<String>,
    pub os_version: Option<String>,
    pub os_maker: Option<String>,
    pub os_name: Option<String>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            layout: Layout::BIT32,
            pad: 0,
            endianness: Endianness::Little,
            platform: Classified::Known(Platform::Unix),
            charset: Classified::Unknown(0xFF),
            dataset_name: None,
            file_type: None,
            created: f64::NAN,
            modified: f64::NAN,
            header_length: 1024,
            page_length: 4096,
            page_count: 1,
            release: None,
            host: None,
            os_version: None,
            os_maker: None,
            os_name: None,
        }
    }
}

impl FileHeader {
    /// Reads and parses the header at the start of `source`.
    ///
    /// # Errors
    ///
    /// Fails when the source is shorter than the header, the magic number is
    /// wrong, the endianness byte is invalid, or the geometry is inconsistent.
    pub fn parse<S: ByteSource + ?Sized>(source: &mut S) -> Result<Self> {
        let file_size = source.size()?;
        if file_size < HEADER_MIN_LEN as u64 {
            return Err(Error::corrupted(
                Section::Header,
                format!("file has {file_size} bytes, header needs {HEADER_MIN_LEN}"),
            ));
        }
        let mut buf = [0u8; HEADER_MIN_LEN];
        source.read_at(0, &mut buf)?;
        Self::from_bytes(&buf, file_size)
    }

    /// Parses a header from its leading bytes.
    ///
    /// # Errors
    ///
    /// See [`FileHeader::parse`].
    pub fn from_bytes(bytes: &[u8], file_size: u64) -> Result<Self> {
        if bytes.len() < HEADER_MIN_LEN {
            return Err(Error::corrupted(
                Section::Header,
                format!("header truncated to {} bytes", bytes.len()),
            ));
        }
        // Bytes before the endianness flag are single-byte fields.
        let raw = ByteView::new(bytes, Endianness::Little);
        if raw.bytes_at(0, SAS7BDAT_MAGIC_NUMBER.len())? != SAS7BDAT_MAGIC_NUMBER {
            return Err(Error::corrupted(
                Section::Header,
                "unrecognized SAS magic number",
            ));
        }

        let layout = Layout {
            is_u64: raw.u8_at(U64_FLAG_OFFSET)? == SAS_ALIGNMENT_OFFSET_4,
        };
        let pad = if raw.u8_at(PAD_FLAG_OFFSET)? == SAS_ALIGNMENT_OFFSET_4 {
            4
        } else {
            0
        };
        let endianness = match raw.u8_at(ENDIANNESS_OFFSET)? {
            SAS_ENDIAN_BIG => Endianness::Big,
            SAS_ENDIAN_LITTLE => Endianness::Little,
            other => {
                return Err(Error::corrupted(
                    Section::Header,
                    format!("unsupported endian flag 0x{other:02X}"),
                ));
            }
        };
        let view = raw.with_order(endianness);

        let platform = Classified::classify(view.u8_at(PLATFORM_OFFSET)?);
        let charset = Classified::<CharacterSet>::classify(view.u8_at(ENCODING_OFFSET)?);
        let text_encoding: &'static Encoding = charset.known().map_or(UTF_8, CharacterSet::encoding);

        let shift = pad + if layout.is_u64 { 4 } else { 0 };
        let header_length = view.u32_at(HEADER_LENGTH_OFFSET + pad)?;
        let page_length = view.u32_at(PAGE_LENGTH_OFFSET + pad)?;
        let page_count = view.uint_at(PAGE_COUNT_OFFSET + pad, layout.int_len())?;

        if u64::from(header_length) > file_size {
            return Err(Error::corrupted(
                Section::Header,
                format!("header length {header_length} exceeds file size {file_size}"),
            ));
        }
        if (header_length as usize) < HEADER_MIN_LEN {
            return Err(Error::corrupted(
                Section::Header,
                format!("header length {header_length} shorter than fixed header"),
            ));
        }
        if page_count == 0 {
            return Err(Error::corrupted(Section::Header, "page count is zero"));
        }

        let text = |offset: usize, len: usize| view.string_at(offset, len, text_encoding);

        Ok(Self {
            layout,
            pad,
            endianness,
            platform,
            charset,
            dataset_name: text(DATASET_NAME_OFFSET, DATASET_NAME_LEN)?,
            file_type: text(FILE_TYPE_OFFSET, FILE_TYPE_LEN)?,
            created: view.f64_at(CREATED_OFFSET + pad)?,
            modified: view.f64_at(MODIFIED_OFFSET + pad)?,
            header_length,
            page_length,
            page_count,
            release: text(RELEASE_OFFSET + shift, RELEASE_LEN)?,
            host: text(HOST_OFFSET + shift, HOST_FIELD_LEN)?,
            os_version: text(OS_VERSION_OFFSET + shift, HOST_FIELD_LEN)?,
            os_maker: text(OS_MAKER_OFFSET + shift, HOST_FIELD_LEN)?,
            os_name: text(OS_NAME_OFFSET + shift, HOST_FIELD_LEN)?,
        })
    }

    #[must_use]
    pub fn created_at(&self) -> Option<PrimitiveDateTime> {
        sas_seconds_to_datetime(self.created)
    }

    #[must_use]
    pub fn modified_at(&self) -> Option<PrimitiveDateTime> {
        sas_seconds_to_datetime(self.modified)
    }

    /// Encoding used for text, UTF-8 when the character set is unknown or
    /// has no decoder.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.charset.known().map_or(UTF_8, CharacterSet::encoding)
    }
}

/// Splits a release string such as `9.0401M3` into version and vendor.
#[must_use]
pub fn parse_release(release: &str) -> Option<(SasVersion, Vendor)> {
    let release = release.trim();
    let mut chars = release.chars();
    let major_char = chars.next()?;
    if chars.next() != Some('.') {
        return None;
    }
    let minor_digits: String = chars.by_ref().take(4).collect();
    if minor_digits.len() != 4 || !minor_digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let revision_tag = chars.next()?;
    if revision_tag != 'M' && revision_tag != 'J' {
        return None;
    }
    let revision = u16::try_from(chars.next()?.to_digit(10)?).ok()?;

    let major = match major_char {
        '1'..='9' => u16::try_from(major_char.to_digit(10)?).ok()?,
        'V' => 9,
        _ => return None,
    };
    let minor = minor_digits.parse::<u16>().ok()?;

    let vendor = if (major == 8 || major == 9) && minor == 0 && revision == 0 {
        Vendor::StatTransfer
    } else {
        Vendor::Sas
    };

    Some((
        SasVersion {
            major,
            minor,
            revision,
        },
        vendor,
    ))
}
