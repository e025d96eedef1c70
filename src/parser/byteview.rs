use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding_rs::Encoding;

use crate::error::{Error, Result};
use crate::metadata::Endianness;

use super::encoding::decode_text;

/// Read-only, endianness-aware view over a fixed byte range.
///
/// Every read is bounds-checked and fails with [`Error::OutOfRange`] instead of
/// panicking.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
    order: Endianness,
}

impl<'a> ByteView<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8], order: Endianness) -> Self {
        Self { bytes, order }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn order(&self) -> Endianness {
        self.order
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Same bytes, interpreted with a different byte order.
    #[must_use]
    pub const fn with_order(self, order: Endianness) -> Self {
        Self {
            bytes: self.bytes,
            order,
        }
    }

    /// Returns the raw bytes in `offset..offset + len`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the range leaves the view.
    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(Error::OutOfRange {
                offset,
                len,
                available: self.bytes.len(),
            })
    }

    /// Zero-copy sub-view sharing this view's byte order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the range leaves the view.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        Ok(Self::new(self.bytes_at(offset, len)?, self.order))
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the range leaves the view.
    pub fn copy_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        dst.copy_from_slice(self.bytes_at(offset, dst.len())?);
        Ok(())
    }

    fn decode<T>(
        &self,
        offset: usize,
        width: usize,
        little: fn(&[u8]) -> T,
        big: fn(&[u8]) -> T,
    ) -> Result<T> {
        let bytes = self.bytes_at(offset, width)?;
        Ok(match self.order {
            Endianness::Little => little(bytes),
            Endianness::Big => big(bytes),
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when `offset` is past the end of the view.
    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes_at(offset, 1)?[0])
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view.
    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        self.decode(offset, 2, LittleEndian::read_u16, BigEndian::read_u16)
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view.
    pub fn i16_at(&self, offset: usize) -> Result<i16> {
        self.decode(offset, 2, LittleEndian::read_i16, BigEndian::read_i16)
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view.
    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        self.decode(offset, 4, LittleEndian::read_u32, BigEndian::read_u32)
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view.
    pub fn u64_at(&self, offset: usize) -> Result<u64> {
        self.decode(offset, 8, LittleEndian::read_u64, BigEndian::read_u64)
    }

    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view.
    pub fn f64_at(&self, offset: usize) -> Result<f64> {
        self.decode(offset, 8, LittleEndian::read_f64, BigEndian::read_f64)
    }

    /// Reads an unsigned integer whose width (4 or 8 bytes) depends on the
    /// file's layout mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view.
    pub fn uint_at(&self, offset: usize, width: usize) -> Result<u64> {
        if width == 8 {
            self.u64_at(offset)
        } else {
            self.u32_at(offset).map(u64::from)
        }
    }

    /// Like [`ByteView::uint_at`] but converted to `usize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the field leaves the view or
    /// [`Error::Unsupported`] when it does not fit the platform pointer width.
    pub fn usize_at(&self, offset: usize, width: usize) -> Result<usize> {
        let value = self.uint_at(offset, width)?;
        usize::try_from(value).map_err(|_| Error::Unsupported {
            feature: format!("field value {value} exceeds platform pointer width").into(),
        })
    }

    /// Decodes `len` bytes at `offset` with `encoding`, trimming trailing
    /// blanks and NULs. Blank strings come back as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the range leaves the view.
    pub fn string_at(
        &self,
        offset: usize,
        len: usize,
        encoding: &'static Encoding,
    ) -> Result<Option<String>> {
        let bytes = self.bytes_at(offset, len)?;
        Ok(decode_text(bytes, encoding).map(|text| text.trim().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn reads_follow_view_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        let little = ByteView::new(&bytes, Endianness::Little);
        let big = little.with_order(Endianness::Big);
        assert_eq!(little.u16_at(0).unwrap(), 0x0201);
        assert_eq!(big.u16_at(0).unwrap(), 0x0102);
        assert_eq!(little.u32_at(0).unwrap(), 0x0403_0201);
        assert_eq!(big.u32_at(0).unwrap(), 0x0102_0304);
    }

    #[test]
    fn out_of_range_reads_fail() {
        let bytes = [0u8; 6];
        let view = ByteView::new(&bytes, Endianness::Little);
        let err = view.u64_at(0).unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfRange {
                offset: 0,
                len: 8,
                available: 6
            }
        ));
        assert!(view.slice(4, 4).is_err());
        assert!(view.bytes_at(usize::MAX, 2).is_err());
    }

    #[test]
    fn slice_is_relative_and_keeps_order() {
        let bytes = [0xAA, 0x00, 0x00, 0xF0, 0x3F, 0xBB];
        let view = ByteView::new(&bytes, Endianness::Big);
        let sub = view.slice(1, 4).unwrap();
        assert_eq!(sub.len(), 4);
        assert_eq!(sub.order(), Endianness::Big);
        assert_eq!(sub.u32_at(0).unwrap(), 0x0000_F03F);
    }

    #[test]
    fn uint_at_respects_width() {
        let mut bytes = [0u8; 8];
        bytes[..8].copy_from_slice(&0x1_0000_0002_u64.to_le_bytes());
        let view = ByteView::new(&bytes, Endianness::Little);
        assert_eq!(view.uint_at(0, 4).unwrap(), 2);
        assert_eq!(view.uint_at(0, 8).unwrap(), 0x1_0000_0002);
    }

    #[test]
    fn string_at_trims_and_maps_blank_to_none() {
        let bytes = b"  name  \0\0        ";
        let view = ByteView::new(bytes, Endianness::Little);
        assert_eq!(view.string_at(0, 10, UTF_8).unwrap().as_deref(), Some("name"));
        assert_eq!(view.string_at(10, 8, UTF_8).unwrap(), None);
    }

    #[test]
    fn copy_into_fills_destination() {
        let bytes = [1u8, 2, 3, 4, 5];
        let view = ByteView::new(&bytes, Endianness::Little);
        let mut dst = [0u8; 3];
        view.copy_into(2, &mut dst).unwrap();
        assert_eq!(dst, [3, 4, 5]);
        assert!(view.copy_into(3, &mut dst).is_err());
    }
}
