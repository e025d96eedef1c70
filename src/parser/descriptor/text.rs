use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section};
use crate::parser::byteview::ByteView;
use crate::parser::encoding::{decode_text, trim_trailing};
use crate::parser::header::Layout;
use crate::parser::page::SubHeaderLocation;

use super::{Signature, StringRef, check_remainder};

/// One column-text block, kept as the raw subheader payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColText {
    pub location: SubHeaderLocation,
    bytes: Vec<u8>,
}

impl ColText {
    /// # Errors
    ///
    /// Fails when the remainder word does not match the payload length.
    pub fn parse(payload: ByteView<'_>, layout: Layout, location: SubHeaderLocation) -> Result<Self> {
        check_remainder(payload, layout, location, Signature::ColText)?;
        Ok(Self {
            location,
            bytes: payload.as_bytes().to_vec(),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw bytes named by `string`, relative to the text area after the
    /// signature pad.
    ///
    /// # Errors
    ///
    /// Fails when the reference runs past the block.
    pub fn bytes_for(&self, string: StringRef, layout: Layout) -> Result<&[u8]> {
        let start = layout.text_pad() + usize::from(string.offset);
        let end = start + usize::from(string.length);
        self.bytes.get(start..end).ok_or_else(|| {
            Error::corrupted(
                Section::Subheader {
                    location: self.location,
                },
                format!(
                    "text reference {start}..{end} exceeds text block of {} bytes",
                    self.bytes.len()
                ),
            )
        })
    }
}

/// Resolves `string` against `blocks`, decoding and trimming the text.
///
/// Empty references and blank text resolve to `None`.
///
/// # Errors
///
/// Fails when the reference names a missing block or runs past its block.
pub fn resolve<'a>(
    blocks: &'a [ColText],
    string: StringRef,
    layout: Layout,
    encoding: &'static Encoding,
) -> Result<Option<Cow<'a, str>>> {
    let Some(bytes) = raw_bytes(blocks, string, layout)? else {
        return Ok(None);
    };
    Ok(decode_text(bytes, encoding).and_then(|text| match text {
        Cow::Borrowed(text) => {
            let text = text.trim();
            (!text.is_empty()).then_some(Cow::Borrowed(text))
        }
        Cow::Owned(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| Cow::Owned(trimmed.to_owned()))
        }
    }))
}

/// Raw bytes of `string` with trailing blanks trimmed; `None` when empty.
///
/// # Errors
///
/// See [`resolve`].
pub fn raw_bytes<'a>(
    blocks: &'a [ColText],
    string: StringRef,
    layout: Layout,
) -> Result<Option<&'a [u8]>> {
    if string.is_empty() {
        return Ok(None);
    }
    let block = blocks
        .get(usize::from(string.block))
        .ok_or_else(|| Error::InvalidMetadata {
            details: format!(
                "text reference names block {} but only {} text blocks exist",
                string.block,
                blocks.len()
            )
            .into(),
        })?;
    let bytes = trim_trailing(block.bytes_for(string, layout)?);
    Ok((!bytes.is_empty()).then_some(bytes))
}
