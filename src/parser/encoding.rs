use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use simdutf8::basic;

use super::classify::WireCode;

/// Character set declared by the header's encoding byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSet {
    code: u8,
    name: &'static str,
}

impl CharacterSet {
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// The `encoding_rs` decoder for this character set, falling back to
    /// UTF-8 for sets it has no decoder for.
    #[must_use]
    pub fn encoding(self) -> &'static Encoding {
        resolve_label(self.name).unwrap_or(UTF_8)
    }

    /// Whether [`CharacterSet::encoding`] resolves to a real decoder.
    #[must_use]
    pub fn has_decoder(self) -> bool {
        resolve_label(self.name).is_some()
    }
}

impl WireCode for CharacterSet {
    type Raw = u8;

    fn from_raw(raw: u8) -> Option<Self> {
        CHARACTER_SETS
            .iter()
            .find(|(code, _)| *code == raw)
            .map(|&(code, name)| Self { code, name })
    }

    fn raw(self) -> u8 {
        self.code
    }
}

pub(crate) static CHARACTER_SETS: &[(u8, &str)] = &[
    (0, "WINDOWS-1252"),
    (20, "UTF-8"),
    (28, "US-ASCII"),
    (29, "ISO-8859-1"),
    (30, "ISO-8859-2"),
    (31, "ISO-8859-3"),
    (32, "ISO-8859-4"),
    (33, "ISO-8859-5"),
    (34, "ISO-8859-6"),
    (35, "ISO-8859-7"),
    (36, "ISO-8859-8"),
    (37, "ISO-8859-9"),
    (39, "ISO-8859-11"),
    (40, "ISO-8859-15"),
    (41, "CP437"),
    (42, "CP850"),
    (43, "CP852"),
    (44, "CP857"),
    (45, "CP858"),
    (46, "CP862"),
    (47, "CP864"),
    (48, "CP865"),
    (49, "CP866"),
    (50, "CP869"),
    (51, "CP874"),
    (52, "CP921"),
    (53, "CP922"),
    (54, "CP1129"),
    (55, "CP720"),
    (56, "CP737"),
    (57, "CP775"),
    (58, "CP860"),
    (59, "CP863"),
    (60, "WINDOWS-1250"),
    (61, "WINDOWS-1251"),
    (62, "WINDOWS-1252"),
    (63, "WINDOWS-1253"),
    (64, "WINDOWS-1254"),
    (65, "WINDOWS-1255"),
    (66, "WINDOWS-1256"),
    (67, "WINDOWS-1257"),
    (68, "WINDOWS-1258"),
    (69, "MACROMAN"),
    (70, "MACARABIC"),
    (71, "MACHEBREW"),
    (72, "MACGREEK"),
    (73, "MACTHAI"),
    (75, "MACTURKISH"),
    (76, "MACUKRAINE"),
    (118, "CP950"),
    (119, "EUC-TW"),
    (123, "BIG-5"),
    (125, "GB18030"),
    (126, "WINDOWS-936"),
    (128, "CP1381"),
    (134, "EUC-JP"),
    (136, "CP949"),
    (137, "CP942"),
    (138, "CP932"),
    (140, "EUC-KR"),
    (141, "CP949"),
    (142, "CP949"),
    (163, "MACICELAND"),
    (167, "ISO-2022-JP"),
    (168, "ISO-2022-KR"),
    (169, "ISO-2022-CN"),
    (172, "ISO-2022-CN-EXT"),
    (204, "WINDOWS-1252"),
    (205, "GB18030"),
    (227, "ISO-8859-14"),
    (242, "ISO-8859-13"),
    (245, "MACCROATIAN"),
    (246, "MACCYRILLIC"),
    (247, "MACROMANIA"),
    (248, "SHIFT_JISX0213"),
];

/// Resolves an encoding label (as used by SAS or WHATWG) to a decoder.
pub fn resolve_label(name: &str) -> Option<&'static Encoding> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }

    try_encoding_label(trimmed).or_else(|| {
        let lower = trimmed.to_ascii_lowercase();
        try_encoding_label(&lower)
            .or_else(|| try_encoding_label(&lower.replace('_', "-")))
            .or_else(|| mac_compat_encoding(&lower))
    })
}

fn try_encoding_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
}

fn mac_compat_encoding(lower_label: &str) -> Option<&'static Encoding> {
    match lower_label {
        "macroman" => Encoding::for_label(b"macintosh"),
        "macarabic" => Encoding::for_label(b"x-mac-arabic"),
        "machebrew" => Encoding::for_label(b"x-mac-hebrew"),
        "macgreek" => Encoding::for_label(b"x-mac-greek"),
        "macthai" => Encoding::for_label(b"x-mac-thai"),
        "macturkish" => Encoding::for_label(b"x-mac-turkish"),
        "macukraine" => Encoding::for_label(b"x-mac-ukrainian"),
        "maciceland" => Encoding::for_label(b"x-mac-icelandic"),
        "maccroatian" => Encoding::for_label(b"x-mac-croatian"),
        "maccyrillic" => Encoding::for_label(b"x-mac-cyrillic"),
        "macromania" => Encoding::for_label(b"x-mac-romanian"),
        _ => None,
    }
}

pub fn trim_trailing(bytes: &[u8]) -> &[u8] {
    match bytes.iter().rposition(|b| *b != 0 && *b != b' ') {
        Some(last) => &bytes[..=last],
        None => &[],
    }
}

/// Decodes a fixed-width text field, trimming trailing blanks and NULs.
///
/// Malformed sequences are replaced rather than rejected. Blank input yields
/// `None`.
pub fn decode_text<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let trimmed = trim_trailing(bytes);
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(text) = basic::from_utf8(trimmed)
        && (encoding == UTF_8 || trimmed.is_ascii())
    {
        return Some(Cow::Borrowed(text));
    }

    let (decoded, _had_errors) = encoding.decode_without_bom_handling(trimmed);
    let trimmed_len = decoded.trim_end_matches([' ', '\u{0000}']).len();
    if trimmed_len == 0 {
        return None;
    }
    Some(match decoded {
        Cow::Borrowed(text) => Cow::Borrowed(&text[..trimmed_len]),
        Cow::Owned(mut owned) => {
            owned.truncate(trimmed_len);
            Cow::Owned(owned)
        }
    })
}
