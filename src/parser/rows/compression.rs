use crate::parser::classify::WireCode;

pub const RLE_SIGNATURE: &str = "SASYZCRL";
pub const RDC_SIGNATURE: &str = "SASYZCR2";

/// Expands one compressed row payload into a fixed-length row buffer.
pub trait Decompressor {
    /// Fills all of `output` from `input`.
    ///
    /// # Errors
    ///
    /// Fails with a short description when the token stream is malformed or
    /// does not produce exactly `output.len()` bytes.
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<(), &'static str>;
}

/// Row compression scheme named by the dataset's compression id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Rle,
    Rdc,
}

impl WireCode for Codec {
    type Raw = String;

    fn from_raw(raw: String) -> Option<Self> {
        match raw.as_str() {
            RLE_SIGNATURE => Some(Self::Rle),
            RDC_SIGNATURE => Some(Self::Rdc),
            _ => None,
        }
    }

    fn raw(self) -> String {
        match self {
            Self::Rle => RLE_SIGNATURE.to_owned(),
            Self::Rdc => RDC_SIGNATURE.to_owned(),
        }
    }
}

impl Decompressor for Codec {
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<(), &'static str> {
        match self {
            Self::Rle => Rle.decompress(input, output),
            Self::Rdc => Rdc.decompress(input, output),
        }
    }
}

/// Run-length scheme selected by `SASYZCRL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rle;

/// Ross data compression, selected by `SASYZCR2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rdc;

/// Fill bytes of the `@`, space and zero commands, indexed by the low two
/// bits of the command nibble.
const RLE_FILL_BYTES: [u8; 4] = [0, b'@', b' ', 0];

/// One command of an RLE token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RleOp {
    /// Copy the next `len` input bytes verbatim.
    Copy(usize),
    /// Write `len` copies of `byte`.
    Fill { len: usize, byte: u8 },
}

impl RleOp {
    /// Parses the command at the head of `input`. Returns it with the number
    /// of bytes the command itself occupies.
    fn parse(input: &[u8]) -> Result<(Self, usize), &'static str> {
        let (&control, args) = input.split_first().ok_or("RLE command exceeds input length")?;
        let command = control >> 4;
        let nibble = usize::from(control & 0x0F);
        let arg = |idx: usize| args.get(idx).copied().ok_or("RLE command exceeds input length");
        // Long forms extend the nibble with a whole length byte.
        let long = |bias: usize| Ok::<_, &'static str>(usize::from(arg(0)?) + nibble * 256 + bias);
        let fill_byte = RLE_FILL_BYTES[usize::from(command & 0x03)];

        Ok(match command {
            0x0 => (Self::Copy(long(64)?), 2),
            0x1 => (Self::Copy(long(64 + 4096)?), 2),
            0x2 => (Self::Copy(nibble + 96), 1),
            0x4 => (
                Self::Fill {
                    len: long(18)?,
                    byte: arg(1)?,
                },
                3,
            ),
            0x5..=0x7 => (
                Self::Fill {
                    len: long(17)?,
                    byte: fill_byte,
                },
                2,
            ),
            0x8..=0xB => (Self::Copy(nibble + 1 + 16 * usize::from(command - 0x8)), 1),
            0xC => (
                Self::Fill {
                    len: nibble + 3,
                    byte: arg(0)?,
                },
                2,
            ),
            0xD..=0xF => (
                Self::Fill {
                    len: nibble + 2,
                    byte: fill_byte,
                },
                1,
            ),
            _ => return Err("unknown RLE command"),
        })
    }
}

impl Decompressor for Rle {
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<(), &'static str> {
        let mut read = 0usize;
        let mut written = 0usize;
        while read < input.len() {
            let (op, used) = RleOp::parse(&input[read..])?;
            read += used;
            match op {
                RleOp::Copy(len) => {
                    let dst = output
                        .get_mut(written..written + len)
                        .ok_or("RLE copy exceeds output length")?;
                    let src = input
                        .get(read..read + len)
                        .ok_or("RLE copy exceeds input length")?;
                    dst.copy_from_slice(src);
                    read += len;
                    written += len;
                }
                RleOp::Fill { len, byte } => {
                    output
                        .get_mut(written..written + len)
                        .ok_or("RLE insert exceeds output length")?
                        .fill(byte);
                    written += len;
                }
            }
        }
        if written != output.len() {
            return Err("RLE output length mismatch");
        }
        Ok(())
    }
}

/// Copies `len` bytes from `distance` bytes behind `pos`, one byte at a
/// time so that overlapping runs repeat.
fn back_copy(
    output: &mut [u8],
    pos: usize,
    distance: usize,
    len: usize,
) -> Result<(), &'static str> {
    if distance == 0 || distance > pos || pos + len > output.len() {
        return Err("RDC back reference invalid");
    }
    let start = pos - distance;
    for j in 0..len {
        output[pos + j] = output[start + j];
    }
    Ok(())
}

impl Decompressor for Rdc {
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<(), &'static str> {
        let expected_len = output.len();
        let mut out_pos = 0usize;
        let mut i = 0usize;
        while i + 2 <= input.len() {
            let control = u16::from_be_bytes([input[i], input[i + 1]]);
            i += 2;
            for bit in 0..16 {
                if control & (1 << (15 - bit)) == 0 {
                    if i >= input.len() {
                        break;
                    }
                    if out_pos >= expected_len {
                        return Err("RDC output overflow");
                    }
                    output[out_pos] = input[i];
                    out_pos += 1;
                    i += 1;
                    continue;
                }

                if i + 2 > input.len() {
                    return Err("RDC marker exceeds input");
                }
                let marker = input[i];
                let next = usize::from(input[i + 1]);
                i += 2;
                let low = usize::from(marker & 0x0F);

                match marker >> 4 {
                    0 => {
                        let len = 3 + low;
                        if out_pos + len > expected_len {
                            return Err("RDC insert exceeds output length");
                        }
                        output[out_pos..out_pos + len].fill(input[i - 1]);
                        out_pos += len;
                    }
                    1 => {
                        let Some(&byte) = input.get(i) else {
                            return Err("RDC insert length exceeds input");
                        };
                        i += 1;
                        let len = 19 + low + next * 16;
                        if out_pos + len > expected_len {
                            return Err("RDC insert exceeds output length");
                        }
                        output[out_pos..out_pos + len].fill(byte);
                        out_pos += len;
                    }
                    2 => {
                        let Some(&count) = input.get(i) else {
                            return Err("RDC copy length exceeds input");
                        };
                        i += 1;
                        let len = 16 + usize::from(count);
                        back_copy(output, out_pos, 3 + low + next * 16, len)?;
                        out_pos += len;
                    }
                    count => {
                        let len = usize::from(count);
                        back_copy(output, out_pos, 3 + low + next * 16, len)?;
                        out_pos += len;
                    }
                }
            }
        }

        if out_pos != expected_len {
            return Err("RDC output length mismatch");
        }
        Ok(())
    }
}
