use encoding::all::{UTF_16BE, UTF_16LE};
use encoding::{DecoderTrap, Encoding};

const BOM_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_BE: [u8; 2] = [0xFE, 0xFF];

/// Decodes a whole UTF-16 text buffer.
///
/// A leading byte order mark picks the endianness and is stripped, otherwise little endian is
/// assumed (this is what `Report.wer` files written by Windows use).
pub(crate) fn decode_utf16_text(bytes: &[u8]) -> Result<String, String> {
    let (codec, body) = if let Some(rest) = bytes.strip_prefix(&BOM_LE) {
        (UTF_16LE as &dyn Encoding, rest)
    } else if let Some(rest) = bytes.strip_prefix(&BOM_BE) {
        (UTF_16BE as &dyn Encoding, rest)
    } else {
        (UTF_16LE as &dyn Encoding, bytes)
    };

    codec
        .decode(body, DecoderTrap::Strict)
        .map_err(|e| e.into_owned())
}

/// Encodes text as UTF-16LE with a byte order mark, the way Windows writes `Report.wer`.
pub fn encode_utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + text.len() * 2);
    out.extend_from_slice(&BOM_LE);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}
