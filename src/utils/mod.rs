mod time;
mod utf16;

pub use self::time::filetime_to_timestamp;
pub(crate) use self::utf16::decode_utf16_text;
pub use self::utf16::encode_utf16le_with_bom;
