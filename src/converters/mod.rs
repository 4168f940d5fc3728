pub mod csv;
pub mod docintel;
pub mod docx;
mod docx_markdown;
pub mod epub;
pub mod html;
pub mod plain_text;

use crate::stream_info::StreamInfo;
use encoding_rs::{Encoding, UTF_8};

/// Decode `input` using the charset in `info`, falling back to UTF-8.
/// Malformed sequences become U+FFFD.
pub fn decode_text(input: &[u8], info: &StreamInfo) -> String {
    let encoding = info
        .charset
        .as_deref()
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(input);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_charset_hint() {
        let info = StreamInfo {
            charset: Some("windows-1252".to_string()),
            ..StreamInfo::default()
        };
        assert_eq!(decode_text(b"caf\xe9", &info), "café");
    }

    #[test]
    fn test_decode_defaults_to_utf8_and_strips_bom() {
        let info = StreamInfo::default();
        assert_eq!(decode_text("\u{feff}héllo".as_bytes(), &info), "héllo");
    }
}
