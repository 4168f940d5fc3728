use super::decode_text;
use crate::engine::ConvertOptions;
use crate::reader::{ConversionResult, ConverterError, DocumentConverter, PRIORITY_GENERIC};
use crate::stream_info::StreamInfo;

const EXTENSIONS: &[&str] = &[".txt", ".text", ".log", ".md", ".markdown", ".json", ".jsonl"];
const MIME_PREFIXES: &[&str] = &["text/plain", "text/markdown", "application/json"];

/// Text and markdown pass through after charset decoding
pub struct PlainTextConverter;

impl DocumentConverter for PlainTextConverter {
    fn name(&self) -> &str {
        "plain-text"
    }

    fn priority(&self) -> f32 {
        PRIORITY_GENERIC
    }

    fn accepts(&self, _input: &[u8], info: &StreamInfo) -> bool {
        info.has_extension(EXTENSIONS) || info.has_mime_prefix(MIME_PREFIXES)
    }

    fn convert(
        &self,
        input: &[u8],
        info: &StreamInfo,
        _options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError> {
        Ok(ConversionResult::new(decode_text(input, info)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_markdown_by_extension() {
        let info = StreamInfo {
            extension: Some(".md".to_string()),
            ..StreamInfo::default()
        };
        assert!(PlainTextConverter.accepts(b"", &info));
    }

    #[test]
    fn test_rejects_html() {
        let info = StreamInfo {
            mime_type: Some("text/html".to_string()),
            ..StreamInfo::default()
        };
        assert!(!PlainTextConverter.accepts(b"", &info));
    }

    #[test]
    fn test_latin1_text_decoded() {
        let info = StreamInfo {
            mime_type: Some("text/plain".to_string()),
            charset: Some("windows-1252".to_string()),
            ..StreamInfo::default()
        };
        let result = PlainTextConverter
            .convert(b"na\xefve", &info, &ConvertOptions::default())
            .unwrap();
        assert_eq!(result.markdown, "naïve");
    }
}
