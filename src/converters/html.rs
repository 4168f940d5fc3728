use super::decode_text;
use crate::engine::ConvertOptions;
use crate::markdown;
use crate::reader::{ConversionResult, ConverterError, DocumentConverter};
use crate::stream_info::StreamInfo;
use regex::Regex;
use std::sync::OnceLock;

const EXTENSIONS: &[&str] = &[".html", ".htm", ".xhtml"];
const MIME_PREFIXES: &[&str] = &["text/html", "application/xhtml"];

pub struct HtmlConverter;

impl DocumentConverter for HtmlConverter {
    fn name(&self) -> &str {
        "html"
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
        let html = decode_text(input, info);
        let md = markdown::clean_markdown(&html_to_markdown(&html));

        Ok(ConversionResult {
            title: extract_html_title(&html).or_else(|| markdown::extract_title(&md)),
            markdown: md,
            ..ConversionResult::default()
        })
    }
}

/// `<script>`/`<style>` bodies are dropped before conversion
pub fn html_to_markdown(html: &str) -> String {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    let noise = NOISE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("valid regex")
    });
    html2md::parse_html(&noise.replace_all(html, ""))
}

fn extract_html_title(html: &str) -> Option<String> {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    let title = TITLE.get_or_init(|| {
        Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("valid regex")
    });
    title
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty())
}
