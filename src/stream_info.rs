use std::path::{Path, PathBuf};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const EPUB_MIME: &str = "application/epub+zip";

/// What is known about an input stream. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamInfo {
    /// Lowercase, with a leading dot (".pdf")
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    /// Canonical encoding name ("UTF-8", "windows-1252")
    pub charset: Option<String>,
    pub filename: Option<String>,
    pub local_path: Option<PathBuf>,
}

impl StreamInfo {
    /// Stream info derived from a file on disk
    pub fn from_path(path: &Path) -> Self {
        Self {
            extension: path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase())),
            filename: path.file_name().map(|f| f.to_string_lossy().to_string()),
            local_path: Some(path.to_path_buf()),
            ..Self::default()
        }
    }

    /// Returns a copy where every field set in `other` replaces ours
    pub fn merged_with(&self, other: &StreamInfo) -> Self {
        Self {
            extension: other.extension.clone().or_else(|| self.extension.clone()),
            mime_type: other.mime_type.clone().or_else(|| self.mime_type.clone()),
            charset: other.charset.clone().or_else(|| self.charset.clone()),
            filename: other.filename.clone().or_else(|| self.filename.clone()),
            local_path: other.local_path.clone().or_else(|| self.local_path.clone()),
        }
    }

    /// Fill missing extension/MIME type from each other and from the content
    pub fn guess(&self, content: &[u8]) -> Self {
        let mut info = self.clone();

        if info.mime_type.is_none() {
            info.mime_type = info
                .extension
                .as_deref()
                .and_then(mime_for_extension)
                .map(str::to_string)
                .or_else(|| sniff_mime(content));
        }

        if info.extension.is_none() {
            info.extension = info
                .mime_type
                .as_deref()
                .and_then(extension_for_mime)
                .map(str::to_string);
        }

        if info.mime_type.is_none() && looks_like_text(content) {
            let (mime, ext) = if looks_like_html(content) {
                ("text/html", ".html")
            } else {
                ("text/plain", ".txt")
            };
            info.mime_type = Some(mime.to_string());
            info.extension.get_or_insert_with(|| ext.to_string());
            if info.charset.is_none() {
                info.charset = Some("UTF-8".to_string());
            }
        }

        info
    }

    /// Base MIME type without parameters, lowercased
    pub fn mime_essence(&self) -> Option<String> {
        self.mime_type
            .as_deref()
            .map(|m| m.split(';').next().unwrap_or(m).trim().to_lowercase())
    }

    pub fn has_extension(&self, candidates: &[&str]) -> bool {
        self.extension
            .as_deref()
            .is_some_and(|ext| candidates.contains(&ext))
    }

    pub fn has_mime_prefix(&self, candidates: &[&str]) -> bool {
        self.mime_essence()
            .is_some_and(|mime| candidates.iter().any(|c| mime.starts_with(c)))
    }
}

const EXTENSION_TABLE: &[(&str, &str)] = &[
    (".txt", "text/plain"),
    (".text", "text/plain"),
    (".log", "text/plain"),
    (".md", "text/markdown"),
    (".markdown", "text/markdown"),
    (".json", "application/json"),
    (".html", "text/html"),
    (".htm", "text/html"),
    (".xhtml", "application/xhtml+xml"),
    (".csv", "text/csv"),
    (".xml", "application/xml"),
    (".docx", DOCX_MIME),
    (".pptx", PPTX_MIME),
    (".xlsx", XLSX_MIME),
    (".epub", EPUB_MIME),
    (".pdf", "application/pdf"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".bmp", "image/bmp"),
    (".tiff", "image/tiff"),
    (".heif", "image/heif"),
];

pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// First extension registered for a MIME type
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    EXTENSION_TABLE
        .iter()
        .find(|(_, m)| m.eq_ignore_ascii_case(essence))
        .map(|(ext, _)| *ext)
}

/// Identify binary formats by magic bytes.
/// OOXML and EPUB are ZIP containers, so the mimetype entry is checked first.
fn sniff_mime(content: &[u8]) -> Option<String> {
    if content.starts_with(b"PK\x03\x04") {
        if content.get(30..58) == Some(b"mimetypeapplication/epub+zip".as_slice()) {
            return Some(EPUB_MIME.to_string());
        }
        let head = &content[..content.len().min(4096)];
        if contains(head, b"word/") {
            return Some(DOCX_MIME.to_string());
        }
        if contains(head, b"ppt/") {
            return Some(PPTX_MIME.to_string());
        }
        if contains(head, b"xl/") {
            return Some(XLSX_MIME.to_string());
        }
    }

    infer::get(content).map(|kind| kind.mime_type().to_string())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn looks_like_text(content: &[u8]) -> bool {
    !content.contains(&0) && std::str::from_utf8(content).is_ok()
}

fn looks_like_html(content: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&content[..content.len().min(512)]);
    let head = head.trim_start().trim_start_matches('\u{feff}').to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
