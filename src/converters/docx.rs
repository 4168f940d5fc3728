use super::docx_markdown::{self, media_name};
use crate::engine::ConvertOptions;
use crate::markdown;
use crate::metadata;
use crate::reader::{
    Attachments, ConversionResult, ConverterError, DocumentConverter, Metadata,
};
use crate::stream_info::{StreamInfo, DOCX_MIME};
use docx_rust::DocxFile;
use std::io::Cursor;

/// Word documents. Embedded media are returned as `media/<file>` attachments.
pub struct DocxConverter;

impl DocumentConverter for DocxConverter {
    fn name(&self) -> &str {
        "docx"
    }

    fn accepts(&self, _input: &[u8], info: &StreamInfo) -> bool {
        info.has_extension(&[".docx"]) || info.has_mime_prefix(&[DOCX_MIME])
    }

    fn convert(
        &self,
        input: &[u8],
        _info: &StreamInfo,
        _options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError> {
        let file = DocxFile::from_reader(Cursor::new(input))
            .map_err(|e| ConverterError::new(format!("failed to open DOCX: {}", e)))?;
        let docx = file
            .parse()
            .map_err(|e| ConverterError::new(format!("failed to parse DOCX content: {}", e)))?;

        let meta = docx_metadata(&docx);
        let body = docx_markdown::docx_to_markdown(&docx);

        let mut attachments = Attachments::new();
        for (path, (_media_type, data)) in &docx.media {
            attachments.insert(media_name(path), data.to_vec());
        }

        let md = markdown::clean_markdown(&format!(
            "{}{}",
            metadata::format_metadata(&meta),
            body
        ));

        Ok(ConversionResult {
            title: meta.title.clone().or_else(|| markdown::extract_title(&md)),
            markdown: md,
            attachments,
        })
    }
}

fn docx_metadata(docx: &docx_rust::Docx) -> Metadata {
    // Core and App come in namespaced and non-namespaced variants with
    // identical fields
    let (title, creator, language, description) = match &docx.core {
        Some(docx_rust::core::Core::CoreNamespace(c)) => (
            c.title.as_deref().map(|s| s.to_string()),
            c.creator.as_deref().map(|s| s.to_string()),
            c.language.as_deref().map(|s| s.to_string()),
            c.description.as_deref().map(|s| s.to_string()),
        ),
        Some(docx_rust::core::Core::CoreNoNamespace(c)) => (
            c.title.as_deref().map(|s| s.to_string()),
            c.creator.as_deref().map(|s| s.to_string()),
            c.language.as_deref().map(|s| s.to_string()),
            c.description.as_deref().map(|s| s.to_string()),
        ),
        None => (None, None, None, None),
    };

    let company = match &docx.app {
        Some(docx_rust::app::App::AppNoApNamespace(a)) => a.company.as_deref().map(|s| s.to_string()),
        Some(docx_rust::app::App::AppWithApNamespace(a)) => {
            a.company.as_deref().map(|s| s.to_string())
        }
        None => None,
    };

    Metadata {
        title: title.filter(|t| !t.trim().is_empty()),
        authors: creator
            .filter(|a| !a.trim().is_empty())
            .map(|a| vec![a])
            .unwrap_or_default(),
        publisher: company.filter(|c| !c.trim().is_empty()),
        language,
        description: description.filter(|d| !d.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_by_mime_or_extension() {
        let by_ext = StreamInfo {
            extension: Some(".docx".to_string()),
            ..StreamInfo::default()
        };
        let by_mime = StreamInfo {
            mime_type: Some(DOCX_MIME.to_string()),
            ..StreamInfo::default()
        };
        assert!(DocxConverter.accepts(b"", &by_ext));
        assert!(DocxConverter.accepts(b"", &by_mime));
        assert!(!DocxConverter.accepts(b"", &StreamInfo::default()));
    }

    #[test]
    fn test_garbage_is_a_conversion_error() {
        let info = StreamInfo {
            extension: Some(".docx".to_string()),
            ..StreamInfo::default()
        };
        let err = DocxConverter
            .convert(b"not a zip", &info, &ConvertOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("DOCX"));
    }
}
