use crate::engine::ConvertOptions;
use crate::stream_info::StreamInfo;
use std::collections::BTreeMap;
use thiserror::Error;

/// Named binary blobs produced alongside the markdown (images, media parts)
pub type Attachments = BTreeMap<String, Vec<u8>>;

/// Output of a single successful conversion
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConversionResult {
    pub markdown: String,
    pub title: Option<String>,
    /// Attachment name -> content. Names appear verbatim in `markdown`.
    pub attachments: Attachments,
}

impl ConversionResult {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            ..Self::default()
        }
    }
}

/// Shared metadata representation across all input formats
#[derive(Debug, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConverterError(pub String);

impl ConverterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::io::Error> for ConverterError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

/// Format-specific converters. Remote and plugin converters share this
/// priority and shadow built-ins by registering later.
pub const PRIORITY_SPECIFIC: f32 = 0.0;
/// Catch-all converters such as plain text.
pub const PRIORITY_GENERIC: f32 = 10.0;

/// A single input format handled by the engine (HTML, DOCX, EPUB, ...)
pub trait DocumentConverter {
    /// Short name used in logs and error reports
    fn name(&self) -> &str;

    fn priority(&self) -> f32 {
        PRIORITY_SPECIFIC
    }

    /// Quick check on the stream metadata (and, if needed, the bytes)
    fn accepts(&self, input: &[u8], info: &StreamInfo) -> bool;

    fn convert(
        &self,
        input: &[u8],
        info: &StreamInfo,
        options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError>;
}
