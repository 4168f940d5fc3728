use crate::converters::{
    csv::CsvConverter, docintel::DocIntelConverter, docx::DocxConverter, epub::EpubConverter,
    html::HtmlConverter, plain_text::PlainTextConverter,
};
use crate::markdown;
use crate::plugin::{self, PluginConverter};
use crate::reader::{ConversionResult, DocumentConverter};
use crate::stream_info::StreamInfo;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub struct ConvertOptions {
    pub keep_data_uris: bool,
}

#[derive(Debug, Default, Clone)]
pub struct EngineConfig {
    pub enable_plugins: bool,
    pub docintel_endpoint: Option<String>,
    pub docintel_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported format: no converter accepts {0}")]
    UnsupportedFormat(String),

    #[error("conversion failed:{}", format_attempts(.attempts))]
    ConversionFailed { attempts: Vec<(String, String)> },
}

fn format_attempts(attempts: &[(String, String)]) -> String {
    attempts
        .iter()
        .map(|(name, message)| format!("\n  - {}: {}", name, message))
        .collect()
}

struct Registration {
    converter: Box<dyn DocumentConverter>,
    priority: f32,
}

/// Routes an input to the first converter that accepts and converts it
pub struct MarkItDown {
    converters: Vec<Registration>,
}

impl MarkItDown {
    /// Engine with built-in converters plus remote/plugin ones per `config`
    pub fn new(config: &EngineConfig) -> Self {
        let mut engine = Self::empty();
        engine.register(Box::new(PlainTextConverter));
        engine.register(Box::new(HtmlConverter));
        engine.register(Box::new(CsvConverter));
        engine.register(Box::new(DocxConverter));
        engine.register(Box::new(EpubConverter));

        if let Some(endpoint) = &config.docintel_endpoint {
            engine.register(Box::new(DocIntelConverter::new(
                endpoint.clone(),
                config.docintel_key.clone().unwrap_or_default(),
            )));
        }

        if config.enable_plugins {
            for found in plugin::discover() {
                debug!(plugin = %found.name, path = %found.path.display(), "enabling plugin");
                engine.register(Box::new(PluginConverter::new(found)));
            }
        }

        debug!(converters = ?engine.converter_names(), "engine ready");
        engine
    }

    /// Engine with no converters registered
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Later registrations are tried before earlier ones of equal priority
    pub fn register(&mut self, converter: Box<dyn DocumentConverter>) {
        let priority = converter.priority();
        self.converters.insert(0, Registration { converter, priority });
        // stable sort keeps the insertion order within a priority
        self.converters
            .sort_by(|a, b| a.priority.total_cmp(&b.priority));
    }

    pub fn converter_names(&self) -> Vec<&str> {
        self.converters.iter().map(|r| r.converter.name()).collect()
    }

    pub fn convert_path(
        &self,
        path: &Path,
        hints: Option<&StreamInfo>,
        options: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        let content = std::fs::read(path)?;
        let mut info = StreamInfo::from_path(path);
        if let Some(hints) = hints {
            info = info.merged_with(hints);
        }
        self.convert_bytes(&content, &info, options)
    }

    pub fn convert_stream<R: Read>(
        &self,
        mut reader: R,
        hints: Option<&StreamInfo>,
        options: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        let info = hints.cloned().unwrap_or_default();
        self.convert_bytes(&content, &info, options)
    }

    pub fn convert_bytes(
        &self,
        content: &[u8],
        info: &StreamInfo,
        options: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        let info = info.guess(content);
        debug!(?info, bytes = content.len(), "converting");

        let mut attempts = Vec::new();
        for registration in &self.converters {
            let converter = &registration.converter;
            if !converter.accepts(content, &info) {
                continue;
            }

            match converter.convert(content, &info, options) {
                Ok(mut result) => {
                    info!(
                        converter = converter.name(),
                        attachments = result.attachments.len(),
                        "converted"
                    );
                    if !options.keep_data_uris {
                        result.markdown = markdown::truncate_data_uris(&result.markdown);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    debug!(converter = converter.name(), error = %err, "converter failed");
                    attempts.push((converter.name().to_string(), err.to_string()));
                }
            }
        }

        if attempts.is_empty() {
            Err(ConvertError::UnsupportedFormat(describe(&info)))
        } else {
            Err(ConvertError::ConversionFailed { attempts })
        }
    }
}

fn describe(info: &StreamInfo) -> String {
    let parts: Vec<String> = [
        info.filename.as_deref().map(|f| format!("filename={}", f)),
        info.extension.as_deref().map(|e| format!("extension={}", e)),
        info.mime_type.as_deref().map(|m| format!("mime_type={}", m)),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "the input (type could not be determined)".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ConverterError, PRIORITY_GENERIC};

    struct Fixed {
        name: &'static str,
        extension: &'static str,
        outcome: Result<&'static str, &'static str>,
        priority: f32,
    }

    impl DocumentConverter for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> f32 {
            self.priority
        }

        fn accepts(&self, _input: &[u8], info: &StreamInfo) -> bool {
            info.has_extension(&[self.extension])
        }

        fn convert(
            &self,
            _input: &[u8],
            _info: &StreamInfo,
            _options: &ConvertOptions,
        ) -> Result<ConversionResult, ConverterError> {
            self.outcome
                .map(ConversionResult::new)
                .map_err(ConverterError::new)
        }
    }

    fn fixed(name: &'static str, outcome: Result<&'static str, &'static str>) -> Box<Fixed> {
        Box::new(Fixed {
            name,
            extension: ".foo",
            outcome,
            priority: 0.0,
        })
    }

    fn foo_info() -> StreamInfo {
        StreamInfo {
            extension: Some(".foo".to_string()),
            ..StreamInfo::default()
        }
    }

    #[test]
    fn test_later_registration_wins_at_equal_priority() {
        let mut engine = MarkItDown::empty();
        engine.register(fixed("first", Ok("first")));
        engine.register(fixed("second", Ok("second")));

        let result = engine
            .convert_bytes(b"x", &foo_info(), &ConvertOptions::default())
            .unwrap();
        assert_eq!(result.markdown, "second");
    }

    #[test]
    fn test_lower_priority_value_runs_first() {
        let mut engine = MarkItDown::empty();
        engine.register(fixed("specific", Ok("specific")));
        engine.register(Box::new(Fixed {
            name: "generic",
            extension: ".foo",
            outcome: Ok("generic"),
            priority: PRIORITY_GENERIC,
        }));

        assert_eq!(engine.converter_names(), vec!["specific", "generic"]);
    }

    #[test]
    fn test_falls_through_failing_converter() {
        let mut engine = MarkItDown::empty();
        engine.register(fixed("good", Ok("ok")));
        engine.register(fixed("bad", Err("boom")));

        let result = engine
            .convert_bytes(b"x", &foo_info(), &ConvertOptions::default())
            .unwrap();
        assert_eq!(result.markdown, "ok");
    }

    #[test]
    fn test_all_failures_are_reported() {
        let mut engine = MarkItDown::empty();
        engine.register(fixed("a", Err("first problem")));
        engine.register(fixed("b", Err("second problem")));

        let err = engine
            .convert_bytes(b"x", &foo_info(), &ConvertOptions::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("a: first problem"));
        assert!(message.contains("b: second problem"));
    }

    #[test]
    fn test_unsupported_when_nobody_accepts() {
        let engine = MarkItDown::empty();
        let err = engine
            .convert_bytes(&[0xff, 0x00], &foo_info(), &ConvertOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("extension=.foo"));
    }

    #[test]
    fn test_data_uris_truncated_unless_kept() {
        let mut engine = MarkItDown::empty();
        engine.register(fixed("img", Ok("![x](data:image/gif;base64,R0lGOD)")));

        let truncated = engine
            .convert_bytes(b"x", &foo_info(), &ConvertOptions::default())
            .unwrap();
        assert_eq!(truncated.markdown, "![x](data:image/gif;base64...)");

        let kept = engine
            .convert_bytes(
                b"x",
                &foo_info(),
                &ConvertOptions {
                    keep_data_uris: true,
                },
            )
            .unwrap();
        assert_eq!(kept.markdown, "![x](data:image/gif;base64,R0lGOD)");
    }

    #[test]
    fn test_builtin_text_from_stream() {
        let engine = MarkItDown::new(&EngineConfig::default());
        let result = engine
            .convert_stream(
                "plain words".as_bytes(),
                None,
                &ConvertOptions::default(),
            )
            .unwrap();
        assert_eq!(result.markdown, "plain words");
    }

    #[test]
    fn test_builtin_html_via_extension_hint() {
        let engine = MarkItDown::new(&EngineConfig::default());
        let hints = StreamInfo {
            extension: Some(".html".to_string()),
            ..StreamInfo::default()
        };
        let result = engine
            .convert_stream(
                "<html><body><h1>Hello</h1></body></html>".as_bytes(),
                Some(&hints),
                &ConvertOptions::default(),
            )
            .unwrap();
        assert!(result.markdown.contains("Hello"));
        assert!(!result.markdown.contains("<h1>"));
    }
}
