use crate::engine::ConvertOptions;
use crate::reader::{ConversionResult, ConverterError, DocumentConverter};
use crate::stream_info::{StreamInfo, DOCX_MIME, PPTX_MIME, XLSX_MIME};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2024-11-30";
const MAX_POLLS: u32 = 120;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const EXTENSIONS: &[&str] = &[
    ".pdf", ".docx", ".pptx", ".xlsx", ".html", ".jpg", ".jpeg", ".png", ".bmp", ".tiff",
    ".heif",
];
const MIME_PREFIXES: &[&str] = &[
    "application/pdf",
    DOCX_MIME,
    PPTX_MIME,
    XLSX_MIME,
    "text/html",
    "image/jpeg",
    "image/png",
    "image/bmp",
    "image/tiff",
    "image/heif",
];

/// Azure Document Intelligence `prebuilt-layout` model with markdown output
pub struct DocIntelConverter {
    endpoint: String,
    api_key: String,
    agent: ureq::Agent,
}

impl DocIntelConverter {
    pub fn new(endpoint: String, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(120))
            .build();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            agent,
        }
    }

    pub fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/prebuilt-layout:analyze?api-version={}&outputContentFormat=markdown",
            self.endpoint, API_VERSION
        )
    }

    fn submit(&self, input: &[u8]) -> Result<String, ConverterError> {
        let response = self
            .agent
            .post(&self.analyze_url())
            .set("Ocp-Apim-Subscription-Key", &self.api_key)
            .set("Content-Type", "application/octet-stream")
            .send_bytes(input)
            .map_err(request_error)?;

        response
            .header("Operation-Location")
            .map(str::to_string)
            .ok_or_else(|| ConverterError::new("Document Intelligence response has no Operation-Location"))
    }

    fn poll(&self, operation_url: &str) -> Result<Value, ConverterError> {
        for attempt in 1..=MAX_POLLS {
            let response = self
                .agent
                .get(operation_url)
                .set("Ocp-Apim-Subscription-Key", &self.api_key)
                .call()
                .map_err(request_error)?;

            let wait = response
                .header("Retry-After")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL);

            let body: Value = response
                .into_json()
                .map_err(|e| ConverterError::new(format!("invalid Document Intelligence response: {}", e)))?;

            match body.get("status").and_then(Value::as_str) {
                Some("succeeded") => return Ok(body),
                Some("failed") => {
                    let detail = body
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .unwrap_or("no detail");
                    return Err(ConverterError::new(format!(
                        "Document Intelligence analysis failed: {}",
                        detail
                    )));
                }
                status => {
                    debug!(attempt, ?status, "Document Intelligence analysis pending");
                    thread::sleep(wait);
                }
            }
        }

        Err(ConverterError::new(format!(
            "Document Intelligence analysis did not finish after {} polls",
            MAX_POLLS
        )))
    }
}

impl DocumentConverter for DocIntelConverter {
    fn name(&self) -> &str {
        "docintel"
    }

    fn accepts(&self, _input: &[u8], info: &StreamInfo) -> bool {
        info.has_extension(EXTENSIONS) || info.has_mime_prefix(MIME_PREFIXES)
    }

    fn convert(
        &self,
        input: &[u8],
        _info: &StreamInfo,
        _options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError> {
        let operation_url = self.submit(input)?;
        let body = self.poll(&operation_url)?;
        let content = body
            .pointer("/analyzeResult/content")
            .and_then(Value::as_str)
            .ok_or_else(|| ConverterError::new("Document Intelligence result has no content"))?;

        Ok(ConversionResult::new(strip_html_comments(content)))
    }
}

fn request_error(err: ureq::Error) -> ConverterError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            ConverterError::new(format!(
                "Document Intelligence returned HTTP {}: {}",
                code,
                body.trim()
            ))
        }
        ureq::Error::Transport(transport) => ConverterError::new(format!(
            "Document Intelligence request failed: {}",
            transport
        )),
    }
}

/// The layout model embeds page markers as HTML comments
pub fn strip_html_comments(content: &str) -> String {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    let comment = COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
    comment.replace_all(content, "").trim().to_string()
}
