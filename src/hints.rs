use crate::cli::Cli;
use crate::stream_info::StreamInfo;
use encoding_rs::Encoding;
use thiserror::Error;

/// User-facing validation failures. Display text is printed as-is.
#[derive(Debug, Error, PartialEq)]
pub enum HintError {
    #[error("Invalid MIME type: {0}")]
    InvalidMimeType(String),
    #[error("Invalid charset: {0}")]
    InvalidCharset(String),
    #[error("Document Intelligence Endpoint is required when using Document Intelligence.")]
    MissingEndpoint,
    #[error("Filename is required when using Document Intelligence.")]
    MissingFilename,
    #[error("Document Intelligence API key is required (use --docintel-key or set AZURE_API_KEY).")]
    MissingApiKey,
}

/// `"PDF"` -> `".pdf"`; blank -> `None`
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().to_lowercase();
    if ext.is_empty() {
        None
    } else if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{}", ext))
    }
}

pub fn normalize_mime_type(raw: &str) -> Result<Option<String>, HintError> {
    let mime = raw.trim();
    if mime.is_empty() {
        return Ok(None);
    }
    if mime.matches('/').count() != 1 {
        return Err(HintError::InvalidMimeType(mime.to_string()));
    }
    Ok(Some(mime.to_string()))
}

/// Resolve an encoding label to its canonical name
pub fn canonicalize_charset(raw: &str) -> Result<Option<String>, HintError> {
    let label = raw.trim();
    if label.is_empty() {
        return Ok(None);
    }
    Encoding::for_label(label.as_bytes())
        .map(|enc| Some(enc.name().to_string()))
        .ok_or_else(|| HintError::InvalidCharset(label.to_string()))
}

/// Build the hint bundle from the command line.
/// Returns `None` when no hint survives normalization.
pub fn from_cli(cli: &Cli) -> Result<Option<StreamInfo>, HintError> {
    let extension = cli.extension.as_deref().and_then(normalize_extension);
    let mime_type = match cli.mime_type.as_deref() {
        Some(raw) => normalize_mime_type(raw)?,
        None => None,
    };
    let charset = match cli.charset.as_deref() {
        Some(raw) => canonicalize_charset(raw)?,
        None => None,
    };

    if extension.is_none() && mime_type.is_none() && charset.is_none() {
        return Ok(None);
    }

    Ok(Some(StreamInfo {
        extension,
        mime_type,
        charset,
        ..StreamInfo::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_extension_gets_dot_and_lowercase() {
        assert_eq!(normalize_extension(" PDF "), Some(".pdf".to_string()));
        assert_eq!(normalize_extension(".Docx"), Some(".docx".to_string()));
        assert_eq!(normalize_extension("   "), None);
    }

    #[test]
    fn test_mime_type_needs_exactly_one_slash() {
        assert_eq!(
            normalize_mime_type(" text/html "),
            Ok(Some("text/html".to_string()))
        );
        assert_eq!(normalize_mime_type(""), Ok(None));
        assert_eq!(
            normalize_mime_type("not-a-mime"),
            Err(HintError::InvalidMimeType("not-a-mime".to_string()))
        );
        assert!(normalize_mime_type("a/b/c").is_err());
    }

    #[test]
    fn test_charset_canonical_names() {
        assert_eq!(canonicalize_charset("utf8"), Ok(Some("UTF-8".to_string())));
        assert_eq!(
            canonicalize_charset("latin1"),
            Ok(Some("windows-1252".to_string()))
        );
        assert_eq!(canonicalize_charset(" "), Ok(None));
        assert_eq!(
            canonicalize_charset("klingon-8"),
            Err(HintError::InvalidCharset("klingon-8".to_string()))
        );
    }

    #[test]
    fn test_no_hints_means_no_bundle() {
        let cli = Cli::parse_from(["markitdownx", "in.txt", "-x", "  "]);
        assert_eq!(from_cli(&cli), Ok(None));
    }

    #[test]
    fn test_hint_bundle_from_flags() {
        let cli = Cli::parse_from(["markitdownx", "-x", "HTML", "-c", "utf-8"]);
        let hints = from_cli(&cli).unwrap().unwrap();
        assert_eq!(hints.extension.as_deref(), Some(".html"));
        assert_eq!(hints.mime_type, None);
        assert_eq!(hints.charset.as_deref(), Some("UTF-8"));
    }
}
