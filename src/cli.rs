use clap::{ArgAction, Parser};
use std::path::PathBuf;

const AFTER_HELP: &str = "\
EXAMPLES:
    markitdownx example.docx
    cat example.docx | markitdownx
    markitdownx < example.docx
    markitdownx example.docx -o example.md
    markitdownx example.docx > example.md

Attachments (images, media) are saved to <stem>_assets/ next to the output.";

/// Convert various file formats to Markdown
#[derive(Parser, Debug)]
#[command(
    name = "markitdownx",
    version,
    about,
    after_help = AFTER_HELP,
    disable_version_flag = true
)]
pub struct Cli {
    /// Input file. If omitted, the input is read from stdin.
    pub input: Option<PathBuf>,

    /// Show the version number and exit
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Output file name. If not provided, output is written to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hint about the file extension (e.g., when reading from stdin)
    #[arg(short = 'x', long)]
    pub extension: Option<String>,

    /// Hint about the file's MIME type
    #[arg(short, long)]
    pub mime_type: Option<String>,

    /// Hint about the file's charset (e.g., UTF-8)
    #[arg(short, long)]
    pub charset: Option<String>,

    /// Use Document Intelligence instead of offline conversion.
    /// Requires a valid Document Intelligence endpoint.
    #[arg(short = 'd', long, default_value_t = false)]
    pub use_docintel: bool,

    /// Document Intelligence endpoint. Required if using Document Intelligence.
    #[arg(short, long, env = "MARKITDOWNX_DOCINTEL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Document Intelligence API key
    #[arg(long, env = "AZURE_API_KEY", hide_env_values = true)]
    pub docintel_key: Option<String>,

    /// Use plugins to convert files. Use --list-plugins to see installed plugins.
    #[arg(short = 'p', long, default_value_t = false)]
    pub use_plugins: bool,

    /// List installed plugins (markitdownx-plugin-* executables on PATH)
    #[arg(long, default_value_t = false)]
    pub list_plugins: bool,

    /// Keep data URIs (like base64-encoded images) in the output.
    /// By default, data URIs are truncated.
    #[arg(long, default_value_t = false)]
    pub keep_data_uris: bool,

    /// Log debug details to stderr
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdin_when_no_filename() {
        let cli = Cli::parse_from(["markitdownx"]);
        assert!(cli.input.is_none());
        assert!(cli.output.is_none());
        assert!(!cli.keep_data_uris);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from([
            "markitdownx",
            "doc.docx",
            "-o",
            "out.md",
            "-x",
            "docx",
            "-m",
            "application/zip",
            "-c",
            "utf-8",
            "-p",
        ]);
        assert_eq!(cli.input, Some(PathBuf::from("doc.docx")));
        assert_eq!(cli.output, Some(PathBuf::from("out.md")));
        assert_eq!(cli.extension.as_deref(), Some("docx"));
        assert_eq!(cli.mime_type.as_deref(), Some("application/zip"));
        assert_eq!(cli.charset.as_deref(), Some("utf-8"));
        assert!(cli.use_plugins);
    }

    #[test]
    fn test_lowercase_v_is_version() {
        let err = Cli::try_parse_from(["markitdownx", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
