use crate::assets;
use crate::cli::Cli;
use crate::engine::{ConvertOptions, EngineConfig, MarkItDown};
use crate::hints::{self, HintError};
use crate::output;
use crate::plugin;
use crate::stream_info::StreamInfo;
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Validate the command line, convert, save attachments, emit markdown
pub fn run<R: Read, W: Write>(cli: &Cli, stdin: R, mut stdout: W) -> Result<()> {
    let hints = hints::from_cli(cli)?;

    if cli.list_plugins {
        let listing = plugin::format_listing(&plugin::discover());
        stdout.write_all(listing.as_bytes())?;
        return Ok(());
    }

    let config = engine_config(cli)?;
    let engine = MarkItDown::new(&config);
    convert_with(cli, hints.as_ref(), &engine, stdin, stdout)
}

fn engine_config(cli: &Cli) -> Result<EngineConfig, HintError> {
    let mut config = EngineConfig {
        enable_plugins: cli.use_plugins,
        ..EngineConfig::default()
    };

    if cli.use_docintel {
        let endpoint = cli.endpoint.clone().ok_or(HintError::MissingEndpoint)?;
        if cli.input.is_none() {
            return Err(HintError::MissingFilename);
        }
        let key = cli.docintel_key.clone().ok_or(HintError::MissingApiKey)?;
        config.docintel_endpoint = Some(endpoint);
        config.docintel_key = Some(key);
    }

    Ok(config)
}

pub fn convert_with<R: Read, W: Write>(
    cli: &Cli,
    hints: Option<&StreamInfo>,
    engine: &MarkItDown,
    stdin: R,
    stdout: W,
) -> Result<()> {
    let options = ConvertOptions {
        keep_data_uris: cli.keep_data_uris,
    };

    let result = match &cli.input {
        Some(path) => engine
            .convert_path(path, hints, &options)
            .with_context(|| format!("Failed to convert {}", path.display()))?,
        None => engine
            .convert_stream(stdin, hints, &options)
            .context("Failed to convert standard input")?,
    };

    if let Some(title) = &result.title {
        info!(%title, "document title");
    }

    let base_dir = cli
        .output
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let dir_name = assets::assets_dir_name(cli.output.as_deref(), cli.input.as_deref());
    let markdown = assets::materialize(&result.attachments, &result.markdown, base_dir, &dir_name)
        .context("Failed to save attachments")?;

    if !result.attachments.is_empty() {
        info!(
            count = result.attachments.len(),
            dir = %base_dir.join(&dir_name).display(),
            "saved attachments"
        );
    }

    match &cli.output {
        Some(path) => {
            output::write_file(path, &markdown)?;
            info!(output = %path.display(), "wrote markdown");
            Ok(())
        }
        None => output::write_stream(stdout, &markdown),
    }
}
