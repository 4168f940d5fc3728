use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write markdown verbatim, creating parent directories as needed
pub fn write_file(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(path, markdown)
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

/// Print markdown plus a trailing newline. A closed pipe (`| head`) is not an error.
pub fn write_stream<W: Write>(mut out: W, markdown: &str) -> Result<()> {
    let written = writeln!(out, "{}", markdown).and_then(|_| out.flush());
    match written {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("Failed to write to stdout"),
    }
}
