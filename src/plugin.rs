use crate::engine::ConvertOptions;
use crate::reader::{ConversionResult, ConverterError, DocumentConverter};
use crate::stream_info::StreamInfo;
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use tracing::debug;

pub const PLUGIN_PREFIX: &str = "markitdownx-plugin-";

#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub name: String,
    pub path: PathBuf,
}

/// Plugins on `PATH`, sorted by name. The first directory wins on duplicates.
pub fn discover() -> Vec<Plugin> {
    let dirs: Vec<PathBuf> = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default();
    discover_in(&dirs)
}

pub fn discover_in(dirs: &[PathBuf]) -> Vec<Plugin> {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();

    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = plugin_name(&path) else {
                continue;
            };
            if is_executable(&path) {
                found.entry(name).or_insert(path);
            }
        }
    }

    found
        .into_iter()
        .map(|(name, path)| Plugin { name, path })
        .collect()
}

fn plugin_name(path: &Path) -> Option<String> {
    let file_name = if cfg!(windows) {
        path.file_stem()?
    } else {
        path.file_name()?
    };
    let name = file_name.to_str()?.strip_prefix(PLUGIN_PREFIX)?;
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

/// Text printed by `--list-plugins`
pub fn format_listing(plugins: &[Plugin]) -> String {
    let mut out = String::from("Installed markitdownx plugins:\n\n");
    if plugins.is_empty() {
        out.push_str("  * No plugins installed.\n");
        out.push_str(&format!(
            "\nPlugins are executables on PATH named {}<name>.\n",
            PLUGIN_PREFIX
        ));
    } else {
        for plugin in plugins {
            out.push_str(&format!(
                "  * {:<16}\t(path: {})\n",
                plugin.name,
                plugin.path.display()
            ));
        }
        out.push_str("\nUse the -p (or --use-plugins) option to enable plugins.\n");
    }
    out
}

/// A converter backed by an executable on `PATH` named
/// `markitdownx-plugin-<name>`. The plugin reads the document on stdin and
/// gets the known hints as `--extension`, `--mime-type`, `--charset` and
/// `--filename` flags.
///
/// - With an extra `--accepts` flag it answers through its exit status:
///   0 means it can convert the input.
/// - Without it, exit status 0 means stdout holds the markdown.
pub struct PluginConverter {
    plugin: Plugin,
}

impl PluginConverter {
    pub fn new(plugin: Plugin) -> Self {
        Self { plugin }
    }

    fn run(&self, input: &[u8], info: &StreamInfo, accepts: bool) -> io::Result<Output> {
        let mut args: Vec<OsString> = Vec::new();
        if accepts {
            args.push("--accepts".into());
        }
        let hints = [
            ("--extension", info.extension.as_deref()),
            ("--mime-type", info.mime_type.as_deref()),
            ("--charset", info.charset.as_deref()),
            ("--filename", info.filename.as_deref()),
        ];
        for (flag, value) in hints {
            if let Some(value) = value {
                args.push(flag.into());
                args.push(value.into());
            }
        }

        let mut child = Command::new(&self.plugin.path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // feed stdin from a thread so a plugin that writes before it
        // finishes reading cannot deadlock on a full pipe
        let writer = child.stdin.take().map(|mut stdin| {
            let data = input.to_vec();
            thread::spawn(move || {
                // the plugin may exit without reading everything
                let _ = stdin.write_all(&data);
            })
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }
        Ok(output)
    }
}

impl DocumentConverter for PluginConverter {
    fn name(&self) -> &str {
        &self.plugin.name
    }

    fn accepts(&self, input: &[u8], info: &StreamInfo) -> bool {
        match self.run(input, info, true) {
            Ok(output) => output.status.success(),
            Err(err) => {
                debug!(plugin = %self.plugin.name, error = %err, "plugin could not be started");
                false
            }
        }
    }

    fn convert(
        &self,
        input: &[u8],
        info: &StreamInfo,
        _options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError> {
        let output = self.run(input, info, false)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConverterError::new(format!(
                "plugin exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(ConversionResult::new(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_listing_without_plugins() {
        let listing = format_listing(&[]);
        assert!(listing.starts_with("Installed markitdownx plugins:"));
        assert!(listing.contains("No plugins installed."));
    }

    #[test]
    fn test_listing_with_plugins() {
        let listing = format_listing(&[Plugin {
            name: "rtf".to_string(),
            path: PathBuf::from("/usr/local/bin/markitdownx-plugin-rtf"),
        }]);
        assert!(listing.contains("  * rtf             \t(path: /usr/local/bin/markitdownx-plugin-rtf)"));
        assert!(listing.contains("--use-plugins"));
    }

    #[test]
    fn test_missing_dirs_are_skipped() {
        let plugins = discover_in(&[PathBuf::from("/definitely/not/here")]);
        assert!(plugins.is_empty());
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_discovery_requires_prefix_and_exec_bit() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "markitdownx-plugin-rtf", "exit 0");
        write_script(dir.path(), "unrelated-tool", "exit 0");
        std::fs::write(dir.path().join("markitdownx-plugin-noexec"), "x").unwrap();

        let plugins = discover_in(&[dir.path().to_path_buf()]);
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "rtf");
    }

    #[cfg(unix)]
    #[test]
    fn test_plugin_accepts_and_converts() {
        let dir = TempDir::new().unwrap();
        let script = r#"
case "$1" in
  --accepts)
    [ "$3" = ".rtf" ] && exit 0
    exit 1
    ;;
esac
printf '# From plugin\n'
cat
"#;
        let path = write_script(dir.path(), "markitdownx-plugin-rtf", script);
        let converter = PluginConverter::new(Plugin {
            name: "rtf".to_string(),
            path,
        });

        let rtf = StreamInfo {
            extension: Some(".rtf".to_string()),
            ..StreamInfo::default()
        };
        let txt = StreamInfo {
            extension: Some(".txt".to_string()),
            ..StreamInfo::default()
        };
        assert!(converter.accepts(b"body", &rtf));
        assert!(!converter.accepts(b"body", &txt));

        let result = converter
            .convert(b"body", &rtf, &ConvertOptions::default())
            .unwrap();
        assert_eq!(result.markdown, "# From plugin\nbody");
    }

    #[cfg(unix)]
    #[test]
    fn test_plugin_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let path = write_script(dir.path(), "markitdownx-plugin-bad", "echo broken >&2; exit 3");
        let converter = PluginConverter::new(Plugin {
            name: "bad".to_string(),
            path,
        });

        let err = converter
            .convert(b"", &StreamInfo::default(), &ConvertOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
