use crate::reader::Attachments;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("attachment name {0:?} would escape the assets directory")]
    UnsafeName(String),

    #[error("failed to write attachment {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build attachment pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// `<stem>_assets` for the output file, else the input file, else stdin
pub fn assets_dir_name(output: Option<&Path>, input: Option<&Path>) -> String {
    let stem = output
        .or(input)
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    format!("{}_assets", stem)
}

/// Write every attachment under `base_dir/dir_name/` and return `markdown`
/// with each attachment name replaced by `dir_name/<name>`.
pub fn materialize(
    attachments: &Attachments,
    markdown: &str,
    base_dir: &Path,
    dir_name: &str,
) -> Result<String, AssetError> {
    if attachments.is_empty() {
        return Ok(markdown.to_string());
    }

    // every name is checked before anything touches the disk
    let planned = attachments
        .iter()
        .map(|(name, data)| Ok((name.as_str(), safe_relative_path(name)?, data)))
        .collect::<Result<Vec<_>, AssetError>>()?;

    let assets_dir = base_dir.join(dir_name);
    let mut links = HashMap::new();

    for (name, relative, data) in planned {
        let path = assets_dir.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| AssetError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, data).map_err(|source| AssetError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(attachment = %name, path = %path.display(), bytes = data.len(), "saved attachment");

        links.insert(name, link_path(dir_name, &relative));
    }

    replace_names(markdown, &links)
}

fn safe_relative_path(name: &str) -> Result<PathBuf, AssetError> {
    let path = Path::new(name);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(AssetError::UnsafeName(name.to_string())),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(AssetError::UnsafeName(name.to_string()));
    }
    Ok(relative)
}

/// Markdown links always use forward slashes
fn link_path(dir_name: &str, relative: &Path) -> String {
    let mut link = dir_name.to_string();
    for part in relative.iter() {
        link.push('/');
        link.push_str(&part.to_string_lossy());
    }
    link
}

/// Single left-to-right pass, longest name first at each position, so an
/// inserted path is never rewritten again
fn replace_names(markdown: &str, links: &HashMap<&str, String>) -> Result<String, AssetError> {
    let mut names: Vec<&str> = links.keys().copied().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let pattern = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&pattern)?;

    Ok(re
        .replace_all(markdown, |caps: &regex::Captures| {
            links
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned())
}
