use regex::Regex;
use std::sync::OnceLock;

pub fn clean_markdown(md: &str) -> String {
    let mut result = md.to_string();

    // Collapse 3+ consecutive blank lines to 2
    while result.contains("\n\n\n") {
        result = result.replace("\n\n\n", "\n\n");
    }

    result = result
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    let trimmed = result.trim_end().to_string();
    if trimmed.is_empty() {
        String::new()
    } else {
        trimmed + "\n"
    }
}

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ](data:<mime>[;params],<payload>)
    PATTERN.get_or_init(|| Regex::new(r"\]\(\s*(data:[^,)\s]*),[^)\s]*").expect("valid regex"))
}

/// Drop the payload of every `data:` link target, keeping the media type
/// and parameters: `data:image/png;base64...`
pub fn truncate_data_uris(md: &str) -> String {
    data_uri_pattern().replace_all(md, "](${1}...").into_owned()
}

/// First `# ` heading, used as a title fallback
pub fn extract_title(md: &str) -> Option<String> {
    md.lines()
        .filter_map(|line| line.trim().strip_prefix("# "))
        .map(str::trim)
        .find(|title| !title.is_empty())
        .map(str::to_string)
}
