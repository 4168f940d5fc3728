use crate::reader::Metadata;

/// Markdown header block for document metadata; empty when nothing is known
pub fn format_metadata(meta: &Metadata) -> String {
    let mut lines = Vec::new();

    if let Some(ref title) = meta.title {
        lines.push(format!("# {}", title));
        lines.push(String::new());
    }

    if !meta.authors.is_empty() {
        lines.push(format!("**Author:** {}", meta.authors.join(", ")));
    }

    if let Some(ref publisher) = meta.publisher {
        lines.push(format!("**Publisher:** {}", publisher));
    }

    if let Some(ref language) = meta.language {
        lines.push(format!("**Language:** {}", language));
    }

    if let Some(ref description) = meta.description {
        lines.push(String::new());
        lines.push(format!("> {}", description));
    }

    if lines.is_empty() {
        return String::new();
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n") + "\n"
}
