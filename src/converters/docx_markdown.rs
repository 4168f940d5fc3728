use docx_rust::document::{
    BodyContent, ParagraphContent, RunContent, TableCellContent, TableRowContent,
};
use docx_rust::formatting::CharacterProperty;
use docx_rust::Docx;
use std::collections::HashMap;

/// Attachment name for a media part: `word/media/image1.png` -> `media/image1.png`
pub fn media_name(part: &str) -> String {
    let part = part.trim_start_matches('/');
    part.strip_prefix("word/").unwrap_or(part).to_string()
}

/// Convert a parsed DOCX document body to markdown.
/// Images are referenced by their [`media_name`].
pub fn docx_to_markdown(docx: &Docx) -> String {
    let mut ctx = ConvertContext {
        docx,
        output: String::new(),
        list_counters: HashMap::new(),
    };

    for content in &docx.document.body.content {
        ctx.convert_body_content(content);
    }

    ctx.output
}

struct ConvertContext<'a> {
    docx: &'a Docx<'a>,
    output: String,
    /// (num_id, level) -> items emitted so far
    list_counters: HashMap<(isize, isize), usize>,
}

impl<'a> ConvertContext<'a> {
    fn convert_body_content(&mut self, content: &BodyContent) {
        match content {
            BodyContent::Paragraph(para) => self.convert_paragraph(para),
            BodyContent::Table(table) => self.convert_table(table),
            BodyContent::Sdt(sdt) => {
                if let Some(ref sdt_content) = sdt.content {
                    for item in &sdt_content.content {
                        self.convert_body_content(item);
                    }
                }
            }
            _ => {}
        }
    }

    fn convert_paragraph(&mut self, para: &docx_rust::document::Paragraph) {
        let mut heading_level: Option<usize> = None;
        let mut numbering: Option<(isize, isize)> = None;

        if let Some(ref prop) = para.property {
            if let Some(ref style_id) = prop.style_id {
                heading_level = heading_level_for_style(style_id.value.as_ref());
            }

            if let Some(ref num_prop) = prop.numbering {
                if let (Some(ref id), Some(ref level)) = (&num_prop.id, &num_prop.level) {
                    numbering = Some((id.value, level.value));
                }
            }
        }

        let inline_md = self.collect_inline_content(para);
        let text = inline_md.trim();

        if text.is_empty() {
            if heading_level.is_none() && numbering.is_none() {
                self.output.push('\n');
            }
            return;
        }

        if let Some(level) = heading_level {
            self.output.push_str(&"#".repeat(level));
            self.output.push(' ');
            self.output.push_str(text);
            self.output.push_str("\n\n");
            return;
        }

        if let Some((num_id, level)) = numbering {
            let indent = "  ".repeat(level.max(0) as usize);
            let bullet = self.resolve_list_bullet(num_id, level);
            self.output.push_str(&indent);
            self.output.push_str(&bullet);
            self.output.push(' ');
            self.output.push_str(text);
            self.output.push('\n');
            return;
        }

        self.output.push_str(text);
        self.output.push_str("\n\n");
    }

    fn collect_inline_content(&mut self, para: &docx_rust::document::Paragraph) -> String {
        let mut result = String::new();

        for pc in &para.content {
            match pc {
                ParagraphContent::Run(run) => {
                    let text = self.collect_run_text(run);
                    if !text.is_empty() {
                        result.push_str(&format_run_text(&text, &run.property));
                    }
                }
                ParagraphContent::Link(link) => {
                    let display_text = link
                        .content
                        .as_ref()
                        .map(|run| self.collect_run_text(run))
                        .unwrap_or_default();

                    match self.resolve_hyperlink_target(link) {
                        Some(url) if !display_text.is_empty() => {
                            result.push_str(&format!("[{}]({})", display_text, url));
                        }
                        Some(url) => result.push_str(&format!("<{}>", url)),
                        None => result.push_str(&display_text),
                    }
                }
                _ => {}
            }
        }

        result
    }

    fn collect_run_text(&mut self, run: &docx_rust::document::Run) -> String {
        let mut text = String::new();

        for rc in &run.content {
            match rc {
                RunContent::Text(t) => text.push_str(&t.text),
                RunContent::Break(_) => text.push_str("  \n"),
                RunContent::Tab(_) => text.push('\t'),
                RunContent::Drawing(drawing) => {
                    if let Some(md) = self.convert_drawing(drawing) {
                        text.push_str(&md);
                    }
                }
                _ => {}
            }
        }

        text
    }

    fn convert_drawing(&self, drawing: &docx_rust::document::Drawing) -> Option<String> {
        if let Some(ref inline) = drawing.inline {
            if let Some(ref graphic) = inline.graphic {
                if let Some(pic) = graphic.data.children.first() {
                    let alt = inline.doc_property.descr.as_deref().unwrap_or("");
                    return self.image_reference(pic.fill.blip.embed.as_ref(), alt);
                }
            }
        }

        // floating images
        if let Some(ref anchor) = drawing.anchor {
            if let Some(ref graphic) = anchor.graphic {
                if let Some(pic) = graphic.data.children.first() {
                    let alt = anchor.doc_property.descr.as_deref().unwrap_or("");
                    return self.image_reference(pic.fill.blip.embed.as_ref(), alt);
                }
            }
        }

        None
    }

    fn image_reference(&self, embed_id: &str, alt: &str) -> Option<String> {
        let target = self.relationship_target(embed_id)?;
        let alt = alt.replace(['[', ']'], "");
        Some(format!("![{}]({})", alt, media_name(&target)))
    }

    fn relationship_target(&self, id: &str) -> Option<String> {
        self.docx
            .document_rels
            .as_ref()?
            .relationships
            .iter()
            .find(|r| r.id.as_ref() == id)
            .map(|r| r.target.to_string())
    }

    fn resolve_hyperlink_target(&self, link: &docx_rust::document::Hyperlink) -> Option<String> {
        if let Some(ref anchor) = link.anchor {
            return Some(format!("#{}", anchor));
        }

        link.id
            .as_ref()
            .and_then(|id| self.relationship_target(id.as_ref()))
    }

    fn resolve_list_bullet(&mut self, num_id: isize, level: isize) -> String {
        let ordered = self.number_format(num_id, level).is_some_and(|fmt| {
            matches!(
                fmt.as_str(),
                "decimal" | "upperRoman" | "lowerRoman" | "upperLetter" | "lowerLetter"
            )
        });

        if !ordered {
            return "-".to_string();
        }

        // a new item at this level restarts numbering of deeper levels
        self.list_counters
            .retain(|&(id, lvl), _| id != num_id || lvl <= level);
        let counter = self.list_counters.entry((num_id, level)).or_insert(0);
        *counter += 1;
        format!("{}.", counter)
    }

    fn number_format(&self, num_id: isize, level: isize) -> Option<String> {
        let numbering = self.docx.numbering.as_ref()?;
        let abstract_id = numbering
            .numberings
            .iter()
            .find(|num| num.num_id == Some(num_id))?
            .abstract_num_id
            .as_ref()?
            .value;

        numbering
            .abstract_numberings
            .iter()
            .filter(|abs| abs.abstract_num_id == abstract_id)
            .flat_map(|abs| abs.levels.iter())
            .find(|lvl| lvl.i_level == Some(level))?
            .number_format
            .as_ref()
            .map(|fmt| fmt.value.to_string())
    }

    fn convert_table(&mut self, table: &docx_rust::document::Table) {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for row in &table.rows {
            let cells: Vec<String> = row
                .cells
                .iter()
                .filter_map(|cell_content| match cell_content {
                    TableRowContent::TableCell(cell) => Some(self.collect_cell_text(cell)),
                    _ => None,
                })
                .collect();

            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if col_count == 0 {
            return;
        }

        for (i, row) in rows.iter().enumerate() {
            self.output.push('|');
            for j in 0..col_count {
                self.output.push(' ');
                self.output.push_str(row.get(j).map(String::as_str).unwrap_or(""));
                self.output.push_str(" |");
            }
            self.output.push('\n');

            if i == 0 {
                self.output.push('|');
                for _ in 0..col_count {
                    self.output.push_str(" --- |");
                }
                self.output.push('\n');
            }
        }
        self.output.push('\n');
    }

    fn collect_cell_text(&mut self, cell: &docx_rust::document::TableCell) -> String {
        let mut parts: Vec<String> = Vec::new();

        for tc in &cell.content {
            let TableCellContent::Paragraph(para) = tc;
            let text = self.collect_inline_content(para);
            let trimmed = text.trim().replace('|', "\\|").replace('\n', " ");
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }

        parts.join("<br>")
    }
}

/// `Heading3` / `heading 3` -> 3, `Title` -> 1, `Subtitle` -> 2
pub fn heading_level_for_style(style_id: &str) -> Option<usize> {
    let normalized = style_id.to_lowercase().replace(' ', "");
    match normalized.as_str() {
        "title" => Some(1),
        "subtitle" => Some(2),
        _ => normalized
            .strip_prefix("heading")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| (1..=6).contains(n)),
    }
}

fn format_run_text(text: &str, props: &Option<CharacterProperty>) -> String {
    let Some(props) = props else {
        return text.to_string();
    };

    if text.trim().is_empty() {
        return text.to_string();
    }

    let is_bold = props
        .bold
        .as_ref()
        .is_some_and(|b| b.value != Some(false));
    let is_italic = props
        .italics
        .as_ref()
        .is_some_and(|i| i.value != Some(false));
    let is_strike = props.strike.is_some() || props.dstrike.is_some();

    // emphasis markers must hug the text, so surrounding spaces stay outside
    let leading = &text[..text.len() - text.trim_start().len()];
    let trailing = &text[text.trim_end().len()..];
    let mut result = text.trim().to_string();

    if is_strike {
        result = format!("~~{}~~", result);
    }
    if is_bold && is_italic {
        result = format!("***{}***", result);
    } else if is_bold {
        result = format!("**{}**", result);
    } else if is_italic {
        result = format!("*{}*", result);
    }

    format!("{}{}{}", leading, result, trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_levels() {
        assert_eq!(heading_level_for_style("Heading1"), Some(1));
        assert_eq!(heading_level_for_style("heading 4"), Some(4));
        assert_eq!(heading_level_for_style("Title"), Some(1));
        assert_eq!(heading_level_for_style("Subtitle"), Some(2));
        assert_eq!(heading_level_for_style("Heading9"), None);
        assert_eq!(heading_level_for_style("BodyText"), None);
    }

    #[test]
    fn test_media_name_strips_word_prefix() {
        assert_eq!(media_name("word/media/image1.png"), "media/image1.png");
        assert_eq!(media_name("/word/media/image2.jpeg"), "media/image2.jpeg");
        assert_eq!(media_name("media/image3.gif"), "media/image3.gif");
    }

    #[test]
    fn test_plain_run_untouched() {
        assert_eq!(format_run_text("plain", &None), "plain");
    }
}
