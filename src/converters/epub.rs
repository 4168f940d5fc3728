use super::html::html_to_markdown;
use crate::engine::ConvertOptions;
use crate::markdown;
use crate::metadata;
// aliased: rbook's prelude brings its own `Metadata` trait into scope
use crate::reader::{
    Attachments, ConversionResult, ConverterError, DocumentConverter, Metadata as BookMetadata,
};
use crate::stream_info::{StreamInfo, EPUB_MIME};
use rbook::ebook::element::Href;
use rbook::prelude::*;
use rbook::Epub;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

/// EPUB ebooks. Chapters are concatenated; manifest images become
/// `images/<file>` attachments.
pub struct EpubConverter;

impl DocumentConverter for EpubConverter {
    fn name(&self) -> &str {
        "epub"
    }

    fn accepts(&self, _input: &[u8], info: &StreamInfo) -> bool {
        info.has_extension(&[".epub"]) || info.has_mime_prefix(&[EPUB_MIME])
    }

    fn convert(
        &self,
        input: &[u8],
        info: &StreamInfo,
        _options: &ConvertOptions,
    ) -> Result<ConversionResult, ConverterError> {
        // rbook reads from the filesystem; spill streamed input to a temp file
        let spilled;
        let path = match info.local_path.as_deref() {
            Some(path) => path,
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("markitdownx-")
                    .suffix(".epub")
                    .tempfile()?;
                file.write_all(input)?;
                file.flush()?;
                spilled = file;
                spilled.path()
            }
        };

        let book = EpubData::open(path)?;
        book.to_markdown()
    }
}

struct EpubData {
    epub: Epub,
}

struct Chapter {
    /// Absolute container path, e.g. `/OEBPS/Text/ch1.xhtml`
    href: String,
    html: String,
}

struct ImageResource {
    href: String,
    data: Vec<u8>,
}

impl EpubData {
    fn open(path: &Path) -> Result<Self, ConverterError> {
        let epub = Epub::options()
            .strict(false)
            .open(path)
            .map_err(|e| ConverterError::new(format!("failed to open EPUB: {}", e)))?;
        Ok(Self { epub })
    }

    fn to_markdown(&self) -> Result<ConversionResult, ConverterError> {
        let mut attachments = Attachments::new();
        let mut image_names = HashMap::new();
        for image in self.images()? {
            let name = unique_image_name(&image.href, &attachments);
            image_names.insert(image.href, name.clone());
            attachments.insert(name, image.data);
        }

        let mut chapters = Vec::new();
        for chapter in self.chapters()? {
            let html = link_images(&chapter.html, &chapter.href, &image_names);
            let md = markdown::clean_markdown(&html_to_markdown(&html));
            if !md.is_empty() {
                chapters.push(md);
            }
        }

        let meta = self.metadata();
        let mut content = metadata::format_metadata(&meta);
        content.push_str(&chapters.join("\n---\n\n"));

        Ok(ConversionResult {
            title: meta
                .title
                .or_else(|| chapters.first().and_then(|c| markdown::extract_title(c))),
            markdown: markdown::clean_markdown(&content),
            attachments,
        })
    }

    /// Spine documents in reading order, as raw XHTML
    fn chapters(&self) -> Result<Vec<Chapter>, ConverterError> {
        let mut chapters = Vec::new();
        let mut reader = self.epub.reader();

        while let Some(result) = reader.read_next() {
            let data = result
                .map_err(|e| ConverterError::new(format!("failed to read chapter: {}", e)))?;
            let html_content = data.content().to_string();

            if html_content.trim().is_empty() {
                continue;
            }
            chapters.push(Chapter {
                href: data.manifest_entry().href().decode().into_owned(),
                html: html_content,
            });
        }

        Ok(chapters)
    }

    fn images(&self) -> Result<Vec<ImageResource>, ConverterError> {
        let mut images = Vec::new();
        for entry in self.epub.manifest().images() {
            let href = entry.href().decode().into_owned();

            let data = entry
                .read_bytes()
                .map_err(|e| ConverterError::new(format!("failed to read image {}: {}", href, e)))?;

            images.push(ImageResource { href, data });
        }

        Ok(images)
    }

    fn metadata(&self) -> BookMetadata {
        let epub_meta = self.epub.metadata();
        BookMetadata {
            title: epub_meta.title().map(|t| t.value().to_string()),
            authors: epub_meta
                .creators()
                .map(|creator| creator.value().to_string())
                .collect(),
            publisher: epub_meta.publishers().next().map(|p| p.value().to_string()),
            language: epub_meta.languages().next().map(|l| l.value().to_string()),
            description: epub_meta
                .descriptions()
                .next()
                .map(|d| d.value().to_string()),
        }
    }
}

/// `OEBPS/Images/fig.png` -> `images/fig.png`, numbered on collision
fn unique_image_name(href: &str, taken: &Attachments) -> String {
    let filename = Path::new(href)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "image.bin".to_string());

    let mut name = format!("images/{}", filename);
    let mut n = 1;
    while taken.contains_key(&name) {
        n += 1;
        name = format!("images/{}-{}", n, filename);
    }
    name
}

fn resource_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // src="..." / href='...' / xlink:href="..."
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b((?:xlink:)?(?:src|href))\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("valid regex")
    })
}

/// Point every `src`/`href` that resolves to a manifest image at the
/// image's attachment name. `images` is keyed by absolute container path.
fn link_images(html: &str, chapter_href: &str, images: &HashMap<String, String>) -> String {
    if images.is_empty() {
        return html.to_string();
    }

    resource_ref_pattern()
        .replace_all(html, |caps: &Captures| {
            let target = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            match resolve_href(chapter_href, target).and_then(|path| images.get(&path)) {
                Some(name) => format!("{}=\"{}\"", &caps[1], name),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Resolve a reference found in the document at `base` to an absolute
/// container path. External and `data:` URIs resolve to nothing.
fn resolve_href(base: &str, target: &str) -> Option<String> {
    let target = target.split(['#', '?']).next().unwrap_or_default().trim();
    if target.is_empty() || target.contains(':') {
        return None;
    }

    let target = Href::from(target).decode();
    let joined = if target.starts_with('/') {
        target.into_owned()
    } else {
        let dir = base.rsplit_once('/').map_or("", |(dir, _)| dir);
        format!("{}/{}", dir, target)
    };

    let mut parts = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    Some(format!("/{}", parts.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_names_are_flattened() {
        let taken = Attachments::new();
        assert_eq!(
            unique_image_name("OEBPS/Images/fig.png", &taken),
            "images/fig.png"
        );
    }

    #[test]
    fn test_image_name_collisions_numbered() {
        let mut taken = Attachments::new();
        taken.insert("images/fig.png".to_string(), Vec::new());
        taken.insert("images/2-fig.png".to_string(), Vec::new());
        assert_eq!(
            unique_image_name("chapter2/fig.png", &taken),
            "images/3-fig.png"
        );
    }

    #[test]
    fn test_resolve_relative_to_chapter() {
        let chapter = "/OEBPS/Text/ch1.xhtml";
        assert_eq!(
            resolve_href(chapter, "../Images/fig.png").as_deref(),
            Some("/OEBPS/Images/fig.png")
        );
        assert_eq!(
            resolve_href(chapter, "./fig%20one.png#top").as_deref(),
            Some("/OEBPS/Text/fig one.png")
        );
        assert_eq!(
            resolve_href(chapter, "/cover.jpg").as_deref(),
            Some("/cover.jpg")
        );
        assert_eq!(resolve_href(chapter, "https://example.com/a.png"), None);
        assert_eq!(resolve_href(chapter, "data:image/png;base64,AAAA"), None);
        assert_eq!(resolve_href(chapter, "#note-1"), None);
    }

    #[test]
    fn test_chapter_image_refs_point_at_attachments() {
        let images = HashMap::from([(
            "/OEBPS/Images/fig.png".to_string(),
            "images/fig.png".to_string(),
        )]);
        let html = r#"<img src="../Images/fig.png" alt="fig"/><a href='../Images/fig.png'>full</a><img src="../Images/other.png"/><a href="ch2.xhtml">next</a>"#;

        assert_eq!(
            link_images(html, "/OEBPS/Text/ch1.xhtml", &images),
            r#"<img src="images/fig.png" alt="fig"/><a href="images/fig.png">full</a><img src="../Images/other.png"/><a href="ch2.xhtml">next</a>"#
        );
    }

    #[test]
    fn test_invalid_epub_stream_fails() {
        let info = StreamInfo {
            mime_type: Some(EPUB_MIME.to_string()),
            ..StreamInfo::default()
        };
        assert!(EpubConverter
            .convert(b"definitely not a zip", &info, &ConvertOptions::default())
            .is_err());
    }
}
