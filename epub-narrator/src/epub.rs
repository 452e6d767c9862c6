// EPUB reading: content items in reading order, and markup to plain text

use anyhow::{Context, Result, anyhow};
use epub::doc::EpubDoc;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Media types of items that carry readable document content
const DOCUMENT_MEDIA_TYPES: &[&str] = &["application/xhtml+xml", "text/html"];

/// Wrap width handed to html2text; lines are rejoined afterwards
const RENDER_WIDTH: usize = 1000;

/// Whether a content item is part of the readable document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// XHTML/HTML content
    Document,
    /// Stylesheets, images, fonts, navigation data and the like
    Other,
}

impl ItemKind {
    /// Classify a manifest media type (parameters such as charset are ignored)
    pub fn from_media_type(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if DOCUMENT_MEDIA_TYPES.contains(&essence.as_str()) {
            ItemKind::Document
        } else {
            ItemKind::Other
        }
    }
}

/// One unit of the book in reading order, with its raw markup
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Manifest id
    pub id: String,
    pub kind: ItemKind,
    pub markup: String,
}

impl ContentItem {
    /// Create a document item
    pub fn document(id: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Document,
            markup: markup.into(),
        }
    }

    /// Whether this item takes part in chaptering
    pub fn is_document(&self) -> bool {
        self.kind == ItemKind::Document
    }
}

/// Book-level metadata
#[derive(Debug, Clone)]
pub struct BookInfo {
    pub title: String,
    pub author: Option<String>,
}

/// An opened EPUB file
pub struct EpubSource {
    doc: EpubDoc<BufReader<File>>,
}

impl EpubSource {
    /// Open an EPUB file and read its container metadata
    pub fn open(path: &Path) -> Result<Self> {
        let doc = EpubDoc::new(path)
            .map_err(|e| anyhow!("Failed to open EPUB: {}", e))
            .with_context(|| format!("Cannot read {}", path.display()))?;
        Ok(Self { doc })
    }

    /// Title and author from the package metadata
    pub fn info(&self) -> BookInfo {
        BookInfo {
            title: self
                .doc
                .mdata("title")
                .map(|m| m.value.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            author: self.doc.mdata("creator").map(|m| m.value.clone()),
        }
    }

    /// Number of items in the reading order
    pub fn item_count(&self) -> usize {
        self.doc.spine.len()
    }

    /// Walk the reading order lazily, loading one item at a time
    pub fn items(&mut self) -> ContentItems<'_> {
        let idrefs = self.doc.spine.iter().map(|s| s.idref.clone()).collect();
        ContentItems {
            doc: &mut self.doc,
            idrefs,
            next: 0,
        }
    }
}

/// Lazy iterator over an EPUB's spine
pub struct ContentItems<'a> {
    doc: &'a mut EpubDoc<BufReader<File>>,
    idrefs: Vec<String>,
    next: usize,
}

impl Iterator for ContentItems<'_> {
    type Item = Result<ContentItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let idref = self.idrefs.get(self.next)?.clone();
        self.next += 1;

        let item = match self.doc.get_resource(&idref) {
            Some((bytes, media_type)) => Ok(ContentItem {
                kind: ItemKind::from_media_type(&media_type),
                markup: String::from_utf8_lossy(&bytes).into_owned(),
                id: idref,
            }),
            None => Err(anyhow!(
                "Spine item '{}' is missing from the EPUB manifest",
                idref
            )),
        };
        Some(item)
    }
}

/// Plain text and embedded title recovered from one item's markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub title: Option<String>,
}

/// Markup to plain text conversion
pub trait MarkupConverter {
    fn convert(&self, markup: &str) -> Extracted;
}

/// Converts XHTML with html2text and reads the `<title>` element
///
/// The text covers the whole document: the head's title comes first, then
/// the body. A cover page with only a title and an image is therefore not
/// empty and takes a chapter number.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlConverter;

impl MarkupConverter for HtmlConverter {
    fn convert(&self, markup: &str) -> Extracted {
        let title = extract_title_from_html(markup);

        let text = match body_markup(markup) {
            Some(body) => {
                let body_text = html_to_text(body);
                match &title {
                    Some(t) if body_text.is_empty() => t.clone(),
                    Some(t) => format!("{}\n\n{}", t, body_text),
                    None => body_text,
                }
            }
            None => html_to_text(markup),
        };

        Extracted { text, title }
    }
}

/// Extract the text of the `<title>` element, if any
fn extract_title_from_html(html: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with the input
    let html_lower = html.to_ascii_lowercase();

    let mut search_from = 0;
    while let Some(found) = html_lower[search_from..].find("<title") {
        let start = search_from + found;
        let after_name = start + "<title".len();
        search_from = after_name;

        // Skip tags that merely start with "title", like <titlepage>
        match html_lower[after_name..].chars().next() {
            Some(c) if c == '>' || c.is_ascii_whitespace() => {}
            _ => continue,
        }

        let tag_end = html_lower[start..].find('>')?;
        let content_start = start + tag_end + 1;
        let end = html_lower[content_start..].find("</title")?;
        let title = decode_entities(&strip_html_tags(&html[content_start..content_start + end]));
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

        return if title.is_empty() { None } else { Some(title) };
    }

    None
}

/// The `<body>` element onward, if there is one
fn body_markup(html: &str) -> Option<&str> {
    html.to_ascii_lowercase()
        .find("<body")
        .map(|start| &html[start..])
}

/// Strip HTML tags from a string
fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
}

/// Convert HTML to plain text
fn html_to_text(html: &str) -> String {
    let text = html2text::config::plain()
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
        .unwrap_or_else(|e| {
            log::warn!("html2text could not render markup ({}); stripping tags instead", e);
            strip_html_tags(html)
        });
    clean_text(&text)
}

/// Rejoin wrapped lines into paragraphs and decode leftover entities
fn clean_text(text: &str) -> String {
    let mut result = String::new();
    let mut prev_was_newline = false;

    for line in text.lines() {
        let trimmed = line.trim();

        // Blank lines mark paragraph breaks
        if trimmed.is_empty() {
            if !prev_was_newline && !result.is_empty() {
                result.push_str("\n\n");
                prev_was_newline = true;
            }
            continue;
        }

        prev_was_newline = false;

        if !result.is_empty() && !result.ends_with('\n') {
            result.push(' ');
        }

        result.push_str(trimmed);
    }

    decode_entities(result.trim_end())
}

/// Decode the handful of entities that survive conversion
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&rsquo;", "'")
        .replace("&lsquo;", "'")
        .replace("&rdquo;", "\"")
        .replace("&ldquo;", "\"")
        .replace("&hellip;", "...")
        .replace("&amp;", "&")
}
